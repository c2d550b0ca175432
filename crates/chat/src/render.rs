//! Darstellung einer Konversation
//!
//! Reine, synchrone Bausteine des Render-Durchlaufs: Deduplizierung,
//! Entscheidung ueber den Entschluesselungsversuch, Ergebnis pro Nachricht
//! und Scroll-Hinweis. Das Nachladen von Key Material uebernimmt der
//! [`crate::service::MessageExchange`].

use std::collections::HashSet;

use chrono::NaiveDateTime;
use ourchat_core::{DateiReferenz, MessageId, Nachricht, NachrichtenTyp, UserId};
use ourchat_crypto::envelope::normalisieren;
use ourchat_crypto::{CiphertextHint, CipherEngine, EncryptedEnvelope, KeyMaterial};
use serde::Serialize;

/// Was fuer eine Nachricht angezeigt wird
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "art", rename_all = "snake_case")]
pub enum Anzeige {
    /// Erfolgreich entschluesselter Text
    Entschluesselt { text: String },
    /// Unverschluesselter Altbestand, unveraendert
    Unverschluesselt { text: String },
    /// Platzhalter, Nachricht konnte nicht entschluesselt werden
    Fehler { grund: String },
    /// Bild, Video, GIF oder Datei, nur als Verweis
    Datei {
        beschriftung: Option<String>,
        datei: Option<DateiReferenz>,
    },
}

impl Anzeige {
    /// Anzeigetext fuer einfache Oberflaechen
    pub fn text(&self) -> String {
        match self {
            Self::Entschluesselt { text } | Self::Unverschluesselt { text } => text.clone(),
            Self::Fehler { .. } => "[Nachricht konnte nicht entschluesselt werden]".to_string(),
            Self::Datei { beschriftung, datei } => {
                let name = datei
                    .as_ref()
                    .and_then(|d| d.name.clone().or_else(|| Some(d.pfad.clone())))
                    .unwrap_or_else(|| "Datei".to_string());
                match beschriftung {
                    Some(b) if !b.is_empty() => format!("[{name}] {b}"),
                    _ => format!("[{name}]"),
                }
            }
        }
    }
}

/// Eine Nachricht, wie sie in der Ansicht erscheint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AngezeigteNachricht {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub typ: NachrichtenTyp,
    pub timestamp: Option<NaiveDateTime>,
    /// Vom angemeldeten Benutzer gesendet
    pub eigene: bool,
    /// Optimistisches lokales Echo, noch nicht vom Server bestaetigt
    pub lokales_echo: bool,
    pub anzeige: Anzeige,
}

impl AngezeigteNachricht {
    pub fn aus_nachricht(nachricht: &Nachricht, eigene_id: UserId, anzeige: Anzeige) -> Self {
        Self {
            id: nachricht.id,
            sender_id: nachricht.sender_id,
            receiver_id: nachricht.receiver_id,
            typ: nachricht.message_type,
            timestamp: nachricht.timestamp,
            eigene: nachricht.sender_id == eigene_id,
            lokales_echo: false,
            anzeige,
        }
    }

    /// Lokales Echo einer gerade gesendeten Nachricht mit ihrem Klartext
    pub fn echo(gespeichert: &Nachricht, eigene_id: UserId, klartext: &str) -> Self {
        let mut echo = Self::aus_nachricht(
            gespeichert,
            eigene_id,
            Anzeige::Entschluesselt {
                text: klartext.to_string(),
            },
        );
        echo.typ = NachrichtenTyp::Text;
        echo.lokales_echo = true;
        echo
    }
}

/// Momentaufnahme der geoeffneten Konversation fuer die Oberflaeche
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Konversationsansicht {
    pub partner: Option<UserId>,
    pub nachrichten: Vec<AngezeigteNachricht>,
    /// Erster Durchlauf noch nicht abgeschlossen
    pub laedt: bool,
    /// Oberflaeche soll ans Ende scrollen
    pub scrollen: bool,
}

/// Scroll-Hinweis ueber die Anzahl gerenderter Nachrichten
///
/// Der Zaehler faellt nie; er dient nur dem Scrollen, nie der Deduplizierung.
#[derive(Debug, Default, Clone)]
pub struct ScrollTracker {
    anzahl: usize,
}

impl ScrollTracker {
    /// Merkt sich die neue Anzahl und gibt zurueck, ob gescrollt werden soll
    pub fn aktualisieren(&mut self, neue_anzahl: usize, war_am_ende: bool) -> bool {
        let gewachsen = neue_anzahl > self.anzahl;
        self.anzahl = self.anzahl.max(neue_anzahl);
        war_am_ende || gewachsen
    }

    pub fn anzahl(&self) -> usize {
        self.anzahl
    }
}

/// Entfernt doppelte IDs, die erste Nachricht gewinnt, Reihenfolge bleibt
pub fn deduplizieren(nachrichten: Vec<Nachricht>) -> Vec<Nachricht> {
    let mut gesehen = HashSet::with_capacity(nachrichten.len());
    nachrichten
        .into_iter()
        .filter(|n| gesehen.insert(n.id))
        .collect()
}

/// Lohnt sich ein Entschluesselungsversuch (und damit die Schluesselsuche)?
pub fn braucht_schluessel(inhalt: &str, hint: CiphertextHint) -> bool {
    match hint {
        CiphertextHint::LooksLikeEnvelope => true,
        // Nur wenn der normalisierte Text strukturell ein Envelope ist
        CiphertextHint::AmbiguousFallbackCandidate => {
            EncryptedEnvelope::dekodieren(&normalisieren(inhalt)).is_ok()
        }
        CiphertextHint::DefinitelyPlaintext => false,
    }
}

/// Entschluesselt einen Text-Inhalt fuer die Anzeige
///
/// Fehler bleiben auf diese eine Nachricht beschraenkt.
pub fn entschluesseln(
    engine: &CipherEngine,
    inhalt: &str,
    hint: CiphertextHint,
    material: &KeyMaterial,
) -> Anzeige {
    match hint {
        CiphertextHint::DefinitelyPlaintext => Anzeige::Unverschluesselt {
            text: inhalt.to_string(),
        },
        CiphertextHint::LooksLikeEnvelope => match engine.decrypt(inhalt, material) {
            Ok(text) => Anzeige::Entschluesselt { text },
            Err(e) => {
                tracing::debug!(fehler = %e, "Envelope nicht entschluesselbar");
                Anzeige::Fehler {
                    grund: e.to_string(),
                }
            }
        },
        CiphertextHint::AmbiguousFallbackCandidate => {
            match engine.decrypt(&normalisieren(inhalt), material) {
                Ok(text) => Anzeige::Entschluesselt { text },
                Err(e)
                    if e
                        .entschluesselungs_grund()
                        .is_some_and(|g| g.ist_formatfehler()) =>
                {
                    Anzeige::Unverschluesselt {
                        text: inhalt.to_string(),
                    }
                }
                Err(e) => {
                    tracing::debug!(fehler = %e, "Fallback-Entschluesselung fehlgeschlagen");
                    Anzeige::Fehler {
                        grund: e.to_string(),
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
