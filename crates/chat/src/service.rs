//! MessageExchange – Senden, Rendern und Polling einer Zwei-Personen-Konversation
//!
//! Besitzt die Session-Caches (Verzeichnis, abgeleitete Schluessel und
//! bereits entschluesselte Nachrichten) und leert sie beim Logout. Jede
//! geoeffnete Konversation hat eine Generation; Render-Ergebnisse aus einer
//! aelteren Generation werden verworfen.
//!
//! PBKDF2 und AES-GCM laufen ueber `spawn_blocking`, nie auf einem
//! Tokio-Worker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use ourchat_core::{BenutzerProfil, MessageId, Nachricht, NeueNachricht, UserId};
use ourchat_crypto::envelope::STANDARD_CACHE_LIMIT;
use ourchat_crypto::{
    derive_conversation_material, CipherEngine, CiphertextHint, CryptoError, KeyMaterial,
};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use crate::directory::KeyDirectory;
use crate::error::{ChatError, ChatResult};
use crate::keying::{self, KeyingStrategy, SchluesselQuelle};
use crate::polling::Poller;
use crate::render::{self, AngezeigteNachricht, Anzeige, Konversationsansicht, ScrollTracker};
use crate::transport::ChatTransport;

/// Laufzeit-Einstellungen des Nachrichten-Austauschs
#[derive(Debug, Clone)]
pub struct ChatKonfiguration {
    pub poll_intervall: Duration,
    pub strategie: KeyingStrategy,
    pub key_cache_limit: usize,
}

impl Default for ChatKonfiguration {
    fn default() -> Self {
        Self {
            poll_intervall: Duration::from_millis(2000),
            strategie: KeyingStrategy::default(),
            key_cache_limit: STANDARD_CACHE_LIMIT,
        }
    }
}

/// Angemeldeter Benutzer mit eigenem Key Material
#[derive(Debug, Clone)]
pub struct Sitzung {
    pub benutzer_id: UserId,
    pub key_material: KeyMaterial,
}

impl Sitzung {
    pub fn neu(benutzer_id: UserId, key_material: KeyMaterial) -> Self {
        Self {
            benutzer_id,
            key_material,
        }
    }

    /// Sitzung aus dem Login-Profil; ohne Key Material kein Chat
    pub fn aus_profil(profil: &BenutzerProfil) -> ChatResult<Self> {
        match profil.encryption_key.as_deref() {
            Some(k) if !k.is_empty() => Ok(Self::neu(profil.id, KeyMaterial::new(k))),
            _ => Err(ChatError::VerzeichnisAbfrage {
                user_id: profil.id,
                grund: "Profil enthaelt kein Key Material".to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
struct AnsichtZustand {
    partner: Option<UserId>,
    generation: u64,
    nachrichten: Vec<AngezeigteNachricht>,
    /// Lokale Echos, bis ein geladener Batch ihre ID enthaelt
    echos: Vec<AngezeigteNachricht>,
    scroll: ScrollTracker,
    am_ende: bool,
    laedt: bool,
}

impl AnsichtZustand {
    /// Neue Konversation (oder keine), alte Ergebnisse werden ungueltig
    fn zuruecksetzen(&mut self, partner: Option<UserId>) {
        *self = Self {
            partner,
            generation: self.generation + 1,
            am_ende: true,
            laedt: partner.is_some(),
            ..Self::default()
        };
    }

    fn momentaufnahme(&self, scrollen: bool) -> Konversationsansicht {
        Konversationsansicht {
            partner: self.partner,
            nachrichten: self.nachrichten.clone(),
            laedt: self.laedt,
            scrollen,
        }
    }
}

/// Eine Entschluesselung, die auf dem Blocking-Pool laeuft
struct Auftrag {
    /// Position in der gerenderten Liste
    index: usize,
    id: MessageId,
    inhalt: String,
    hint: CiphertextHint,
    material: KeyMaterial,
}

/// Ergebnis einer Entschluesselung, gebunden an den Envelope-Text
#[derive(Debug, Clone)]
struct Entschluesselt {
    inhalt: String,
    anzeige: Anzeige,
}

/// Koordiniert Verzeichnis, CipherEngine und Transport fuer eine Sitzung
pub struct MessageExchange<T: ChatTransport> {
    transport: Arc<T>,
    verzeichnis: KeyDirectory<T>,
    engine: Arc<CipherEngine>,
    /// Bereits entschluesselte Nachrichten der Sitzung; ein unveraenderter
    /// Batch braucht keine weitere Ableitung
    entschluesselt: DashMap<MessageId, Entschluesselt>,
    config: ChatKonfiguration,
    sitzung: RwLock<Option<Arc<Sitzung>>>,
    ansicht: Mutex<AnsichtZustand>,
    poller: Mutex<Option<Poller>>,
    ansicht_tx: watch::Sender<Konversationsansicht>,
}

impl<T: ChatTransport> MessageExchange<T> {
    pub fn neu(transport: Arc<T>, config: ChatKonfiguration) -> Arc<Self> {
        let (ansicht_tx, _) = watch::channel(Konversationsansicht::default());
        Arc::new(Self {
            verzeichnis: KeyDirectory::neu(Arc::clone(&transport)),
            engine: Arc::new(CipherEngine::mit_cache_limit(config.key_cache_limit)),
            entschluesselt: DashMap::new(),
            transport,
            config,
            sitzung: RwLock::new(None),
            ansicht: Mutex::new(AnsichtZustand::default()),
            poller: Mutex::new(None),
            ansicht_tx,
        })
    }

    // -----------------------------------------------------------------------
    // Sitzung
    // -----------------------------------------------------------------------

    /// Installiert die Sitzung des angemeldeten Benutzers
    pub fn anmelden(&self, sitzung: Sitzung) -> ChatResult<()> {
        let mut aktiv = self.sitzung.write();
        if aktiv.is_some() {
            return Err(ChatError::BereitsAngemeldet);
        }
        tracing::info!(user_id = %sitzung.benutzer_id, "Sitzung gestartet");
        *aktiv = Some(Arc::new(sitzung));
        Ok(())
    }

    /// Beendet die Sitzung: Polling stoppen, alle Caches leeren
    ///
    /// Die Sitzung wird zuerst entfernt. Ein paralleles
    /// `konversation_oeffnen` startet danach keinen Poller mehr, und ein
    /// bereits gestarteter wird hier gestoppt.
    pub fn abmelden(&self) {
        let beendet = self.sitzung.write().take();
        self.polling_stoppen();
        self.verzeichnis.reset();
        self.engine.clear_cache();

        let snapshot = {
            let mut ansicht = self.ansicht.lock();
            ansicht.zuruecksetzen(None);
            // Unter dem Ansicht-Lock: laufende Renders pruefen ihre
            // Generation unter demselben Lock, bevor sie einfuegen
            self.entschluesselt.clear();
            ansicht.momentaufnahme(false)
        };
        self.ansicht_tx.send_replace(snapshot);

        if let Some(sitzung) = beendet {
            tracing::info!(user_id = %sitzung.benutzer_id, "Sitzung beendet");
        }
    }

    pub fn ist_angemeldet(&self) -> bool {
        self.sitzung.read().is_some()
    }

    fn aktive_sitzung(&self) -> ChatResult<Arc<Sitzung>> {
        self.sitzung.read().clone().ok_or(ChatError::KeineSitzung)
    }

    // -----------------------------------------------------------------------
    // Konversation
    // -----------------------------------------------------------------------

    /// Oeffnet die Konversation mit `partner`
    ///
    /// Beendet ein laufendes Polling, rendert einmal sichtbar und startet
    /// danach genau einen Polling-Timer. Schlaegt der erste Abruf fehl, laeuft
    /// das Polling trotzdem an und der Fehler wird zurueckgegeben.
    pub async fn konversation_oeffnen(
        self: &Arc<Self>,
        partner: UserId,
    ) -> ChatResult<Konversationsansicht> {
        self.aktive_sitzung()?;
        self.polling_stoppen();

        let (generation, snapshot) = {
            let mut ansicht = self.ansicht.lock();
            ansicht.zuruecksetzen(Some(partner));
            (ansicht.generation, ansicht.momentaufnahme(false))
        };
        self.ansicht_tx.send_replace(snapshot);
        tracing::debug!(%partner, generation, "Konversation geoeffnet");

        let ergebnis = self.aktualisieren().await;
        self.polling_starten(partner, generation);

        match ergebnis {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Ok(self.ansicht()),
            Err(e) => {
                tracing::warn!(%partner, fehler = %e, "Erster Abruf der Konversation fehlgeschlagen");
                Err(e)
            }
        }
    }

    /// Schliesst die Konversation und stoppt das Polling
    pub fn konversation_schliessen(&self) {
        self.polling_stoppen();
        let snapshot = {
            let mut ansicht = self.ansicht.lock();
            ansicht.zuruecksetzen(None);
            ansicht.momentaufnahme(false)
        };
        self.ansicht_tx.send_replace(snapshot);
    }

    /// Startet den Poller, sofern `generation` noch die offene Konversation
    /// ist und die Sitzung noch besteht. Gibt zurueck ob gestartet wurde.
    pub(crate) fn polling_starten(self: &Arc<Self>, partner: UserId, generation: u64) -> bool {
        let mut poller = self.poller.lock();
        // Inzwischen anders geoeffnet, geschlossen oder abgemeldet?
        if self.ansicht.lock().generation != generation {
            return false;
        }
        if !self.ist_angemeldet() {
            tracing::debug!(%partner, "Sitzung beendet, Polling wird nicht gestartet");
            return false;
        }
        if let Some(alt) = poller.take() {
            alt.stoppen();
        }
        *poller = Some(Poller::starten(
            Arc::downgrade(self),
            partner,
            self.config.poll_intervall,
        ));
        true
    }

    fn polling_stoppen(&self) {
        if let Some(poller) = self.poller.lock().take() {
            tracing::debug!(partner = %poller.partner(), "Polling gestoppt");
            poller.stoppen();
        }
    }

    pub fn polling_aktiv(&self) -> bool {
        self.poller.lock().is_some()
    }

    /// Meldet, ob die Oberflaeche gerade am Ende der Liste steht
    pub fn ansicht_position_melden(&self, am_ende: bool) {
        self.ansicht.lock().am_ende = am_ende;
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    /// Verschluesselt `klartext` und sendet ihn an den Partner der offenen
    /// Konversation. Ohne Key Material wird nichts gesendet.
    pub async fn nachricht_senden(&self, klartext: &str) -> ChatResult<AngezeigteNachricht> {
        if klartext.trim().is_empty() {
            return Err(ChatError::UngueltigeEingabe(
                "Nachrichteninhalt darf nicht leer sein".into(),
            ));
        }

        let sitzung = self.aktive_sitzung()?;
        let (partner, generation) = {
            let ansicht = self.ansicht.lock();
            (ansicht.partner, ansicht.generation)
        };
        let partner = partner.ok_or(ChatError::KeineKonversation)?;

        let quelle =
            keying::verschluesselungs_quelle(self.config.strategie, sitzung.benutzer_id, partner);
        let material = self.material_fuer(&sitzung, quelle).await?;
        let engine = Arc::clone(&self.engine);
        let text = klartext.to_string();
        let envelope = tokio::task::spawn_blocking(move || engine.encrypt(&text, &material))
            .await
            .map_err(|e| CryptoError::Verschluesselung(format!("Verschluesselung abgebrochen: {e}")))??;

        let gespeichert = self
            .transport
            .nachricht_senden(&NeueNachricht {
                receiver_id: partner,
                content: envelope,
            })
            .await?;
        tracing::info!(id = %gespeichert.id, %partner, "Nachricht gesendet");

        let echo = AngezeigteNachricht::echo(&gespeichert, sitzung.benutzer_id, klartext);
        let snapshot = {
            let mut ansicht = self.ansicht.lock();
            if ansicht.generation != generation
                || ansicht.nachrichten.iter().any(|n| n.id == echo.id)
            {
                None
            } else {
                ansicht.echos.push(echo.clone());
                ansicht.nachrichten.push(echo.clone());
                let anzahl = ansicht.nachrichten.len();
                // Eigene Nachricht: immer ans Ende
                let scrollen = ansicht.scroll.aktualisieren(anzahl, true);
                Some(ansicht.momentaufnahme(scrollen))
            }
        };
        if let Some(snapshot) = snapshot {
            self.ansicht_tx.send_replace(snapshot);
        }

        Ok(echo)
    }

    // -----------------------------------------------------------------------
    // Rendern
    // -----------------------------------------------------------------------

    /// Laedt die offene Konversation und rendert sie
    ///
    /// `Ok(None)` wenn keine Konversation offen ist oder das Ergebnis
    /// inzwischen veraltet war.
    pub async fn aktualisieren(&self) -> ChatResult<Option<Konversationsansicht>> {
        let sitzung = self.aktive_sitzung()?;
        let (partner, generation) = {
            let ansicht = self.ansicht.lock();
            (ansicht.partner, ansicht.generation)
        };
        let Some(partner) = partner else {
            return Ok(None);
        };

        let nachrichten = self.transport.nachrichten_laden(partner).await?;
        Ok(self
            .batch_rendern(&sitzung, partner, generation, nachrichten)
            .await)
    }

    /// Rendert einen bereits geladenen Batch der offenen Konversation
    ///
    /// Idempotent: derselbe Batch ergibt dieselbe Ansicht.
    pub async fn render_conversation(
        &self,
        nachrichten: Vec<Nachricht>,
    ) -> ChatResult<Konversationsansicht> {
        let sitzung = self.aktive_sitzung()?;
        let (partner, generation) = {
            let ansicht = self.ansicht.lock();
            (ansicht.partner, ansicht.generation)
        };
        let partner = partner.ok_or(ChatError::KeineKonversation)?;

        Ok(self
            .batch_rendern(&sitzung, partner, generation, nachrichten)
            .await
            .unwrap_or_else(|| self.ansicht()))
    }

    pub(crate) async fn batch_rendern(
        &self,
        sitzung: &Sitzung,
        partner: UserId,
        generation: u64,
        nachrichten: Vec<Nachricht>,
    ) -> Option<Konversationsansicht> {
        // Waehrend des Ladens geschlossen, gewechselt oder abgemeldet:
        // weder Schluessel nachschlagen noch ableiten
        if !self.generation_aktuell(partner, generation) {
            tracing::debug!(%partner, generation, "Batch veraltet, wird nicht gerendert");
            return None;
        }

        let nachrichten = render::deduplizieren(nachrichten);
        let mut schluessel: HashMap<SchluesselQuelle, Result<KeyMaterial, String>> =
            HashMap::new();
        let mut angezeigt = Vec::with_capacity(nachrichten.len());
        let mut auftraege = Vec::new();

        for nachricht in &nachrichten {
            if nachricht.partner_von(sitzung.benutzer_id) != partner {
                tracing::warn!(id = %nachricht.id, "Nachricht gehoert nicht zur Konversation");
                continue;
            }

            let anzeige = if !nachricht.message_type.ist_text() {
                Anzeige::Datei {
                    beschriftung: nachricht.content.clone(),
                    datei: nachricht.datei(),
                }
            } else {
                let inhalt = nachricht.content.as_deref().unwrap_or_default();
                let hint = CipherEngine::classify(inhalt);

                if !render::braucht_schluessel(inhalt, hint) {
                    Anzeige::Unverschluesselt {
                        text: inhalt.to_string(),
                    }
                } else if let Some(anzeige) = self.bereits_entschluesselt(nachricht.id, inhalt) {
                    anzeige
                } else {
                    let quelle = keying::entschluesselungs_quelle(
                        self.config.strategie,
                        sitzung.benutzer_id,
                        nachricht,
                    );
                    // Ein Nachschlagen pro Quelle und Durchlauf
                    let material = match schluessel.get(&quelle) {
                        Some(bekannt) => bekannt.clone(),
                        None => {
                            let neu = self
                                .material_fuer(sitzung, quelle)
                                .await
                                .map_err(|e| e.to_string());
                            schluessel.insert(quelle, neu.clone());
                            neu
                        }
                    };
                    match material {
                        Ok(material) => {
                            auftraege.push(Auftrag {
                                index: angezeigt.len(),
                                id: nachricht.id,
                                inhalt: inhalt.to_string(),
                                hint,
                                material,
                            });
                            // Wird nach der Entschluesselung ersetzt
                            Anzeige::Fehler {
                                grund: "Entschluesselung abgebrochen".to_string(),
                            }
                        }
                        Err(grund) => Anzeige::Fehler { grund },
                    }
                }
            };

            angezeigt.push(AngezeigteNachricht::aus_nachricht(
                nachricht,
                sitzung.benutzer_id,
                anzeige,
            ));
        }

        let ergebnisse = if self.generation_aktuell(partner, generation) {
            self.entschluesseln(auftraege).await
        } else {
            Vec::new()
        };
        for (auftrag, anzeige) in &ergebnisse {
            if let Some(eintrag) = angezeigt.get_mut(auftrag.index) {
                eintrag.anzeige = anzeige.clone();
            }
        }

        let snapshot = {
            let mut ansicht = self.ansicht.lock();
            if ansicht.generation != generation || ansicht.partner != Some(partner) {
                tracing::debug!(%partner, generation, "Veraltetes Render-Ergebnis verworfen");
                return None;
            }

            for (auftrag, anzeige) in ergebnisse {
                self.entschluesselt.insert(
                    auftrag.id,
                    Entschluesselt {
                        inhalt: auftrag.inhalt,
                        anzeige,
                    },
                );
            }

            ansicht
                .echos
                .retain(|echo| !angezeigt.iter().any(|n| n.id == echo.id));
            angezeigt.extend(ansicht.echos.iter().cloned());

            let war_am_ende = ansicht.am_ende;
            let scrollen = ansicht.scroll.aktualisieren(angezeigt.len(), war_am_ende);
            ansicht.nachrichten = angezeigt;
            ansicht.laedt = false;
            ansicht.momentaufnahme(scrollen)
        };

        tracing::trace!(%partner, anzahl = snapshot.nachrichten.len(), "Konversation gerendert");
        self.ansicht_tx.send_replace(snapshot.clone());
        Some(snapshot)
    }

    fn generation_aktuell(&self, partner: UserId, generation: u64) -> bool {
        let ansicht = self.ansicht.lock();
        ansicht.generation == generation && ansicht.partner == Some(partner)
    }

    /// Frueheres Ergebnis fuer dieselbe Nachricht mit unveraendertem Inhalt
    fn bereits_entschluesselt(&self, id: MessageId, inhalt: &str) -> Option<Anzeige> {
        self.entschluesselt
            .get(&id)
            .filter(|eintrag| eintrag.inhalt == inhalt)
            .map(|eintrag| eintrag.anzeige.clone())
    }

    /// Fuehrt alle Entschluesselungen eines Batches auf dem Blocking-Pool aus
    async fn entschluesseln(&self, auftraege: Vec<Auftrag>) -> Vec<(Auftrag, Anzeige)> {
        if auftraege.is_empty() {
            return Vec::new();
        }
        let engine = Arc::clone(&self.engine);
        let anzahl = auftraege.len();
        let ergebnis = tokio::task::spawn_blocking(move || {
            auftraege
                .into_iter()
                .map(|auftrag| {
                    let anzeige = render::entschluesseln(
                        &engine,
                        &auftrag.inhalt,
                        auftrag.hint,
                        &auftrag.material,
                    );
                    (auftrag, anzeige)
                })
                .collect::<Vec<_>>()
        })
        .await;

        match ergebnis {
            Ok(ergebnisse) => ergebnisse,
            Err(e) => {
                tracing::error!(anzahl, fehler = %e, "Entschluesselung im Hintergrund fehlgeschlagen");
                Vec::new()
            }
        }
    }

    /// Key Material fuer eine Quelle, ggf. ueber das Verzeichnis
    async fn material_fuer(
        &self,
        sitzung: &Sitzung,
        quelle: SchluesselQuelle,
    ) -> ChatResult<KeyMaterial> {
        match quelle {
            SchluesselQuelle::Eigenes => Ok(sitzung.key_material.clone()),
            SchluesselQuelle::Verzeichnis(user_id) => self.verzeichnis.resolve(user_id).await,
            SchluesselQuelle::Konversation(partner) => {
                let partner_material = if partner == sitzung.benutzer_id {
                    sitzung.key_material.clone()
                } else {
                    self.verzeichnis.resolve(partner).await?
                };
                Ok(derive_conversation_material(
                    sitzung.benutzer_id.inner(),
                    &sitzung.key_material,
                    partner.inner(),
                    &partner_material,
                )?)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Zugriff
    // -----------------------------------------------------------------------

    /// Abonniert die Ansicht der offenen Konversation
    pub fn abonnieren(&self) -> watch::Receiver<Konversationsansicht> {
        self.ansicht_tx.subscribe()
    }

    /// Aktuelle Ansicht
    pub fn ansicht(&self) -> Konversationsansicht {
        self.ansicht_tx.borrow().clone()
    }

    /// Heuristik fuer die Oberflaeche (z.B. Schloss-Symbol)
    pub fn is_encrypted(text: &str) -> bool {
        CipherEngine::is_encrypted(text)
    }

    pub fn verzeichnis(&self) -> &KeyDirectory<T> {
        &self.verzeichnis
    }

    pub fn engine(&self) -> &CipherEngine {
        &self.engine
    }

    pub fn config(&self) -> &ChatKonfiguration {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.ansicht.lock().generation
    }

    #[cfg(test)]
    pub(crate) fn entschluesselt_len(&self) -> usize {
        self.entschluesselt.len()
    }
}
