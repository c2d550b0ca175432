//! Terminal-Sitzung: anmelden, Konversation oeffnen, Zeilen senden
//!
//! Jede Zeile von stdin wird als Nachricht gesendet, `/quit` beendet die
//! Sitzung. Neue Nachrichten aus dem Polling werden auf stdout ausgegeben.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use ourchat_chat::{AngezeigteNachricht, Anzeige, HttpTransport, MessageExchange, Sitzung};
use ourchat_core::{MessageId, UserId};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::ClientConfig;

/// Befehl zum Beenden
const BEENDEN: &str = "/quit";

/// Zugangsdaten und Gegenueber einer Terminal-Sitzung
#[derive(Debug, Clone)]
pub struct ChatAnfrage {
    pub benutzername: String,
    pub passwort: String,
    pub partner: UserId,
}

/// Fuehrt eine Chat-Sitzung bis `/quit` oder Ende von stdin aus
pub async fn chat_ausfuehren(config: &ClientConfig, anfrage: ChatAnfrage) -> anyhow::Result<()> {
    let transport = Arc::new(
        HttpTransport::neu(&config.server.url, config.zeitlimit())
            .context("HTTP-Client konnte nicht erstellt werden")?,
    );
    let profil = transport
        .anmelden(&anfrage.benutzername, &anfrage.passwort)
        .await
        .context("Anmeldung fehlgeschlagen")?;

    let exchange = MessageExchange::neu(Arc::clone(&transport), config.chat_konfiguration());
    exchange.anmelden(Sitzung::aus_profil(&profil)?)?;

    let ausgabe = tokio::spawn(ausgabe_schleife(exchange.abonnieren()));

    if let Err(e) = exchange.konversation_oeffnen(anfrage.partner).await {
        eprintln!("! {}", e.benutzer_meldung());
    }

    let mut zeilen = BufReader::new(tokio::io::stdin()).lines();
    while let Some(zeile) = zeilen.next_line().await? {
        let zeile = zeile.trim_end();
        if zeile == BEENDEN {
            break;
        }
        if zeile.trim().is_empty() {
            continue;
        }
        if let Err(e) = exchange.nachricht_senden(zeile).await {
            tracing::warn!(fehler = %e, "Senden fehlgeschlagen");
            eprintln!("! {}", e.benutzer_meldung());
        }
    }

    exchange.abmelden();
    ausgabe.abort();
    if let Err(e) = transport.abmelden().await {
        tracing::warn!(fehler = %e, "Abmelden am Server fehlgeschlagen");
    }
    Ok(())
}

/// Gibt jede Nachricht genau einmal aus
async fn ausgabe_schleife(
    mut rx: tokio::sync::watch::Receiver<ourchat_chat::Konversationsansicht>,
) {
    let mut ausgegeben: HashSet<MessageId> = HashSet::new();
    while rx.changed().await.is_ok() {
        let ansicht = rx.borrow_and_update().clone();
        if ansicht.partner.is_none() {
            ausgegeben.clear();
            continue;
        }
        for nachricht in &ansicht.nachrichten {
            if ausgegeben.insert(nachricht.id) {
                println!("{}", zeile_formatieren(nachricht));
            }
        }
    }
}

/// Eine Ausgabezeile, z.B. `[12:03] du: Hallo`
pub fn zeile_formatieren(nachricht: &AngezeigteNachricht) -> String {
    let zeit = nachricht
        .timestamp
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());
    let wer = if nachricht.eigene {
        "du".to_string()
    } else {
        nachricht.sender_id.to_string()
    };
    let markierung = match nachricht.anzeige {
        Anzeige::Unverschluesselt { .. } => " (unverschluesselt)",
        _ => "",
    };
    format!("[{zeit}] {wer}{markierung}: {}", nachricht.anzeige.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ourchat_core::NachrichtenTyp;

    fn nachricht(eigene: bool, anzeige: Anzeige) -> AngezeigteNachricht {
        AngezeigteNachricht {
            id: MessageId(1),
            sender_id: if eigene { UserId(1) } else { UserId(2) },
            receiver_id: if eigene { UserId(2) } else { UserId(1) },
            typ: NachrichtenTyp::Text,
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 1).and_then(|d| d.and_hms_opt(9, 5, 0)),
            eigene,
            lokales_echo: false,
            anzeige,
        }
    }

    #[test]
    fn eigene_nachricht() {
        let n = nachricht(true, Anzeige::Entschluesselt { text: "Hallo".into() });
        assert_eq!(zeile_formatieren(&n), "[09:05] du: Hallo");
    }

    #[test]
    fn altbestand_wird_markiert() {
        let n = nachricht(false, Anzeige::Unverschluesselt { text: "alt".into() });
        assert_eq!(zeile_formatieren(&n), "[09:05] user:2 (unverschluesselt): alt");
    }

    #[test]
    fn fehler_platzhalter() {
        let mut n = nachricht(false, Anzeige::Fehler { grund: "Auth-Tag".into() });
        n.timestamp = None;
        assert_eq!(
            zeile_formatieren(&n),
            "[--:--] user:2: [Nachricht konnte nicht entschluesselt werden]"
        );
    }
}
