//! Welches Key Material fuer welche Nachricht?
//!
//! `Receiver`: jede Text-Nachricht wird mit dem Key Material des Empfaengers
//! verschluesselt. Der Absender liest seine eigenen Nachrichten daher nur
//! ueber das Verzeichnis, der Empfaenger mit dem eigenen Material.
//!
//! `Conversation`: beide Richtungen nutzen das aus beiden Materials
//! abgeleitete Konversations-Material.

use ourchat_core::{Nachricht, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyingStrategy {
    /// Key Material des Empfaengers (kompatibel mit bestehender History)
    #[default]
    Receiver,
    /// Gemeinsamer Konversations-Schluessel
    Conversation,
}

/// Herkunft des Key Materials fuer eine Operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchluesselQuelle {
    /// Eigenes Material aus der Sitzung, kein Netzwerk
    Eigenes,
    /// Material eines anderen Benutzers aus dem Verzeichnis
    Verzeichnis(UserId),
    /// Konversations-Material mit diesem Partner
    Konversation(UserId),
}

/// Quelle zum Verschluesseln einer Nachricht an `empfaenger`
pub fn verschluesselungs_quelle(
    strategie: KeyingStrategy,
    eigene_id: UserId,
    empfaenger: UserId,
) -> SchluesselQuelle {
    match strategie {
        KeyingStrategy::Receiver if empfaenger == eigene_id => SchluesselQuelle::Eigenes,
        KeyingStrategy::Receiver => SchluesselQuelle::Verzeichnis(empfaenger),
        KeyingStrategy::Conversation => SchluesselQuelle::Konversation(empfaenger),
    }
}

/// Quelle zum Entschluesseln von `nachricht` aus Sicht von `eigene_id`
pub fn entschluesselungs_quelle(
    strategie: KeyingStrategy,
    eigene_id: UserId,
    nachricht: &Nachricht,
) -> SchluesselQuelle {
    match strategie {
        KeyingStrategy::Receiver => {
            if nachricht.sender_id == eigene_id {
                verschluesselungs_quelle(strategie, eigene_id, nachricht.receiver_id)
            } else {
                SchluesselQuelle::Eigenes
            }
        }
        KeyingStrategy::Conversation => {
            SchluesselQuelle::Konversation(nachricht.partner_von(eigene_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ourchat_core::MessageId;

    fn nachricht(von: i64, an: i64) -> Nachricht {
        Nachricht {
            id: MessageId(1),
            sender_id: UserId(von),
            receiver_id: UserId(an),
            content: None,
            message_type: Default::default(),
            file_path: None,
            file_name: None,
            file_size: None,
            timestamp: None,
        }
    }

    #[test]
    fn empfaenger_regel() {
        let ich = UserId(1);
        let s = KeyingStrategy::Receiver;

        assert_eq!(
            verschluesselungs_quelle(s, ich, UserId(2)),
            SchluesselQuelle::Verzeichnis(UserId(2))
        );
        // Eigene gesendete Nachricht: Material des Empfaengers
        assert_eq!(
            entschluesselungs_quelle(s, ich, &nachricht(1, 2)),
            SchluesselQuelle::Verzeichnis(UserId(2))
        );
        // Empfangene Nachricht: eigenes Material
        assert_eq!(
            entschluesselungs_quelle(s, ich, &nachricht(2, 1)),
            SchluesselQuelle::Eigenes
        );
        // Notiz an sich selbst
        assert_eq!(
            entschluesselungs_quelle(s, ich, &nachricht(1, 1)),
            SchluesselQuelle::Eigenes
        );
    }

    #[test]
    fn konversations_regel_ist_richtungsunabhaengig() {
        let ich = UserId(1);
        let s = KeyingStrategy::Conversation;

        assert_eq!(
            verschluesselungs_quelle(s, ich, UserId(2)),
            SchluesselQuelle::Konversation(UserId(2))
        );
        assert_eq!(
            entschluesselungs_quelle(s, ich, &nachricht(1, 2)),
            entschluesselungs_quelle(s, ich, &nachricht(2, 1))
        );
    }

    #[test]
    fn strategie_aus_konfiguration() {
        #[derive(Deserialize)]
        struct Abschnitt {
            strategie: KeyingStrategy,
        }
        let a: Abschnitt = serde_json::from_str(r#"{"strategie":"conversation"}"#).unwrap();
        assert_eq!(a.strategie, KeyingStrategy::Conversation);
        assert_eq!(KeyingStrategy::default(), KeyingStrategy::Receiver);
    }
}
