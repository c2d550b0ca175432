//! Fehlertypen fuer das Chat-Subsystem

use ourchat_core::{OurchatError, UserId};
use ourchat_crypto::CryptoError;
use thiserror::Error;

/// Fehler im Chat-Subsystem
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Key Material fuer {user_id} nicht abrufbar: {grund}")]
    VerzeichnisAbfrage { user_id: UserId, grund: String },

    #[error("Krypto-Fehler: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Server-Fehler: {0}")]
    Transport(#[from] OurchatError),

    #[error("Nicht angemeldet")]
    KeineSitzung,

    #[error("Bereits angemeldet")]
    BereitsAngemeldet,

    #[error("Keine Konversation geoeffnet")]
    KeineKonversation,

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),
}

impl ChatError {
    /// true wenn der Benutzer die Aktion einfach wiederholen kann
    pub fn ist_wiederholbar(&self) -> bool {
        match self {
            Self::VerzeichnisAbfrage { .. } => true,
            Self::Transport(e) => e.ist_wiederholbar(),
            Self::Crypto(CryptoError::Verschluesselung(_)) => true,
            _ => false,
        }
    }

    /// Kurze Meldung fuer die Oberflaeche
    pub fn benutzer_meldung(&self) -> String {
        let text = match self {
            Self::VerzeichnisAbfrage { .. } => {
                "Der Schluessel des Empfaengers konnte nicht geladen werden".to_string()
            }
            Self::Crypto(_) => "Die Nachricht konnte nicht verschluesselt werden".to_string(),
            Self::Transport(OurchatError::NichtAuthentifiziert) => {
                "Sitzung abgelaufen, bitte erneut anmelden".to_string()
            }
            Self::Transport(_) => "Der Server hat die Nachricht nicht angenommen".to_string(),
            andere => andere.to_string(),
        };
        if self.ist_wiederholbar() {
            format!("{text}. Bitte erneut versuchen.")
        } else {
            text
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verzeichnis_fehler_ist_wiederholbar() {
        let e = ChatError::VerzeichnisAbfrage {
            user_id: UserId(7),
            grund: "404".into(),
        };
        assert!(e.ist_wiederholbar());
        assert!(e.to_string().contains("user:7"));
        assert!(e.benutzer_meldung().ends_with("Bitte erneut versuchen."));
    }

    #[test]
    fn transport_fehler_uebernimmt_wiederholbarkeit() {
        let e: ChatError = OurchatError::Zeitlimit("10s".into()).into();
        assert!(e.ist_wiederholbar());

        let e: ChatError = OurchatError::NichtAuthentifiziert.into();
        assert!(!e.ist_wiederholbar());
        assert_eq!(e.benutzer_meldung(), "Sitzung abgelaufen, bitte erneut anmelden");
    }

    #[test]
    fn eingabefehler_nicht_wiederholbar() {
        let e = ChatError::UngueltigeEingabe("leer".into());
        assert!(!e.ist_wiederholbar());
        assert_eq!(e.benutzer_meldung(), "Ungueltige Eingabe: leer");
    }
}
