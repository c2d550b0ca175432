//! Fehlertypen fuer das Kryptografie-Subsystem

use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key Derivation fehlgeschlagen: {0}")]
    KeyDerivation(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(#[from] DecryptFailure),

    #[error("Ungueltige Schluessel-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erwartet: usize, erhalten: usize },
}

impl CryptoError {
    /// Grund der Entschluesselungs-Fehlers (falls es einer ist)
    pub fn entschluesselungs_grund(&self) -> Option<&DecryptFailure> {
        match self {
            Self::Entschluesselung(grund) => Some(grund),
            _ => None,
        }
    }
}

/// Warum ein Envelope nicht entschluesselt werden konnte
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptFailure {
    #[error("kein gueltiges Base64 ({0})")]
    Base64(String),

    #[error("Envelope zu kurz: {laenge} Bytes (Minimum: {minimum})")]
    ZuKurz { laenge: usize, minimum: usize },

    #[error("Auth-Tag ungueltig (falscher Schluessel oder manipulierter Inhalt)")]
    Authentifizierung,

    #[error("Klartext ist kein gueltiges UTF-8")]
    KeinUtf8,
}

impl DecryptFailure {
    /// true wenn der Text gar nicht das Envelope-Format hat
    /// (im Gegensatz zu einem Envelope mit falschem Schluessel)
    pub fn ist_formatfehler(&self) -> bool {
        matches!(self, Self::Base64(_) | Self::ZuKurz { .. })
    }
}

impl From<base64::DecodeError> for DecryptFailure {
    fn from(e: base64::DecodeError) -> Self {
        Self::Base64(e.to_string())
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
