//! Fehlertypen fuer die Kommunikation mit dem OurChat-Server
//!
//! Alle Transport-Implementierungen bilden ihre Fehler auf diesen Enum ab.
//! Hoehere Crates konvertieren ihn via `#[from]`.

use thiserror::Error;

/// Result-Alias fuer Transport-Operationen
pub type Result<T> = std::result::Result<T, OurchatError>;

/// Fehler bei Anfragen an den OurChat-Server
#[derive(Debug, Error)]
pub enum OurchatError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- HTTP-Status ---
    #[error("Nicht authentifiziert")]
    NichtAuthentifiziert,

    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Server antwortete mit Status {code}: {nachricht}")]
    Status { code: u16, nachricht: String },

    // --- Protokoll ---
    #[error("Ungueltige Antwort: {0}")]
    UngueltigeAntwort(String),
}

impl OurchatError {
    /// Gibt true zurueck wenn ein erneuter Versuch sinnvoll sein koennte
    pub fn ist_wiederholbar(&self) -> bool {
        match self {
            Self::Verbindung(_) | Self::Zeitlimit(_) => true,
            Self::Status { code, .. } => *code >= 500 || *code == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = OurchatError::Status {
            code: 400,
            nachricht: "Receiver and content are required".into(),
        };
        assert_eq!(
            e.to_string(),
            "Server antwortete mit Status 400: Receiver and content are required"
        );
    }

    #[test]
    fn wiederholbar_erkennung() {
        assert!(OurchatError::Zeitlimit("test".into()).ist_wiederholbar());
        assert!(OurchatError::Status { code: 503, nachricht: String::new() }.ist_wiederholbar());
        assert!(!OurchatError::NichtAuthentifiziert.ist_wiederholbar());
        assert!(!OurchatError::Status { code: 404, nachricht: String::new() }.ist_wiederholbar());
    }
}
