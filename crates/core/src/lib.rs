//! ourchat-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die Nachrichten- und Benutzer-Records sowie den
//! Transport-Fehlertyp bereit, die von Crypto-, Chat- und Client-Crate
//! gemeinsam genutzt werden.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{OurchatError, Result};
pub use types::{
    BenutzerProfil, DateiReferenz, MessageId, Nachricht, NachrichtenTyp, NeueNachricht, UserId,
};
