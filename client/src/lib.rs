//! ourchat-client – Bibliotheks-Root
//!
//! Konfiguration, Logging-Setup und die Terminal-Sitzung des Clients.

pub mod config;
pub mod logging;
pub mod terminal;
