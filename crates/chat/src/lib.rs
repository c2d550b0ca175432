//! ourchat-chat – Verschluesselter Nachrichten-Austausch
//!
//! Dieses Crate implementiert:
//! - KeyDirectory: Key Material anderer Benutzer laden und zwischenspeichern
//! - MessageExchange: Senden, Rendern und Polling einer Konversation
//! - ChatTransport-Trait + HttpTransport-Implementierung (reqwest)
//!
//! # Beispiel
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ourchat_chat::{ChatKonfiguration, HttpTransport, MessageExchange, Sitzung};
//! use ourchat_core::UserId;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = Arc::new(
//!         HttpTransport::neu("https://chat.example.org", Duration::from_secs(10)).unwrap(),
//!     );
//!     let profil = transport.anmelden("alice", "geheim").await.unwrap();
//!
//!     let chat = MessageExchange::neu(transport, ChatKonfiguration::default());
//!     chat.anmelden(Sitzung::aus_profil(&profil).unwrap()).unwrap();
//!
//!     chat.konversation_oeffnen(UserId(2)).await.unwrap();
//!     chat.nachricht_senden("Hallo Bob!").await.unwrap();
//! }
//! ```

pub mod directory;
pub mod error;
pub mod http;
pub mod keying;
pub mod polling;
pub mod render;
pub mod service;
pub mod transport;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use directory::KeyDirectory;
pub use error::{ChatError, ChatResult};
pub use http::HttpTransport;
pub use keying::KeyingStrategy;
pub use render::{AngezeigteNachricht, Anzeige, Konversationsansicht};
pub use service::{ChatKonfiguration, MessageExchange, Sitzung};
pub use transport::ChatTransport;
