//! Transport-Abstraktion zum OurChat-Server
//!
//! Das `ChatTransport`-Trait kapselt die drei Endpunkte, die der
//! Nachrichten-Austausch braucht. Die HTTP-Implementierung steht in
//! [`crate::http`], Tests verwenden einen In-Memory-Server.

use async_trait::async_trait;
use ourchat_core::{Nachricht, NeueNachricht, Result, UserId};

/// Zugriff auf Schluessel-Verzeichnis und Message-Store
///
/// Alle Aufrufe laufen im Kontext des angemeldeten Benutzers (Session-Cookie
/// bzw. Test-Identitaet).
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// `GET /api/user/{id}/encryption-key`
    ///
    /// `Ok(None)` wenn der Server antwortet, aber kein Key Material liefert.
    async fn encryption_key(&self, user_id: UserId) -> Result<Option<String>>;

    /// `GET /api/messages/{contact_id}`, aelteste Nachricht zuerst
    async fn nachrichten_laden(&self, partner: UserId) -> Result<Vec<Nachricht>>;

    /// `POST /api/messages`, gibt den gespeicherten Datensatz zurueck
    async fn nachricht_senden(&self, neu: &NeueNachricht) -> Result<Nachricht>;
}
