//! Gemeinsame Identifikations- und Nachrichtentypen fuer OurChat
//!
//! Die IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Benutzer- und Nachrichten-IDs zur Compilezeit auszuschliessen. Die
//! Record-Typen entsprechen 1:1 den JSON-Objekten des OurChat-Servers.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Numerische Benutzer-ID (vom Server vergeben)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Gibt den inneren Zahlenwert zurueck
    pub fn inner(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Numerische Nachrichten-ID (vom Server vergeben)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl MessageId {
    pub fn inner(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "message:{}", self.0)
    }
}

/// Nachrichtentyp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NachrichtenTyp {
    #[default]
    Text,
    Image,
    Video,
    Gif,
    File,
}

impl NachrichtenTyp {
    /// Nur Text-Nachrichten tragen verschluesselten Inhalt
    pub fn ist_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

/// Eine gespeicherte Nachricht, so wie der Message-Store sie liefert
///
/// Bei `Text` enthaelt `content` entweder Klartext (Altbestand) oder einen
/// verschluesselten Envelope. Bei allen anderen Typen ist `content` eine
/// optionale Bildunterschrift und `file_*` verweist auf die separat
/// gespeicherte Datei.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nachricht {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message_type: NachrichtenTyp,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
    /// ISO-8601 ohne Zeitzone (Server-Zeit)
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

impl Nachricht {
    /// Gibt den Gespraechspartner aus Sicht von `eigene_id` zurueck
    pub fn partner_von(&self, eigene_id: UserId) -> UserId {
        if self.sender_id == eigene_id {
            self.receiver_id
        } else {
            self.sender_id
        }
    }

    /// Verweis auf die angehaengte Datei (falls vorhanden)
    pub fn datei(&self) -> Option<DateiReferenz> {
        self.file_path.as_ref().map(|pfad| DateiReferenz {
            pfad: pfad.clone(),
            name: self.file_name.clone(),
            groesse: self.file_size,
        })
    }
}

/// Verweis auf eine separat gespeicherte Datei
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateiReferenz {
    pub pfad: String,
    pub name: Option<String>,
    pub groesse: Option<i64>,
}

/// Request-Body fuer eine neue Text-Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeueNachricht {
    pub receiver_id: UserId,
    pub content: String,
}

/// Benutzerprofil aus Login- bzw. Session-Antwort
///
/// `encryption_key` ist die eigene Key Material des angemeldeten Benutzers.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenutzerProfil {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_code: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub encryption_key: Option<String>,
}

impl std::fmt::Debug for BenutzerProfil {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenutzerProfil")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("user_code", &self.user_code)
            .field("display_name", &self.display_name)
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
