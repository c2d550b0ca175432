//! # ourchat-crypto
//!
//! Client-seitige Nachrichten-Verschluesselung fuer OurChat.
//!
//! ## Module
//! - `envelope` - PBKDF2-Ableitung, AES-256-GCM, Envelope-Heuristik
//! - `engine` - `CipherEngine` mit Session-Cache der abgeleiteten Schluessel
//! - `conversation` - Gemeinsames Konversations-Material (HKDF)
//! - `passphrase` - Erzeugung und Pruefung von Key Material
//! - `types` - Gemeinsame Typen (KeyMaterial, EncryptedEnvelope, SecretBytes)
//! - `error` - Fehlertypen

pub mod conversation;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod passphrase;
pub mod types;

// Bequeme Re-Exports
pub use conversation::{derive_conversation_material, hkdf_derive};
pub use engine::CipherEngine;
pub use envelope::{classify, is_encrypted, CiphertextHint};
pub use error::{CryptoError, CryptoResult, DecryptFailure};
pub use passphrase::{generate_passphrase, is_valid_passphrase};
pub use types::{EncryptedEnvelope, KeyMaterial, SecretBytes};
