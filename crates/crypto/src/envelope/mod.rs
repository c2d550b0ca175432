//! Nachrichten-Envelopes
//!
//! Client-seitige Verschluesselung einzelner Text-Nachrichten. Der Server
//! speichert nur den Base64-Envelope und sieht nie Klartext.
//!
//! ## Ablauf
//! 1. Frisches Salt (16) + IV (12) aus dem OS-Zufallsgenerator
//! 2. PBKDF2-HMAC-SHA256 (100.000 Iterationen) -> AES-256-Schluessel
//! 3. AES-256-GCM verschluesseln (Auth-Tag wird angehaengt)
//! 4. `base64(salt ‖ iv ‖ ciphertext‖tag)`

pub mod classify;
pub mod decrypt;
pub mod encrypt;
pub mod kdf;

pub use classify::{classify, is_encrypted, normalisieren, CiphertextHint};
pub use decrypt::decrypt_text;
pub use encrypt::{encrypt_text, zufalls_parameter};
pub use kdf::{pbkdf2_ableiten, DerivedKeyCache, PBKDF2_ITERATIONEN, STANDARD_CACHE_LIMIT};
