//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::DecryptFailure;

/// Laenge des PBKDF2-Salts in Bytes
pub const SALT_LEN: usize = 16;
/// Laenge des AES-GCM-IV in Bytes
pub const IV_LEN: usize = 12;
/// Laenge des AES-GCM Auth-Tags in Bytes
pub const TAG_LEN: usize = 16;
/// Laenge des abgeleiteten AES-256-Schluessels in Bytes
pub const KEY_LEN: usize = 32;
/// Kleinstmoeglicher Envelope (leerer Klartext)
pub const MIN_ENVELOPE_LEN: usize = SALT_LEN + IV_LEN + TAG_LEN;

/// Geheimnis eines Benutzers, aus dem Schluessel abgeleitet werden
///
/// Kein Schluessel im kryptografischen Sinn, sondern eine Passphrase
/// (`wort-wort-wort-1234`). Wird beim Drop genullt.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyMaterial(String);

impl KeyMaterial {
    pub fn new(material: impl Into<String>) -> Self {
        Self(material.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        let mut bytes = std::mem::take(&mut self.0).into_bytes();
        bytes.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial([REDACTED])")
    }
}

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone)]
pub struct SecretBytes(pub Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Zerlegter Envelope (Salt + IV + Ciphertext inkl. Auth-Tag)
///
/// Wire-Format: `base64(salt[16] ‖ iv[12] ‖ ciphertext‖tag[16])`,
/// Standard-Alphabet mit `=`-Padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    /// Verschluesselter Inhalt inkl. 16 Bytes Auth-Tag (angehaengt)
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Serialisiert zu Bytes: [salt(16)] + [iv(12)] + [ciphertext]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SALT_LEN + IV_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Deserialisiert aus Bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecryptFailure> {
        if bytes.len() < MIN_ENVELOPE_LEN {
            return Err(DecryptFailure::ZuKurz {
                laenge: bytes.len(),
                minimum: MIN_ENVELOPE_LEN,
            });
        }
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&bytes[..SALT_LEN]);
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[SALT_LEN..SALT_LEN + IV_LEN]);
        let ciphertext = bytes[SALT_LEN + IV_LEN..].to_vec();

        Ok(Self { salt, iv, ciphertext })
    }

    /// Base64-kodierte Transportform
    pub fn kodieren(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Parst die Base64-Transportform (umgebende Leerzeichen werden ignoriert)
    pub fn dekodieren(text: &str) -> Result<Self, DecryptFailure> {
        let bytes = STANDARD.decode(text.trim())?;
        Self::from_bytes(&bytes)
    }
}
