//! Text-Verschluesselung
//!
//! ## Format
//! ```text
//! base64( [salt(16)] [iv(12)] [ciphertext + auth_tag(16)] )
//! ```
//!
//! Salt und IV kommen bei jedem Aufruf frisch aus dem OS-Zufallsgenerator,
//! nie aus einem Zaehler.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptedEnvelope, IV_LEN, KEY_LEN, SALT_LEN};

/// Frisches Salt + IV fuer einen neuen Envelope
pub fn zufalls_parameter() -> ([u8; SALT_LEN], [u8; IV_LEN]) {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);
    (salt, iv)
}

/// Verschluesselt einen Klartext mit einem bereits abgeleiteten Schluessel
///
/// # Parameter
/// - `plaintext`: UTF-8-Text der Nachricht
/// - `key_bytes`: 32-Byte-Schluessel aus der PBKDF2-Ableitung
/// - `salt`: Salt, mit dem `key_bytes` abgeleitet wurde (landet im Envelope)
/// - `iv`: einmalig zu verwendender IV
pub fn encrypt_text(
    plaintext: &str,
    key_bytes: &[u8],
    salt: [u8; SALT_LEN],
    iv: [u8; IV_LEN],
) -> CryptoResult<EncryptedEnvelope> {
    let ciphertext = encrypt_aes256gcm(plaintext.as_bytes(), key_bytes, &iv)?;
    Ok(EncryptedEnvelope { salt, iv, ciphertext })
}

fn encrypt_aes256gcm(
    plaintext: &[u8],
    key_bytes: &[u8],
    nonce_bytes: &[u8; IV_LEN],
) -> CryptoResult<Vec<u8>> {
    if key_bytes.len() != KEY_LEN {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: KEY_LEN,
            erhalten: key_bytes.len(),
        });
    }

    let key = Key::<Aes256Gcm>::from_slice(key_bytes);
    let cipher = Aes256Gcm::new(key);
    let nonce = AesNonce::from_slice(nonce_bytes);

    cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
