//! Text-Entschluesselung
//!
//! Prueft dabei den Auth-Tag; ein falscher Schluessel oder manipulierter
//! Inhalt fuehrt immer zu einem Fehler, nie zu falschem Klartext.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce as AesNonce,
};

use crate::error::{CryptoError, CryptoResult, DecryptFailure};
use crate::types::{EncryptedEnvelope, IV_LEN, KEY_LEN};

/// Entschluesselt einen zerlegten Envelope mit einem abgeleiteten Schluessel
pub fn decrypt_text(envelope: &EncryptedEnvelope, key_bytes: &[u8]) -> CryptoResult<String> {
    let plaintext = decrypt_aes256gcm(&envelope.ciphertext, key_bytes, &envelope.iv)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::Entschluesselung(DecryptFailure::KeinUtf8))
}

fn decrypt_aes256gcm(
    ciphertext: &[u8],
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
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::Entschluesselung(DecryptFailure::Authentifizierung))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
