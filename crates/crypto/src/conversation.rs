//! Konversations-Schluessel
//!
//! Alternative zur Verschluesselung mit dem Key Material des Empfaengers:
//! beide Teilnehmer leiten aus beiden Key Materials dasselbe
//! Konversations-Material ab. Die Reihenfolge der Argumente spielt keine
//! Rolle, da die Paare nach Benutzer-ID sortiert werden.
//!
//! Ohne Schluesselaustausch braucht jede Seite das Material des Partners
//! einmal pro Sitzung; danach ist der Schluessel in beide Richtungen gleich.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{KeyMaterial, SecretBytes, KEY_LEN};

const KONVERSATION_SALT: &[u8] = b"ourchat-konversation-v1";

/// HKDF-SHA256 Ableitung mit beliebiger Ausgabelaenge
pub fn hkdf_derive(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> CryptoResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

/// Leitet das gemeinsame Key Material einer Zwei-Personen-Konversation ab
///
/// Die IDs werden als Dezimalzahlen in kanonischer (sortierter) Reihenfolge
/// in `info` aufgenommen; das Ergebnis ist ein 32-Byte-Geheimnis als Hex.
pub fn derive_conversation_material(
    user_a: i64,
    material_a: &KeyMaterial,
    user_b: i64,
    material_b: &KeyMaterial,
) -> CryptoResult<KeyMaterial> {
    if material_a.is_empty() || material_b.is_empty() {
        return Err(CryptoError::KeyDerivation(
            "Konversations-Schluessel braucht beide Key Materials".to_string(),
        ));
    }

    let ((erste_id, erstes), (zweite_id, zweites)) = if user_a <= user_b {
        ((user_a, material_a), (user_b, material_b))
    } else {
        ((user_b, material_b), (user_a, material_a))
    };

    // Laengenpraefix, damit ("ab","c") und ("a","bc") verschieden bleiben
    let mut ikm = Vec::with_capacity(16 + erstes.as_bytes().len() + zweites.as_bytes().len());
    for teil in [erstes.as_bytes(), zweites.as_bytes()] {
        ikm.extend_from_slice(&(teil.len() as u64).to_be_bytes());
        ikm.extend_from_slice(teil);
    }
    let ikm = SecretBytes::new(ikm);

    let info = format!("konversation:{erste_id}:{zweite_id}");
    let okm = SecretBytes::new(hkdf_derive(
        ikm.as_bytes(),
        KONVERSATION_SALT,
        info.as_bytes(),
        KEY_LEN,
    )?);

    Ok(KeyMaterial::new(hex::encode(okm.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(s: &str) -> KeyMaterial {
        KeyMaterial::new(s)
    }

    #[test]
    fn symmetrisch_in_der_reihenfolge() {
        let a = derive_conversation_material(1, &k("alpha-a-a-1111"), 2, &k("bravo-b-b-2222")).unwrap();
        let b = derive_conversation_material(2, &k("bravo-b-b-2222"), 1, &k("alpha-a-a-1111")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), KEY_LEN * 2);
    }

    #[test]
    fn andere_paare_andere_schluessel() {
        let ab = derive_conversation_material(1, &k("a"), 2, &k("b")).unwrap();
        let ac = derive_conversation_material(1, &k("a"), 3, &k("c")).unwrap();
        let ab_andere_ids = derive_conversation_material(5, &k("a"), 6, &k("b")).unwrap();
        assert_ne!(ab, ac);
        assert_ne!(ab, ab_andere_ids);
    }

    #[test]
    fn laengenpraefix_trennt_materialien() {
        let x = derive_conversation_material(1, &k("ab"), 2, &k("c")).unwrap();
        let y = derive_conversation_material(1, &k("a"), 2, &k("bc")).unwrap();
        assert_ne!(x, y);
    }

    #[test]
    fn leeres_material_wird_abgelehnt() {
        let result = derive_conversation_material(1, &k(""), 2, &k("b"));
        assert!(matches!(result, Err(CryptoError::KeyDerivation(_))));
    }

    #[test]
    fn hkdf_laenge() {
        let okm = hkdf_derive(b"ikm", b"salt", b"info", 42).unwrap();
        assert_eq!(okm.len(), 42);
    }
}
