//! CipherEngine – Ver- und Entschluesselung einzelner Nachrichten
//!
//! Besitzt den Session-Cache der abgeleiteten Schluessel. Eine Instanz pro
//! angemeldeter Sitzung; beim Logout wird `clear_cache` aufgerufen.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::envelope::{self, CiphertextHint, DerivedKeyCache};
use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptedEnvelope, KeyMaterial, SecretBytes};

/// Authentifizierte Verschluesselung von UTF-8-Texten unter Key Material
#[derive(Debug, Default)]
pub struct CipherEngine {
    cache: DerivedKeyCache,
    /// Anzahl tatsaechlich ausgefuehrter PBKDF2-Ableitungen
    ableitungen: AtomicU64,
}

impl CipherEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine mit begrenztem Key-Cache
    pub fn mit_cache_limit(max_eintraege: usize) -> Self {
        Self {
            cache: DerivedKeyCache::new(max_eintraege),
            ableitungen: AtomicU64::new(0),
        }
    }

    /// Leitet den Schluessel fuer (Material, Salt) ab, bevorzugt aus dem Cache
    pub fn derive_key(&self, material: &KeyMaterial, salt: &[u8]) -> CryptoResult<Arc<SecretBytes>> {
        if let Some(key) = self.cache.get(material, salt) {
            tracing::trace!("Abgeleiteter Schluessel aus Cache");
            return Ok(key);
        }

        let generation = self.cache.generation();
        let key = Arc::new(envelope::pbkdf2_ableiten(material, salt)?);
        self.ableitungen.fetch_add(1, Ordering::Relaxed);
        self.cache
            .einfuegen(material, salt, Arc::clone(&key), generation);
        Ok(key)
    }

    /// Verschluesselt `plaintext` und gibt den Base64-Envelope zurueck
    pub fn encrypt(&self, plaintext: &str, material: &KeyMaterial) -> CryptoResult<String> {
        if plaintext.is_empty() {
            return Err(CryptoError::Verschluesselung("Kein Klartext angegeben".to_string()));
        }
        if material.is_empty() {
            return Err(CryptoError::Verschluesselung("Keine Key Material angegeben".to_string()));
        }

        let (salt, iv) = envelope::zufalls_parameter();
        let key = self.derive_key(material, &salt)?;
        let env = envelope::encrypt_text(plaintext, key.as_bytes(), salt, iv)?;

        tracing::debug!(bytes = plaintext.len(), "Nachricht verschluesselt");
        Ok(env.kodieren())
    }

    /// Entschluesselt einen Base64-Envelope
    pub fn decrypt(&self, envelope: &str, material: &KeyMaterial) -> CryptoResult<String> {
        let env = EncryptedEnvelope::dekodieren(envelope)?;
        let key = self.derive_key(material, &env.salt)?;
        envelope::decrypt_text(&env, key.as_bytes())
    }

    /// Heuristik, ob `text` ein Envelope sein koennte
    pub fn is_encrypted(text: &str) -> bool {
        envelope::is_encrypted(text)
    }

    /// Tri-State-Variante von [`CipherEngine::is_encrypted`]
    pub fn classify(text: &str) -> CiphertextHint {
        envelope::classify(text)
    }

    /// Verwirft alle abgeleiteten Schluessel (Logout)
    pub fn clear_cache(&self) {
        let anzahl = self.cache.len();
        self.cache.clear();
        tracing::debug!(anzahl, "Key-Cache geleert");
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn ableitungen(&self) -> u64 {
        self.ableitungen.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecryptFailure;

    fn material(s: &str) -> KeyMaterial {
        KeyMaterial::new(s)
    }

    #[test]
    fn roundtrip() {
        let engine = CipherEngine::new();
        let k = material("alpha-bravo-charlie-1234");
        let env = engine.encrypt("Hallo Bob!", &k).unwrap();
        assert_eq!(engine.decrypt(&env, &k).unwrap(), "Hallo Bob!");
    }

    #[test]
    fn roundtrip_unicode() {
        let engine = CipherEngine::new();
        let k = material("ocean-river-comet-0001");
        let text = "Grüße aus Köln 🌧️ – bis später";
        let env = engine.encrypt(text, &k).unwrap();
        assert_eq!(engine.decrypt(&env, &k).unwrap(), text);
    }

    #[test]
    fn zwei_verschluesselungen_sind_verschieden() {
        let engine = CipherEngine::new();
        let k = material("tango-xray-nebula-7777");
        let a = engine.encrypt("gleich", &k).unwrap();
        let b = engine.encrypt("gleich", &k).unwrap();
        assert_ne!(a, b);
        assert_eq!(engine.decrypt(&a, &k).unwrap(), "gleich");
        assert_eq!(engine.decrypt(&b, &k).unwrap(), "gleich");
    }

    #[test]
    fn fremder_schluessel_schlaegt_fehl() {
        let engine = CipherEngine::new();
        let env = engine.encrypt("geheim", &material("alpha-alpha-alpha-1111")).unwrap();
        let result = engine.decrypt(&env, &material("bravo-bravo-bravo-2222"));
        assert!(matches!(
            result,
            Err(CryptoError::Entschluesselung(DecryptFailure::Authentifizierung))
        ));
    }

    #[test]
    fn ausgabe_wird_als_envelope_erkannt() {
        let engine = CipherEngine::new();
        let env = engine.encrypt("x", &material("k")).unwrap();
        assert!(CipherEngine::is_encrypted(&env));
        assert_eq!(CipherEngine::classify(&env), CiphertextHint::LooksLikeEnvelope);
    }

    #[test]
    fn leerer_klartext_oder_material_wird_abgelehnt() {
        let engine = CipherEngine::new();
        assert!(matches!(
            engine.encrypt("", &material("k")),
            Err(CryptoError::Verschluesselung(_))
        ));
        assert!(matches!(
            engine.encrypt("text", &material("")),
            Err(CryptoError::Verschluesselung(_))
        ));
    }

    #[test]
    fn kaputter_envelope_ist_entschluesselungsfehler() {
        let engine = CipherEngine::new();
        let result = engine.decrypt("not-base64-envelope", &material("k"));
        assert!(matches!(
            result,
            Err(CryptoError::Entschluesselung(DecryptFailure::Base64(_)))
        ));

        let zu_kurz = engine.decrypt("QUJD", &material("k"));
        assert!(matches!(
            zu_kurz,
            Err(CryptoError::Entschluesselung(DecryptFailure::ZuKurz { .. }))
        ));
    }

    #[test]
    fn cache_wird_befuellt_und_geleert() {
        let engine = CipherEngine::new();
        let k = material("storm-thunder-comet-4242");
        let env = engine.encrypt("a", &k).unwrap();
        assert_eq!(engine.cache_len(), 1);

        // Entschluesseln trifft den Cache (gleiches Salt)
        engine.decrypt(&env, &k).unwrap();
        assert_eq!(engine.cache_len(), 1);

        engine.clear_cache();
        assert_eq!(engine.cache_len(), 0);
        // Nach dem Leeren funktioniert Entschluesseln weiterhin
        assert_eq!(engine.decrypt(&env, &k).unwrap(), "a");
    }

    #[test]
    fn derive_key_ist_deterministisch() {
        let engine = CipherEngine::new();
        let k = material("delta-echo-golf-1000");
        let salt = [42u8; 16];
        let a = engine.derive_key(&k, &salt).unwrap();
        engine.clear_cache();
        let b = engine.derive_key(&k, &salt).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(engine.ableitungen(), 2);
    }

    #[test]
    fn volles_limit_cacht_die_neuesten_schluessel() {
        let engine = CipherEngine::mit_cache_limit(2);
        let k = material("foxtrot-hotel-india-5555");
        let envelopes: Vec<String> = (0..3)
            .map(|i| engine.encrypt(&format!("n{i}"), &k).unwrap())
            .collect();
        assert_eq!(engine.ableitungen(), 3);
        assert_eq!(engine.cache_len(), 2);

        // Die beiden juengsten treffen den Cache
        engine.decrypt(&envelopes[1], &k).unwrap();
        engine.decrypt(&envelopes[2], &k).unwrap();
        assert_eq!(engine.ableitungen(), 3);

        // Der verdraengte wird neu abgeleitet und wieder aufgenommen
        assert_eq!(engine.decrypt(&envelopes[0], &k).unwrap(), "n0");
        assert_eq!(engine.ableitungen(), 4);
        assert_eq!(engine.cache_len(), 2);
    }
}
