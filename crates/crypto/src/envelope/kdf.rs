//! Schluessel-Ableitung (PBKDF2-HMAC-SHA256) und Cache der abgeleiteten Schluessel
//!
//! PBKDF2 mit 100.000 Iterationen ist absichtlich langsam. Da jeder Envelope
//! ein eigenes Salt traegt, wird pro Nachricht genau einmal abgeleitet; jede
//! weitere Entschluesselung derselben Nachricht (z.B. beim Polling) trifft den
//! Cache.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU32;
use std::sync::Arc;

use parking_lot::Mutex;
use ring::pbkdf2;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{KeyMaterial, SecretBytes, KEY_LEN, SALT_LEN};

/// Anzahl der PBKDF2-Iterationen
pub const PBKDF2_ITERATIONEN: u32 = 100_000;

/// Standard-Obergrenze fuer Cache-Eintraege
pub const STANDARD_CACHE_LIMIT: usize = 4096;

/// Leitet einen AES-256-Schluessel aus Key Material und Salt ab
pub fn pbkdf2_ableiten(material: &KeyMaterial, salt: &[u8]) -> CryptoResult<SecretBytes> {
    if material.is_empty() {
        return Err(CryptoError::KeyDerivation("Leere Key Material".to_string()));
    }
    if salt.len() != SALT_LEN {
        return Err(CryptoError::KeyDerivation(format!(
            "Ungueltige Salt-Laenge: erwartet {SALT_LEN}, erhalten {}",
            salt.len()
        )));
    }
    let iterationen = NonZeroU32::new(PBKDF2_ITERATIONEN)
        .ok_or_else(|| CryptoError::KeyDerivation("Iterationszahl ist 0".to_string()))?;

    let mut key = vec![0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterationen,
        salt,
        material.as_bytes(),
        &mut key,
    );
    Ok(SecretBytes::new(key))
}

/// Session-Cache: (Key Material ‖ Salt) -> abgeleiteter Schluessel
///
/// Wird nie persistiert und beim Logout komplett geleert. Die Generation
/// verhindert, dass eine Ableitung, die vor `clear()` begonnen hat, ihr
/// Ergebnis danach noch einfuegt. Ist das Limit erreicht, wird der aelteste
/// Eintrag verdraengt.
#[derive(Debug)]
pub struct DerivedKeyCache {
    inhalt: Mutex<CacheInhalt>,
    max_eintraege: usize,
}

#[derive(Debug, Default)]
struct CacheInhalt {
    eintraege: HashMap<Vec<u8>, Arc<SecretBytes>>,
    /// Einfuege-Reihenfolge, vorne der aelteste Eintrag
    reihenfolge: VecDeque<Vec<u8>>,
    generation: u64,
}

impl DerivedKeyCache {
    pub fn new(max_eintraege: usize) -> Self {
        Self {
            inhalt: Mutex::new(CacheInhalt::default()),
            max_eintraege,
        }
    }

    /// Das Salt steht immer in den letzten 16 Bytes, daher ist die
    /// Konkatenation eindeutig.
    fn cache_key(material: &KeyMaterial, salt: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(material.as_bytes().len() + salt.len());
        key.extend_from_slice(material.as_bytes());
        key.extend_from_slice(salt);
        key
    }

    pub fn get(&self, material: &KeyMaterial, salt: &[u8]) -> Option<Arc<SecretBytes>> {
        self.inhalt
            .lock()
            .eintraege
            .get(&Self::cache_key(material, salt))
            .map(Arc::clone)
    }

    pub fn generation(&self) -> u64 {
        self.inhalt.lock().generation
    }

    /// Fuegt den Schluessel ein, sofern seit `generation` nicht geleert wurde.
    /// Pruefung und Einfuegen laufen unter demselben Lock wie `clear()`.
    /// Gibt zurueck ob eingefuegt wurde.
    pub fn einfuegen(
        &self,
        material: &KeyMaterial,
        salt: &[u8],
        key: Arc<SecretBytes>,
        generation: u64,
    ) -> bool {
        if self.max_eintraege == 0 {
            return false;
        }
        let cache_key = Self::cache_key(material, salt);
        let mut inhalt = self.inhalt.lock();
        if inhalt.generation != generation {
            tracing::debug!("Cache wurde waehrend der Ableitung geleert, verwerfe Schluessel");
            return false;
        }
        if inhalt.eintraege.contains_key(&cache_key) {
            inhalt.eintraege.insert(cache_key, key);
            return true;
        }
        while inhalt.eintraege.len() >= self.max_eintraege {
            let Some(aeltester) = inhalt.reihenfolge.pop_front() else {
                break;
            };
            inhalt.eintraege.remove(&aeltester);
            tracing::trace!(limit = self.max_eintraege, "Aeltester Schluessel verdraengt");
        }
        inhalt.reihenfolge.push_back(cache_key.clone());
        inhalt.eintraege.insert(cache_key, key);
        true
    }

    /// Leert den Cache vollstaendig
    pub fn clear(&self) {
        let mut inhalt = self.inhalt.lock();
        inhalt.generation += 1;
        inhalt.eintraege.clear();
        inhalt.reihenfolge.clear();
    }

    pub fn len(&self) -> usize {
        self.inhalt.lock().eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inhalt.lock().eintraege.is_empty()
    }
}

impl Default for DerivedKeyCache {
    fn default() -> Self {
        Self::new(STANDARD_CACHE_LIMIT)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
