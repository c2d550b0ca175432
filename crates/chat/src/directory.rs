//! Schluessel-Verzeichnis (Key Directory Client)
//!
//! Loest Benutzer-IDs in deren Key Material auf und haelt das Ergebnis fuer
//! die Dauer der Sitzung. Ein Fehlschlag ist fuer die laufende
//! Verschluesselung fatal; es gibt nie einen Rueckfall auf Klartext.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use ourchat_core::UserId;
use ourchat_crypto::KeyMaterial;
use parking_lot::RwLock;

use crate::error::{ChatError, ChatResult};
use crate::transport::ChatTransport;

/// Session-Cache `UserId -> KeyMaterial` mit Nachladen ueber den Transport
pub struct KeyDirectory<T: ChatTransport> {
    transport: Arc<T>,
    cache: DashMap<UserId, KeyMaterial>,
    /// Wird bei `reset` unter dem Schreib-Lock erhoeht. Einfuegen haelt den
    /// Lese-Lock, Abfragen aus aelteren Generationen schreiben daher nie
    /// mehr in den Cache.
    generation: RwLock<u64>,
    abrufe: AtomicU64,
}

impl<T: ChatTransport> KeyDirectory<T> {
    pub fn neu(transport: Arc<T>) -> Self {
        Self {
            transport,
            cache: DashMap::new(),
            generation: RwLock::new(0),
            abrufe: AtomicU64::new(0),
        }
    }

    /// Key Material eines Benutzers, bevorzugt aus dem Cache
    pub async fn resolve(&self, user_id: UserId) -> ChatResult<KeyMaterial> {
        if let Some(material) = self.cache.get(&user_id).map(|m| m.clone()) {
            return Ok(material);
        }

        let generation = *self.generation.read();
        self.abrufe.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%user_id, "Key Material wird vom Server geladen");

        let antwort = self
            .transport
            .encryption_key(user_id)
            .await
            .map_err(|e| ChatError::VerzeichnisAbfrage {
                user_id,
                grund: e.to_string(),
            })?;

        let material = match antwort {
            Some(wert) if !wert.is_empty() => KeyMaterial::new(wert),
            _ => {
                return Err(ChatError::VerzeichnisAbfrage {
                    user_id,
                    grund: "Antwort ohne Key Material".to_string(),
                })
            }
        };

        {
            let aktuell = self.generation.read();
            if *aktuell == generation {
                self.cache.insert(user_id, material.clone());
                tracing::debug!(%user_id, eintraege = self.cache.len(), "Key Material zwischengespeichert");
            } else {
                tracing::debug!(%user_id, "Verzeichnis wurde zurueckgesetzt, Ergebnis nicht gespeichert");
            }
        }

        Ok(material)
    }

    /// Leert den gesamten Cache (Logout)
    pub fn reset(&self) {
        let mut generation = self.generation.write();
        *generation += 1;
        let anzahl = self.cache.len();
        self.cache.clear();
        drop(generation);
        tracing::debug!(anzahl, "Schluessel-Verzeichnis geleert");
    }

    /// Anzahl der bisher durchgefuehrten Netzwerk-Abfragen
    pub fn abrufe(&self) -> u64 {
        self.abrufe.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
