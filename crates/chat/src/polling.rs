//! Polling der geoeffneten Konversation
//!
//! Ein Tokio-Task pro offener Konversation. Der naechste Tick wird erst
//! nach Ende des vorherigen Durchlaufs faellig (`MissedTickBehavior::Delay`),
//! Durchlaeufe ueberlappen sich also nie. Der Task haelt nur eine schwache
//! Referenz und endet, sobald der `MessageExchange` freigegeben ist.

use std::sync::Weak;
use std::time::Duration;

use ourchat_core::UserId;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::service::MessageExchange;
use crate::transport::ChatTransport;

/// Laufender Polling-Timer; wird beim Drop abgebrochen
#[derive(Debug)]
pub struct Poller {
    partner: UserId,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Startet das Polling; der erste Tick kommt nach einem vollen Intervall
    pub fn starten<T: ChatTransport>(
        exchange: Weak<MessageExchange<T>>,
        partner: UserId,
        intervall: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + intervall, intervall);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(exchange) = exchange.upgrade() else {
                    break;
                };

                match exchange.aktualisieren().await {
                    Ok(Some(ansicht)) => {
                        tracing::trace!(%partner, anzahl = ansicht.nachrichten.len(), "Poll-Durchlauf");
                    }
                    Ok(None) => tracing::debug!(%partner, "Poll-Ergebnis verworfen"),
                    Err(e) => tracing::warn!(%partner, fehler = %e, "Poll-Durchlauf fehlgeschlagen"),
                }
            }
        });

        tracing::debug!(%partner, intervall_ms = intervall.as_millis() as u64, "Polling gestartet");
        Self { partner, handle }
    }

    pub fn partner(&self) -> UserId {
        self.partner
    }

    /// Bricht den Task ab
    pub fn stoppen(self) {
        drop(self);
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
