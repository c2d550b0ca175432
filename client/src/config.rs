//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Client ohne Konfigurationsdatei
//! lauffaehig ist.

use std::time::Duration;

use anyhow::bail;
use ourchat_chat::{ChatKonfiguration, KeyingStrategy};
use ourchat_crypto::envelope::STANDARD_CACHE_LIMIT;
use serde::{Deserialize, Serialize};

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Verbindung zum OurChat-Server
    pub server: ServerEinstellungen,
    /// Nachrichten-Austausch
    pub chat: ChatEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Verbindung zum OurChat-Server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Basis-URL, z.B. `https://chat.example.org`
    pub url: String,
    /// Zeitlimit pro HTTP-Anfrage in Sekunden
    pub zeitlimit_sek: u64,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".into(),
            zeitlimit_sek: 10,
        }
    }
}

/// Nachrichten-Austausch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatEinstellungen {
    /// Abstand zwischen zwei Abrufen der offenen Konversation
    pub poll_intervall_ms: u64,
    /// `receiver` (Standard) oder `conversation`
    pub strategie: KeyingStrategy,
    /// Maximale Anzahl abgeleiteter Schluessel im Cache
    pub key_cache_limit: usize,
}

impl Default for ChatEinstellungen {
    fn default() -> Self {
        Self {
            poll_intervall_ms: 2000,
            strategie: KeyingStrategy::Receiver,
            key_cache_limit: STANDARD_CACHE_LIMIT,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: LogFormat::Text,
        }
    }
}

/// Ausgabeformat der Logs auf stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Woher die geladene Konfiguration stammt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Herkunft {
    Datei,
    /// Datei fehlt, es gelten die Standardwerte
    Standardwerte,
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    ///
    /// Fehlt die Datei, gelten die Standardwerte. Der Aufrufer meldet das
    /// erst, wenn das Logging steht.
    pub fn laden(pfad: &str) -> anyhow::Result<(Self, Herkunft)> {
        let (config, herkunft) = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config = toml::from_str::<Self>(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                (config, Herkunft::Datei)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Self::default(), Herkunft::Standardwerte)
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.pruefen()?;
        Ok((config, herkunft))
    }

    /// Prueft Werte, die serde nicht abfangen kann
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if self.server.url.trim().is_empty() {
            bail!("server.url darf nicht leer sein");
        }
        if self.server.zeitlimit_sek == 0 {
            bail!("server.zeitlimit_sek muss groesser als 0 sein");
        }
        if self.chat.poll_intervall_ms == 0 {
            bail!("chat.poll_intervall_ms muss groesser als 0 sein");
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            bail!("Unbekanntes Log-Level '{}'", self.logging.level);
        }
        Ok(())
    }

    pub fn zeitlimit(&self) -> Duration {
        Duration::from_secs(self.server.zeitlimit_sek)
    }

    /// Einstellungen fuer den `MessageExchange`
    pub fn chat_konfiguration(&self) -> ChatKonfiguration {
        ChatKonfiguration {
            poll_intervall: Duration::from_millis(self.chat.poll_intervall_ms),
            strategie: self.chat.strategie,
            key_cache_limit: self.chat.key_cache_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ClientConfig::default();
        assert!(cfg.pruefen().is_ok());
        assert_eq!(cfg.chat.poll_intervall_ms, 2000);
        assert_eq!(cfg.chat.strategie, KeyingStrategy::Receiver);
        assert_eq!(cfg.chat.key_cache_limit, 4096);
        assert_eq!(cfg.zeitlimit(), Duration::from_secs(10));
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            url = "https://chat.example.org"

            [chat]
            strategie = "conversation"
            poll_intervall_ms = 5000
        "#;
        let cfg: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.url, "https://chat.example.org");
        assert_eq!(cfg.chat.strategie, KeyingStrategy::Conversation);

        let chat = cfg.chat_konfiguration();
        assert_eq!(chat.poll_intervall, Duration::from_millis(5000));
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.server.zeitlimit_sek, 10);
        assert_eq!(cfg.logging.format, LogFormat::Text);
    }

    #[test]
    fn ungueltige_werte_werden_abgelehnt() {
        let mut cfg = ClientConfig::default();
        cfg.chat.poll_intervall_ms = 0;
        assert!(cfg.pruefen().is_err());

        let mut cfg = ClientConfig::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.pruefen().is_err());

        let cfg: Result<ClientConfig, _> = toml::from_str("[chat]\nstrategie = \"gruppe\"");
        assert!(cfg.is_err());

        let cfg: Result<ClientConfig, _> = toml::from_str("[logging]\nformat = \"xml\"");
        assert!(cfg.is_err());
    }

    #[test]
    fn log_level_akzeptiert_tracing_namen() {
        for level in ["trace", "debug", "info", "warn", "error", "INFO"] {
            let mut cfg = ClientConfig::default();
            cfg.logging.level = level.into();
            assert!(cfg.pruefen().is_ok(), "{level}");
        }
    }

    #[test]
    fn fehlende_datei_ergibt_standardwerte() {
        let (cfg, herkunft) = ClientConfig::laden("/nicht/vorhanden/ourchat.toml").unwrap();
        assert_eq!(herkunft, Herkunft::Standardwerte);
        assert_eq!(cfg.server.url, ServerEinstellungen::default().url);
    }

    #[test]
    fn datei_wird_gelesen() {
        let pfad = std::env::temp_dir().join(format!("ourchat-test-{}.toml", std::process::id()));
        std::fs::write(&pfad, "[logging]\nlevel = \"debug\"\nformat = \"json\"\n").unwrap();

        let (cfg, herkunft) = ClientConfig::laden(pfad.to_str().unwrap()).unwrap();
        assert_eq!(herkunft, Herkunft::Datei);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, LogFormat::Json);

        std::fs::remove_file(&pfad).unwrap();
    }
}
