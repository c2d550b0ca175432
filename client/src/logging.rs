//! Logging fuer den Terminal-Client
//!
//! stdout gehoert der Konversation, Logs gehen daher immer nach stderr.
//! `OURCHAT_LOG_LEVEL` hat Vorrang vor `[logging] level` und darf eine
//! volle Filter-Direktive sein, z.B. `ourchat_chat=debug`.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingEinstellungen};

/// Umgebungsvariable fuer Level bzw. Filter-Direktive
pub const LOG_LEVEL_ENV: &str = "OURCHAT_LOG_LEVEL";

/// Filter aus Umgebung, sonst aus der Konfiguration, sonst `warn`
pub fn filter_bauen(umgebung: Option<&str>, level: &str) -> EnvFilter {
    umgebung
        .and_then(|direktive| EnvFilter::try_new(direktive).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

/// Installiert den globalen Subscriber. Darf nur einmal aufgerufen werden.
pub fn logging_initialisieren(einstellungen: &LoggingEinstellungen) -> anyhow::Result<()> {
    let umgebung = std::env::var(LOG_LEVEL_ENV).ok();
    let filter = filter_bauen(umgebung.as_deref(), &einstellungen.level);
    let basis = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let ergebnis = match einstellungen.format {
        LogFormat::Json => basis.json().with_current_span(true).try_init(),
        LogFormat::Text => basis.compact().with_target(false).try_init(),
    };
    ergebnis.map_err(|e| anyhow::anyhow!("Logging konnte nicht initialisiert werden: {e}"))
}
