//! Log file setup
//!
//! The editor owns the terminal, so nothing is logged to it. Records from
//! the `log` facade (used by the library crates) and from `tracing` go to
//! `<data-local-dir>/tabula/logs/tabula.log`, rotated daily.
//!
//! Filtering follows the `TABULA_LOG` environment variable in `EnvFilter`
//! syntax (`TABULA_LOG=debug`, `TABULA_LOG=tabula_io=trace`), default `info`.

use std::path::PathBuf;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_ENV: &str = "TABULA_LOG";

pub fn logs_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("tabula").join("logs"))
}

/// Install the file subscriber. Failing to create the log directory only
/// disables logging.
pub fn init() {
    let Some(dir) = logs_dir() else {
        return;
    };
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("Warning: Could not initialize file logging: {}", e);
        return;
    }

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let file_appender = tracing_appender::rolling::daily(dir, "tabula.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_filter(filter);

    // try_init also installs the log -> tracing bridge
    if let Err(e) = tracing_subscriber::registry().with(file_layer).try_init() {
        eprintln!("Warning: Could not initialize file logging: {}", e);
    }
}
