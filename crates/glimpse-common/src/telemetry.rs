//! Tracing setup for the glimpse binary.
//!
//! Console output is always on. When `LOG_DIR` is set, a daily-rolling file
//! layer is added; keep the returned [`TelemetryGuard`] alive for the life of
//! the process so buffered file output gets flushed.
//!
//! ```ignore
//! let _guard = glimpse_common::telemetry::init(TelemetryConfig::from_env());
//! tracing::info!("server started");
//! ```

use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Directory for rolling log files. None disables file logging.
    pub log_dir: Option<PathBuf>,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
}

impl TelemetryConfig {
    /// Load config from environment variables.
    ///
    /// - `LOG_DIR`: directory for rolling log files (optional)
    /// - `RUST_LOG`: standard env filter (optional, overrides console_level)
    pub fn from_env() -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            log_dir: std::env::var_os("LOG_DIR").map(PathBuf::from),
            console_level,
        }
    }
}

/// Keeps the non-blocking file writer alive.
pub struct TelemetryGuard {
    _file: Option<WorkerGuard>,
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()))
}

/// Install the global subscriber. Call once at startup.
pub fn init(config: TelemetryConfig) -> TelemetryGuard {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter(config.console_level));

    let Some(log_dir) = config.log_dir else {
        tracing_subscriber::registry().with(console_layer).init();
        tracing::debug!("telemetry initialized (console only, set LOG_DIR for file logs)");
        return TelemetryGuard { _file: None };
    };

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        tracing_subscriber::registry().with(console_layer).init();
        tracing::warn!(
            error = %e,
            log_dir = %log_dir.display(),
            "could not create LOG_DIR, falling back to console only"
        );
        return TelemetryGuard { _file: None };
    }

    let appender = tracing_appender::rolling::daily(&log_dir, crate::APP_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(env_filter(config.console_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(log_dir = %log_dir.display(), "telemetry initialized with file logs");
    TelemetryGuard { _file: Some(guard) }
}
