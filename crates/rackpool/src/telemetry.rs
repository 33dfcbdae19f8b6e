//! Process-wide tracing subscriber for pools and dispatchers.
//!
//! Several pools can live in one process and each bootstraps telemetry. Only
//! the first call installs a subscriber; later calls get a handle reporting
//! the format that is actually active.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use rackpool_config::{Config, LogFormat};
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Proof that a subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format of the active subscriber.
    ///
    /// This is the format of whichever configuration installed telemetry
    /// first, which may not be the caller's.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured `log_filter` is not a valid `EnvFilter` directive.
    #[error("log filter `{filter}` is invalid: {message}")]
    Filter {
        /// Expression as configured.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Something outside rackpool already owns the global subscriber.
    #[error("another tracing subscriber is already installed: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the global subscriber described by `config` on first use.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter and
/// [`TelemetryError::Subscriber`] when a foreign subscriber got there first.
/// A failed first call leaves telemetry uninstalled so a later call can retry.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let format = INSTALLED_FORMAT.get_or_try_init(|| {
        install_subscriber(config)?;
        Ok::<_, TelemetryError>(config.log_format())
    })?;
    Ok(TelemetryHandle { format: *format })
}

fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter {
        filter: expression.to_owned(),
        message: error.to_string(),
    })
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let base = fmt::Subscriber::builder()
        .with_env_filter(parse_filter(config.log_filter())?)
        .with_target(true)
        // Requests are dispatched from caller threads; name them in events.
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(base.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(base.compact().finish()),
        LogFormat::Pretty => Box::new(base.pretty().finish()),
    };
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
