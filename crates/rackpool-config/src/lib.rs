//! Layered configuration for the rackpool dispatcher.
//!
//! [`Config`] is resolved by `ortho_config` from, in increasing precedence,
//! built-in defaults, a `rackpool.toml` file, `RACKPOOL_*` environment
//! variables and command-line flags. Pool sizing is validated separately via
//! [`Config::pool_settings`] so loading never fails on a merely inconsistent
//! pool shape; the bootstrap decides what to do with that.

mod defaults;
mod logging;
mod pool;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_ACQUIRE_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_MAX_INSTANCES, DEFAULT_MIN_INSTANCES,
    default_acquire_timeout_ms, default_log_filter, default_log_filter_string, default_log_format,
    default_max_instances, default_min_instances,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use pool::{PoolSettings, PoolSettingsError};

/// Resolved dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "RACKPOOL")]
pub struct Config {
    /// Application instances built eagerly at startup.
    #[ortho_config(default = default_min_instances())]
    pub min_instances: usize,
    /// Maximum application instances alive at once.
    #[ortho_config(default = default_max_instances())]
    pub max_instances: usize,
    /// Milliseconds `acquire` waits for a free instance before failing.
    #[ortho_config(default = default_acquire_timeout_ms())]
    pub acquire_timeout_ms: u64,
    /// `tracing_subscriber::EnvFilter` expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for the telemetry subscriber.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_instances: default_min_instances(),
            max_instances: default_max_instances(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Telemetry output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Acquisition timeout as a [`Duration`].
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Validates the pool fields and returns them as [`PoolSettings`].
    ///
    /// # Errors
    ///
    /// Returns a [`PoolSettingsError`] when the bounds are inconsistent.
    pub fn pool_settings(&self) -> Result<PoolSettings, PoolSettingsError> {
        PoolSettings::new(
            self.min_instances,
            self.max_instances,
            self.acquire_timeout(),
        )
    }
}
