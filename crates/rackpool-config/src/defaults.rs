//! Default values shared by the configuration loader and its callers.

use crate::logging::LogFormat;

/// Number of application instances built before the first request.
pub const DEFAULT_MIN_INSTANCES: usize = 1;

/// Upper bound on concurrently leased application instances.
pub const DEFAULT_MAX_INSTANCES: usize = 4;

/// How long `acquire` waits for a free instance, in milliseconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 10_000;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default minimum pool size.
#[must_use]
pub const fn default_min_instances() -> usize {
    DEFAULT_MIN_INSTANCES
}

/// Default maximum pool size.
#[must_use]
pub const fn default_max_instances() -> usize {
    DEFAULT_MAX_INSTANCES
}

/// Default acquisition timeout in milliseconds.
#[must_use]
pub const fn default_acquire_timeout_ms() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT_MS
}

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
