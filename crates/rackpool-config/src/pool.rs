//! Validated pool sizing derived from the layered configuration.
//!
//! The raw configuration carries plain integers so it can be layered from
//! files, environment variables and flags. Before a pool is built the values
//! are checked once here; the pool itself never has to second-guess them.

use std::time::Duration;

use thiserror::Error;

/// Sizing and timing parameters for an application pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    min_instances: usize,
    max_instances: usize,
    acquire_timeout: Duration,
}

impl PoolSettings {
    /// Validates and builds pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`PoolSettingsError::EmptyPool`] when `max_instances` is zero
    /// and [`PoolSettingsError::MinAboveMax`] when the minimum exceeds the
    /// maximum.
    pub fn new(
        min_instances: usize,
        max_instances: usize,
        acquire_timeout: Duration,
    ) -> Result<Self, PoolSettingsError> {
        if max_instances == 0 {
            return Err(PoolSettingsError::EmptyPool);
        }
        if min_instances > max_instances {
            return Err(PoolSettingsError::MinAboveMax {
                min: min_instances,
                max: max_instances,
            });
        }
        Ok(Self {
            min_instances,
            max_instances,
            acquire_timeout,
        })
    }

    /// Instances built eagerly when the pool starts.
    #[must_use]
    pub const fn min_instances(&self) -> usize {
        self.min_instances
    }

    /// Hard cap on instances alive at once.
    #[must_use]
    pub const fn max_instances(&self) -> usize {
        self.max_instances
    }

    /// Longest time `acquire` blocks before reporting exhaustion.
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }
}

/// Errors raised while validating pool settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolSettingsError {
    /// The pool would never be able to hand out an instance.
    #[error("max_instances must be at least 1")]
    EmptyPool,
    /// The eager minimum cannot exceed the cap.
    #[error("min_instances ({min}) exceeds max_instances ({max})")]
    MinAboveMax {
        /// Configured minimum.
        min: usize,
        /// Configured maximum.
        max: usize,
    },
}
