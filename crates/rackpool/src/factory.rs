//! The pool capability consumed by the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::application::{BoxError, ErrorApplication, Lease};

/// Supplies application instances to the dispatcher.
///
/// Implementations are shared across threads and must never hand out the same
/// instance to two leases at once. Every lease returned by
/// [`acquire`](Self::acquire) comes back exactly once through
/// [`release`](Self::release).
pub trait ApplicationFactory: Send + Sync {
    /// Leases an application instance, blocking while the pool is saturated.
    ///
    /// # Errors
    ///
    /// Returns an [`AcquireError`] when no instance can be supplied.
    fn acquire(&self) -> Result<Lease, AcquireError>;

    /// Returns the application used to render escalated failures.
    ///
    /// # Errors
    ///
    /// Returns an [`AcquireError`] when the error application cannot be
    /// supplied.
    fn acquire_error_application(&self) -> Result<Arc<dyn ErrorApplication>, AcquireError>;

    /// Takes back a lease handed out by [`acquire`](Self::acquire).
    ///
    /// The factory chooses whether the instance is recycled, discarded or
    /// replaced. This never fails for a lease it issued.
    fn release(&self, lease: Lease);

    /// Releases every pooled resource.
    fn destroy(&self);
}

/// Initialisation errors raised when an instance cannot be supplied.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Every instance stayed leased for the whole acquisition window.
    #[error("no application instance became available within {waited:?}")]
    Exhausted {
        /// How long the caller waited.
        waited: Duration,
    },
    /// Building a new instance failed.
    #[error("failed to initialise application: {message}")]
    Construction {
        /// Description of the failure.
        message: String,
        /// Underlying cause reported by the builder.
        #[source]
        source: Option<BoxError>,
    },
    /// The factory was destroyed.
    #[error("application factory has been destroyed")]
    Destroyed,
}

impl AcquireError {
    /// Builds a construction failure without an underlying cause.
    #[must_use]
    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a construction failure wrapping an underlying cause.
    #[must_use]
    pub fn construction_with_source(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Construction {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}
