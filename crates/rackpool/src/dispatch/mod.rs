//! Request dispatch over a pooled application factory.
//!
//! A dispatch leases an instance, invokes it, writes the result and returns
//! the lease. Three failure domains are kept apart:
//!
//! - **Acquisition** fails before anything is leased. The error is returned
//!   to the caller untouched; nothing is released and nothing is logged.
//! - **Primary invocation** (calling the instance or writing its result) is
//!   recoverable. The failure is attached to the request environment and the
//!   factory's error application renders the response instead.
//! - **Escalation** failures are terminal. They are logged through the host
//!   and the caller receives a bare `500`.
//!
//! The lease is held by a guard that returns it to the factory when the
//! dispatch ends, including when a path unwinds.

mod escalation;
mod guard;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::environment::{RequestEnvironment, ResponseEnvironment};
use crate::factory::{AcquireError, ApplicationFactory};
use crate::host::HostContext;

pub use escalation::{
    ERROR_HANDLING_FAILED, EscalationError, SEND_ERROR_FAILED, SERVER_ERROR_STATUS,
};

use self::guard::LeaseGuard;

pub(crate) const DISPATCH_TARGET: &str = "rackpool::dispatch";

/// How a dispatch that acquired an instance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The application's own result was written.
    Completed,
    /// The application failed and the error application's result was written.
    Recovered,
    /// Escalation failed too; a bare server error status was sent.
    Degraded,
}

/// Errors raised while wiring a dispatcher.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherError {
    /// The host context cannot supply an application factory.
    #[error("illegal state: host context does not provide an application factory")]
    MissingFactory,
}

/// Binds requests to pooled application instances.
///
/// The dispatcher holds no per-request state; share it across threads and
/// call [`process`](Self::process) from each request thread.
#[derive(Clone)]
pub struct Dispatcher {
    factory: Arc<dyn ApplicationFactory>,
    host: Arc<dyn HostContext>,
}

impl Dispatcher {
    /// Builds a dispatcher over an explicit factory.
    #[must_use]
    pub const fn new(factory: Arc<dyn ApplicationFactory>, host: Arc<dyn HostContext>) -> Self {
        Self { factory, host }
    }

    /// Builds a dispatcher over the factory exposed by `host`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatcherError::MissingFactory`] when the host has none.
    pub fn from_host(host: Arc<dyn HostContext>) -> Result<Self, DispatcherError> {
        let factory = host
            .application_factory()
            .ok_or(DispatcherError::MissingFactory)?;
        Ok(Self::new(factory, host))
    }

    /// The factory backing this dispatcher.
    #[must_use]
    pub const fn factory(&self) -> &Arc<dyn ApplicationFactory> {
        &self.factory
    }

    /// Handles one request.
    ///
    /// Application failures never escape: they are rendered by the error
    /// application or degraded to a bare server error status.
    ///
    /// # Errors
    ///
    /// Returns the factory's [`AcquireError`] when no instance could be
    /// leased. Nothing has been written to `response` in that case.
    pub fn process(
        &self,
        request: &mut RequestEnvironment,
        response: &mut dyn ResponseEnvironment,
    ) -> Result<DispatchOutcome, AcquireError> {
        let lease = self.factory.acquire()?;
        let mut guard = LeaseGuard::new(self.factory.as_ref(), lease);
        debug!(
            target: DISPATCH_TARGET,
            instance = %guard.id(),
            method = request.method().unwrap_or("-"),
            path = request.path_info().unwrap_or("-"),
            "dispatching request"
        );

        let invoked = guard
            .call(request)
            .and_then(|result| result.respond(response).map_err(Into::into));

        let outcome = match invoked {
            Ok(()) => DispatchOutcome::Completed,
            Err(failure) => {
                warn!(
                    target: DISPATCH_TARGET,
                    instance = %guard.id(),
                    error = %failure,
                    "application failed; escalating"
                );
                escalation::escalate(
                    self.factory.as_ref(),
                    self.host.as_ref(),
                    request,
                    failure,
                    response,
                )
            }
        };

        drop(guard);
        Ok(outcome)
    }

    /// Destroys the factory.
    pub fn shutdown(&self) {
        debug!(target: DISPATCH_TARGET, "shutting down application factory");
        self.factory.destroy();
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
