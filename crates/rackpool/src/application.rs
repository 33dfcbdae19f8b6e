//! Application handles leased from a factory.
//!
//! An [`Application`] is stateful and not reentrant: `call` takes `&mut self`
//! and the factory guarantees a single lease at a time. The error application
//! is shared across dispatches instead, so [`ErrorApplication`] takes `&self`
//! and implementations serialise internally when they need to, for example
//! through [`SerializedErrorApplication`].

use std::fmt;
use std::sync::Mutex;

use thiserror::Error;

use crate::environment::{RackResponse, RequestEnvironment, ResponseError};

/// Boxed error type accepted as the cause of an application failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A pooled application instance.
pub trait Application: Send {
    /// Produces a response for `env`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplicationError`] when the application raised.
    fn call(&mut self, env: &RequestEnvironment) -> Result<RackResponse, ApplicationError>;

    /// Tears the instance down when the pool discards it.
    fn destroy(&mut self) {}
}

/// The fallback application used while escalating a failure.
pub trait ErrorApplication: Send + Sync {
    /// Renders a response for `env`, whose exception field holds the failure.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplicationError`] when rendering failed.
    fn call(&self, env: &RequestEnvironment) -> Result<RackResponse, ApplicationError>;
}

/// Failures raised while invoking an application or writing its result.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The application itself raised.
    #[error("application raised: {message}")]
    Raised {
        /// Description of the failure.
        message: String,
        /// Underlying cause reported by the application.
        #[source]
        source: Option<BoxError>,
    },
    /// The result could not be written to the response environment.
    #[error("failed to write response: {0}")]
    Respond(#[from] ResponseError),
}

impl ApplicationError {
    /// Builds a failure without an underlying cause.
    #[must_use]
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a failure wrapping an underlying cause.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Raised {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Identity of a pooled instance, stable across leases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "app-{}", self.0)
    }
}

/// Exclusive lease on an application instance.
///
/// A lease is moved back into the factory on release, so the type system
/// rules out releasing the same lease twice.
pub struct Lease {
    id: InstanceId,
    application: Box<dyn Application>,
}

impl Lease {
    /// Pairs an instance with its identity.
    #[must_use]
    pub const fn new(id: InstanceId, application: Box<dyn Application>) -> Self {
        Self { id, application }
    }

    /// Identity of the leased instance.
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Invokes the leased instance.
    ///
    /// # Errors
    ///
    /// Propagates the instance's [`ApplicationError`].
    pub fn call(&mut self, env: &RequestEnvironment) -> Result<RackResponse, ApplicationError> {
        self.application.call(env)
    }

    /// Destroys the instance, consuming the lease.
    pub fn discard(mut self) {
        self.application.destroy();
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Lease")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Adapts a plain [`Application`] into a shared [`ErrorApplication`] by
/// serialising calls behind a mutex.
pub struct SerializedErrorApplication<A> {
    inner: Mutex<A>,
}

impl<A: Application> SerializedErrorApplication<A> {
    /// Wraps `application`.
    #[must_use]
    pub const fn new(application: A) -> Self {
        Self {
            inner: Mutex::new(application),
        }
    }
}

impl<A: Application> ErrorApplication for SerializedErrorApplication<A> {
    fn call(&self, env: &RequestEnvironment) -> Result<RackResponse, ApplicationError> {
        let mut application = self
            .inner
            .lock()
            .map_err(|_| ApplicationError::raised("error application lock poisoned"))?;
        application.call(env)
    }
}

impl<A> fmt::Debug for SerializedErrorApplication<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SerializedErrorApplication")
            .finish_non_exhaustive()
    }
}

/// Error application used when none is configured.
///
/// Renders a plain-text 500 page naming the escalated failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorApplication;

impl ErrorApplication for DefaultErrorApplication {
    fn call(&self, env: &RequestEnvironment) -> Result<RackResponse, ApplicationError> {
        let mut body = String::from("Internal Server Error");
        if let Some(exception) = env.exception() {
            body.push_str(": ");
            body.push_str(&exception.to_string());
        }
        body.push('\n');
        Ok(RackResponse::new(500)
            .with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(body))
    }
}
