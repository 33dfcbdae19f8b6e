//! Request dispatch over a pool of stateful application instances.
//!
//! A [`Dispatcher`] binds each inbound request to an instance leased from an
//! [`ApplicationFactory`], writes the instance's result to the caller's
//! [`ResponseEnvironment`] and returns the instance to the pool exactly once,
//! whichever way the request ends.
//!
//! Failures fall into three domains that are never mixed:
//!
//! 1. **Acquisition**: the factory cannot lease an instance. The
//!    [`AcquireError`] is returned from [`Dispatcher::process`] untouched so
//!    the host can apply its own policy (queueing, `503`, retry).
//! 2. **Invocation**: the instance raised or its result could not be
//!    written. The failure is stored on the request environment and the
//!    factory's [`ErrorApplication`] renders the response instead.
//! 3. **Escalation**: the error application itself could not be acquired,
//!    invoked or written. The failure is logged through the
//!    [`HostContext`] and a bare `500` is sent. Nothing propagates.
//!
//! [`PooledApplicationFactory`] is the bundled factory: a bounded pool that
//! pre-warms instances, grows on demand and blocks callers for a configured
//! time once saturated. [`bootstrap_with`] wires it to layered configuration
//! from [`rackpool_config`] and structured `tracing` telemetry, while
//! [`Booter`] resolves the deployment paths the hosted runtime expects.

pub mod application;
pub mod booter;
mod bootstrap;
pub mod dispatch;
pub mod environment;
pub mod factory;
pub mod host;
pub mod pool;
mod telemetry;

pub use application::{
    Application, ApplicationError, BoxError, DefaultErrorApplication, ErrorApplication, InstanceId,
    Lease, SerializedErrorApplication,
};
pub use booter::{BootContext, BootEnvironment, BootLogger, Booter, DirectoryBootContext};
pub use bootstrap::{
    BOOTSTRAP_FAILED, BootstrapError, ConfigLoader, Deployment, StaticConfigLoader,
    SystemConfigLoader, bootstrap_with,
};
pub use dispatch::{DispatchOutcome, Dispatcher, DispatcherError, EscalationError};
pub use environment::{
    BufferedResponse, RackResponse, RequestEnvironment, ResponseEnvironment, ResponseError,
    ResponseOutcome,
};
pub use factory::{AcquireError, ApplicationFactory};
pub use host::{HostContext, TracingHostContext};
pub use pool::{ApplicationBuilder, ErrorApplicationBuilder, PoolStats, PooledApplicationFactory};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

#[cfg(test)]
mod tests;
