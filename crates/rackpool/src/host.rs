//! Host-side collaborators: the diagnostic sink and the factory accessor.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::factory::ApplicationFactory;

pub(crate) const HOST_TARGET: &str = "rackpool::host";

/// Services the embedding host provides to the dispatcher.
pub trait HostContext: Send + Sync {
    /// Records a diagnostic message with an optional cause.
    fn log(&self, message: &str, cause: Option<&(dyn Error + 'static)>);

    /// Returns the factory the host manages, if it has one.
    fn application_factory(&self) -> Option<Arc<dyn ApplicationFactory>>;
}

impl<T> HostContext for Arc<T>
where
    T: HostContext,
{
    fn log(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        (**self).log(message, cause);
    }

    fn application_factory(&self) -> Option<Arc<dyn ApplicationFactory>> {
        (**self).application_factory()
    }
}

/// Host context that reports diagnostics through `tracing`.
#[derive(Default, Clone)]
pub struct TracingHostContext {
    factory: Option<Arc<dyn ApplicationFactory>>,
}

impl TracingHostContext {
    /// Builds a context without a factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context exposing `factory`.
    #[must_use]
    pub const fn with_factory(factory: Arc<dyn ApplicationFactory>) -> Self {
        Self {
            factory: Some(factory),
        }
    }
}

impl HostContext for TracingHostContext {
    fn log(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        let Some(cause) = cause else {
            tracing::info!(target: HOST_TARGET, "{message}");
            return;
        };
        tracing::error!(target: HOST_TARGET, error = %error_chain(cause), "{message}");
    }

    fn application_factory(&self) -> Option<Arc<dyn ApplicationFactory>> {
        self.factory.clone()
    }
}

impl fmt::Debug for TracingHostContext {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TracingHostContext")
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// Renders an error and its sources as `outer: inner: root`.
#[must_use]
pub fn error_chain(error: &(dyn Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        rendered.push_str(": ");
        rendered.push_str(&source.to_string());
        current = source.source();
    }
    rendered
}
