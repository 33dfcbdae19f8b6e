//! Wiring of configuration, telemetry and the application pool.

use std::fmt;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use rackpool_config::{Config, PoolSettings, PoolSettingsError};
use thiserror::Error;
use tracing::info;

use crate::dispatch::Dispatcher;
use crate::factory::AcquireError;
use crate::host::HostContext;
use crate::pool::PooledApplicationFactory;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Message logged through the host when bootstrap fails.
pub const BOOTSTRAP_FAILED: &str = "Error: application pool failed to start";

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the layered configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's [`OrthoError`] when a layer is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Serves `config` on every load.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Pool bounds in the configuration are inconsistent.
    #[error("invalid pool settings: {source}")]
    PoolSettings {
        /// Validation failure.
        #[source]
        source: PoolSettingsError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The pool could not pre-warm its instances.
    #[error("failed to start application pool: {source}")]
    Pool {
        /// Construction failure reported by the pool.
        #[source]
        source: AcquireError,
    },
}

/// A started pool with its dispatcher.
pub struct Deployment {
    config: Config,
    factory: Arc<PooledApplicationFactory>,
    dispatcher: Dispatcher,
    telemetry: TelemetryHandle,
}

impl Deployment {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The pool serving this deployment.
    #[must_use]
    pub const fn factory(&self) -> &Arc<PooledApplicationFactory> {
        &self.factory
    }

    /// The dispatcher bound to the pool.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Destroys the pool.
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }
}

impl fmt::Debug for Deployment {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Deployment")
            .field("config", &self.config)
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}

/// Loads configuration, installs telemetry and starts the pool.
///
/// `build_pool` receives the validated settings and constructs the pool,
/// typically through [`PooledApplicationFactory::new`]. Every failure is
/// logged through `host` before it is returned.
///
/// # Errors
///
/// Returns a [`BootstrapError`] naming the step that failed.
pub fn bootstrap_with<F>(
    loader: &dyn ConfigLoader,
    host: Arc<dyn HostContext>,
    build_pool: F,
) -> Result<Deployment, BootstrapError>
where
    F: FnOnce(PoolSettings) -> Result<PooledApplicationFactory, AcquireError>,
{
    let report = |error: BootstrapError| {
        host.log(BOOTSTRAP_FAILED, Some(&error));
        error
    };

    let config = loader
        .load()
        .map_err(|source| report(BootstrapError::Configuration { source }))?;
    let settings = config
        .pool_settings()
        .map_err(|source| report(BootstrapError::PoolSettings { source }))?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| report(BootstrapError::Telemetry { source }))?;
    let factory = build_pool(settings)
        .map(Arc::new)
        .map_err(|source| report(BootstrapError::Pool { source }))?;

    info!(
        target: crate::pool::POOL_TARGET,
        min = settings.min_instances(),
        max = settings.max_instances(),
        "deployment started"
    );
    let dispatcher = Dispatcher::new(factory.clone(), host);
    Ok(Deployment {
        config,
        factory,
        dispatcher,
        telemetry,
    })
}
