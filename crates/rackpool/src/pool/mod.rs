//! Bounded pool of application instances.
//!
//! [`PooledApplicationFactory`] is the standard [`ApplicationFactory`]. It
//! builds `min_instances` eagerly, grows lazily up to `max_instances` and
//! blocks callers for at most the configured acquire timeout once every
//! instance is leased. Instances are built and destroyed outside the state
//! lock so a slow runtime boot never stalls releases.

use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use rackpool_config::PoolSettings;
use tracing::{debug, info, warn};

use crate::application::{
    Application, DefaultErrorApplication, ErrorApplication, InstanceId, Lease,
};
use crate::factory::{AcquireError, ApplicationFactory};


pub(crate) const POOL_TARGET: &str = "rackpool::pool";

/// Instance ids are unique across every pool in the process, so a lease can
/// only ever match the outstanding set of the pool that issued it.
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(0);

fn allocate_id() -> InstanceId {
    InstanceId::new(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Builds fresh application instances for the pool.
pub trait ApplicationBuilder: Send + Sync {
    /// Boots one instance.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Construction`] when the instance cannot boot.
    fn build(&self) -> Result<Box<dyn Application>, AcquireError>;
}

impl<F> ApplicationBuilder for F
where
    F: Fn() -> Result<Box<dyn Application>, AcquireError> + Send + Sync,
{
    fn build(&self) -> Result<Box<dyn Application>, AcquireError> {
        self()
    }
}

/// Builds the shared error application.
pub trait ErrorApplicationBuilder: Send + Sync {
    /// Boots the error application.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Construction`] when it cannot boot.
    fn build(&self) -> Result<Arc<dyn ErrorApplication>, AcquireError>;
}

impl<F> ErrorApplicationBuilder for F
where
    F: Fn() -> Result<Arc<dyn ErrorApplication>, AcquireError> + Send + Sync,
{
    fn build(&self) -> Result<Arc<dyn ErrorApplication>, AcquireError> {
        self()
    }
}

/// Point-in-time counters describing a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances waiting in the pool.
    pub idle: usize,
    /// Instances currently leased.
    pub leased: usize,
    /// Instances built over the pool's lifetime.
    pub created: usize,
    /// Instances torn down over the pool's lifetime.
    pub destroyed: usize,
}

#[derive(Default)]
struct PoolState {
    idle: Vec<Lease>,
    outstanding: HashSet<InstanceId>,
    pending: usize,
    created: usize,
    discarded: usize,
    shut_down: bool,
}

impl PoolState {
    fn population(&self) -> usize {
        self.idle.len() + self.outstanding.len() + self.pending
    }
}

/// Thread-safe pool implementing [`ApplicationFactory`].
pub struct PooledApplicationFactory {
    settings: PoolSettings,
    builder: Box<dyn ApplicationBuilder>,
    error_builder: Option<Box<dyn ErrorApplicationBuilder>>,
    state: Mutex<PoolState>,
    available: Condvar,
    error_application: Mutex<Option<Arc<dyn ErrorApplication>>>,
}

impl PooledApplicationFactory {
    /// Builds the pool and pre-warms `min_instances` instances.
    ///
    /// # Errors
    ///
    /// Returns the builder's [`AcquireError`] when pre-warming fails. Any
    /// instances already built are destroyed first.
    pub fn new(
        settings: PoolSettings,
        builder: impl ApplicationBuilder + 'static,
    ) -> Result<Self, AcquireError> {
        let mut state = PoolState::default();
        for _ in 0..settings.min_instances() {
            match builder.build() {
                Ok(application) => {
                    let id = allocate_id();
                    state.idle.push(Lease::new(id, application));
                    state.created += 1;
                }
                Err(error) => {
                    warn!(
                        target: POOL_TARGET,
                        built = state.idle.len(),
                        error = %error,
                        "pre-warming the pool failed"
                    );
                    for lease in state.idle {
                        lease.discard();
                    }
                    return Err(error);
                }
            }
        }
        let timeout_ms = u64::try_from(settings.acquire_timeout().as_millis()).unwrap_or(u64::MAX);
        info!(
            target: POOL_TARGET,
            min = settings.min_instances(),
            max = settings.max_instances(),
            timeout_ms,
            "application pool ready"
        );
        Ok(Self {
            settings,
            builder: Box::new(builder),
            error_builder: None,
            state: Mutex::new(state),
            available: Condvar::new(),
            error_application: Mutex::new(None),
        })
    }

    /// Uses `builder` to boot the error application on first use.
    ///
    /// Without one the pool falls back to [`DefaultErrorApplication`].
    #[must_use]
    pub fn with_error_builder(mut self, builder: impl ErrorApplicationBuilder + 'static) -> Self {
        self.error_builder = Some(Box::new(builder));
        self
    }

    /// Sizing the pool was built with.
    #[must_use]
    pub const fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Snapshot of the pool counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.lock_state();
        PoolStats {
            idle: state.idle.len(),
            leased: state.outstanding.len(),
            created: state.created,
            destroyed: state.discarded,
        }
    }

    /// Returns `true` once [`ApplicationFactory::destroy`] has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.lock_state().shut_down
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_outside_lock(
        &self,
        mut state: MutexGuard<'_, PoolState>,
    ) -> Result<Lease, AcquireError> {
        state.pending += 1;
        drop(state);
        let id = allocate_id();

        let built = self.builder.build();

        let mut relocked = self.lock_state();
        relocked.pending -= 1;
        let application = match built {
            Ok(application) => application,
            Err(error) => {
                drop(relocked);
                // The reserved slot is free again for another waiter.
                self.available.notify_one();
                warn!(target: POOL_TARGET, error = %error, "building an instance failed");
                return Err(error);
            }
        };
        relocked.created += 1;
        let lease = Lease::new(id, application);
        if relocked.shut_down {
            relocked.discarded += 1;
            drop(relocked);
            lease.discard();
            return Err(AcquireError::Destroyed);
        }
        relocked.outstanding.insert(id);
        drop(relocked);
        debug!(target: POOL_TARGET, instance = %id, "built new instance");
        Ok(lease)
    }
}

impl ApplicationFactory for PooledApplicationFactory {
    fn acquire(&self) -> Result<Lease, AcquireError> {
        let started = Instant::now();
        let deadline = started + self.settings.acquire_timeout();
        let mut state = self.lock_state();
        loop {
            if state.shut_down {
                return Err(AcquireError::Destroyed);
            }
            if let Some(lease) = state.idle.pop() {
                state.outstanding.insert(lease.id());
                debug!(target: POOL_TARGET, instance = %lease.id(), "leased idle instance");
                return Ok(lease);
            }
            if state.population() < self.settings.max_instances() {
                return self.build_outside_lock(state);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                let waited = started.elapsed();
                warn!(
                    target: POOL_TARGET,
                    waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                    "application pool exhausted"
                );
                return Err(AcquireError::Exhausted { waited });
            }
            let (guard, _) = self
                .available
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    fn acquire_error_application(&self) -> Result<Arc<dyn ErrorApplication>, AcquireError> {
        // `destroy` flags shutdown before it clears the slot, so checking the
        // flag with the slot held keeps a cleared slot from being refilled.
        let mut slot = self
            .error_application
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_destroyed() {
            return Err(AcquireError::Destroyed);
        }
        if let Some(application) = slot.as_ref() {
            return Ok(Arc::clone(application));
        }
        let application = self.error_builder.as_ref().map_or_else(
            || Ok::<Arc<dyn ErrorApplication>, _>(Arc::new(DefaultErrorApplication)),
            |builder| builder.build(),
        )?;
        if self.is_destroyed() {
            debug!(target: POOL_TARGET, "dropping error application built during destroy");
            return Err(AcquireError::Destroyed);
        }
        debug!(target: POOL_TARGET, "error application ready");
        *slot = Some(Arc::clone(&application));
        Ok(application)
    }

    fn release(&self, lease: Lease) {
        let mut state = self.lock_state();
        if !state.outstanding.remove(&lease.id()) {
            drop(state);
            warn!(
                target: POOL_TARGET,
                instance = %lease.id(),
                "discarding an instance this pool did not lease"
            );
            lease.discard();
            return;
        }
        if state.shut_down {
            state.discarded += 1;
            drop(state);
            debug!(
                target: POOL_TARGET,
                instance = %lease.id(),
                "discarding instance released after destroy"
            );
            lease.discard();
            return;
        }
        debug!(target: POOL_TARGET, instance = %lease.id(), "instance returned to pool");
        state.idle.push(lease);
        drop(state);
        self.available.notify_one();
    }

    fn destroy(&self) {
        let idle = {
            let mut state = self.lock_state();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.discarded += state.idle.len();
            mem::take(&mut state.idle)
        };
        self.available.notify_all();

        let discarded = idle.len();
        for lease in idle {
            lease.discard();
        }
        self.error_application
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        info!(target: POOL_TARGET, discarded, "application pool destroyed");
    }
}

impl Drop for PooledApplicationFactory {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for PooledApplicationFactory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PooledApplicationFactory")
            .field("settings", &self.settings)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
