//! Scoped ownership of a lease for the length of one dispatch.

use crate::application::{ApplicationError, InstanceId, Lease};
use crate::environment::{RackResponse, RequestEnvironment};
use crate::factory::ApplicationFactory;

/// Returns its lease to the factory when dropped.
///
/// Constructed only after a successful acquire, so a failed acquisition can
/// never lead to a release.
pub(super) struct LeaseGuard<'a> {
    factory: &'a dyn ApplicationFactory,
    lease: Option<Lease>,
    id: InstanceId,
}

impl<'a> LeaseGuard<'a> {
    pub(super) const fn new(factory: &'a dyn ApplicationFactory, lease: Lease) -> Self {
        let id = lease.id();
        Self {
            factory,
            lease: Some(lease),
            id,
        }
    }

    pub(super) const fn id(&self) -> InstanceId {
        self.id
    }

    pub(super) fn call(
        &mut self,
        env: &RequestEnvironment,
    ) -> Result<RackResponse, ApplicationError> {
        self.lease.as_mut().map_or_else(
            || Err(ApplicationError::raised("lease already released")),
            |lease| lease.call(env),
        )
    }
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            self.factory.release(lease);
        }
    }
}
