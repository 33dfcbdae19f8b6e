//! Test double for [`ApplicationFactory`] that records lifecycle events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::application::{ErrorApplication, InstanceId, Lease};
use crate::factory::{AcquireError, ApplicationFactory};

use super::applications::{
    CapturingErrorApplication, ErrorBehaviour, PrimaryBehaviour, ScriptedApplication,
};

/// Calls observed by the factory, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryEvent {
    Acquired(InstanceId),
    AcquireFailed,
    Released(InstanceId),
    ErrorApplicationAcquired,
    ErrorApplicationUnavailable,
    Destroyed,
}

/// Factory handing out scripted instances and recording every call.
pub struct RecordingFactory {
    primary: Mutex<Result<PrimaryBehaviour, String>>,
    error_application: Mutex<Result<Arc<CapturingErrorApplication>, String>>,
    events: Mutex<Vec<FactoryEvent>>,
    next_id: AtomicU64,
}

impl Default for RecordingFactory {
    fn default() -> Self {
        Self {
            primary: Mutex::new(Ok(PrimaryBehaviour::ok("ok"))),
            error_application: Mutex::new(Ok(Arc::new(CapturingErrorApplication::new(
                ErrorBehaviour::Render,
            )))),
            events: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl RecordingFactory {
    pub fn set_primary(&self, behaviour: PrimaryBehaviour) {
        *self.primary.lock().expect("factory mutex poisoned") = Ok(behaviour);
    }

    pub fn fail_acquire(&self, message: &str) {
        *self.primary.lock().expect("factory mutex poisoned") = Err(message.to_owned());
    }

    pub fn set_error_behaviour(&self, behaviour: ErrorBehaviour) {
        *self.error_application.lock().expect("factory mutex poisoned") =
            Ok(Arc::new(CapturingErrorApplication::new(behaviour)));
    }

    pub fn fail_error_application(&self, message: &str) {
        *self.error_application.lock().expect("factory mutex poisoned") = Err(message.to_owned());
    }

    /// The scripted error application, when one is configured.
    pub fn error_application(&self) -> Option<Arc<CapturingErrorApplication>> {
        self.error_application
            .lock()
            .expect("factory mutex poisoned")
            .as_ref()
            .ok()
            .cloned()
    }

    pub fn events(&self) -> Vec<FactoryEvent> {
        self.events.lock().expect("factory mutex poisoned").clone()
    }

    pub fn released(&self) -> Vec<InstanceId> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FactoryEvent::Released(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn acquired(&self) -> Vec<InstanceId> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FactoryEvent::Acquired(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: FactoryEvent) {
        self.events
            .lock()
            .expect("factory mutex poisoned")
            .push(event);
    }
}

impl ApplicationFactory for RecordingFactory {
    fn acquire(&self) -> Result<Lease, AcquireError> {
        let scripted = self.primary.lock().expect("factory mutex poisoned").clone();
        match scripted {
            Ok(behaviour) => {
                let id = InstanceId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
                self.record(FactoryEvent::Acquired(id));
                Ok(Lease::new(id, Box::new(ScriptedApplication::new(behaviour))))
            }
            Err(message) => {
                self.record(FactoryEvent::AcquireFailed);
                Err(AcquireError::construction(message))
            }
        }
    }

    fn acquire_error_application(&self) -> Result<Arc<dyn ErrorApplication>, AcquireError> {
        let scripted = self
            .error_application
            .lock()
            .expect("factory mutex poisoned")
            .clone();
        match scripted {
            Ok(application) => {
                self.record(FactoryEvent::ErrorApplicationAcquired);
                Ok(application)
            }
            Err(message) => {
                self.record(FactoryEvent::ErrorApplicationUnavailable);
                Err(AcquireError::construction(message))
            }
        }
    }

    fn release(&self, lease: Lease) {
        self.record(FactoryEvent::Released(lease.id()));
        lease.discard();
    }

    fn destroy(&self) {
        self.record(FactoryEvent::Destroyed);
    }
}
