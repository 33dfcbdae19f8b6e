//! Host and response doubles recording what the dispatcher wrote.

use std::error::Error;
use std::io;
use std::sync::{Arc, Mutex};

use crate::environment::{BufferedResponse, RackResponse, ResponseEnvironment, ResponseError};
use crate::factory::ApplicationFactory;
use crate::host::{HostContext, error_chain};

/// A diagnostic written through [`HostContext::log`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
    pub cause: Option<String>,
}

/// Host recording every diagnostic it receives.
#[derive(Default)]
pub struct RecordingHost {
    entries: Mutex<Vec<LogEntry>>,
    factory: Option<Arc<dyn ApplicationFactory>>,
}

impl RecordingHost {
    pub fn with_factory(factory: Arc<dyn ApplicationFactory>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            factory: Some(factory),
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().expect("host mutex poisoned").clone()
    }
}

impl HostContext for RecordingHost {
    fn log(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        self.entries
            .lock()
            .expect("host mutex poisoned")
            .push(LogEntry {
                message: message.to_owned(),
                cause: cause.map(error_chain),
            });
    }

    fn application_factory(&self) -> Option<Arc<dyn ApplicationFactory>> {
        self.factory.clone()
    }
}

/// Response sink whose first `failures` full-response writes fail with an
/// I/O error. Bare error statuses always go through.
#[derive(Debug, Default)]
pub struct FlakyResponse {
    failures: usize,
    inner: BufferedResponse,
}

impl FlakyResponse {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            inner: BufferedResponse::new(),
        }
    }

    pub const fn buffer(&self) -> &BufferedResponse {
        &self.inner
    }
}

impl ResponseEnvironment for FlakyResponse {
    fn send_response(&mut self, response: RackResponse) -> Result<(), ResponseError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away").into());
        }
        self.inner.send_response(response)
    }

    fn send_error(&mut self, status: u16) -> Result<(), ResponseError> {
        self.inner.send_error(status)
    }

    fn is_committed(&self) -> bool {
        self.inner.is_committed()
    }
}
