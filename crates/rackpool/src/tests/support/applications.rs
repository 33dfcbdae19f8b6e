//! Scripted applications used by the dispatch suites.

use std::sync::{Arc, Mutex};

use crate::application::{Application, ApplicationError, ErrorApplication};
use crate::environment::{RackResponse, RequestEnvironment};

/// What a scripted primary instance does when called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryBehaviour {
    /// Return a response with the given status and body.
    Respond { status: u16, body: String },
    /// Raise an application error with the given message.
    Raise(String),
    /// Panic mid-request.
    Panic,
}

impl PrimaryBehaviour {
    pub fn ok(body: &str) -> Self {
        Self::Respond {
            status: 200,
            body: body.to_owned(),
        }
    }

    pub fn raise(message: &str) -> Self {
        Self::Raise(message.to_owned())
    }
}

/// Primary instance following a [`PrimaryBehaviour`].
pub struct ScriptedApplication {
    behaviour: PrimaryBehaviour,
}

impl ScriptedApplication {
    pub const fn new(behaviour: PrimaryBehaviour) -> Self {
        Self { behaviour }
    }
}

impl Application for ScriptedApplication {
    fn call(&mut self, _env: &RequestEnvironment) -> Result<RackResponse, ApplicationError> {
        match &self.behaviour {
            PrimaryBehaviour::Respond { status, body } => {
                Ok(RackResponse::new(*status).with_body(body.clone()))
            }
            PrimaryBehaviour::Raise(message) => Err(ApplicationError::raised(message.clone())),
            PrimaryBehaviour::Panic => panic!("scripted application panicked"),
        }
    }
}

/// What the scripted error application does when called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorBehaviour {
    /// Render a 500 naming the escalated failure.
    Render,
    /// Raise while rendering.
    Raise(String),
}

/// Error application that records every exception it is handed.
pub struct CapturingErrorApplication {
    behaviour: ErrorBehaviour,
    seen: Mutex<Vec<Option<Arc<ApplicationError>>>>,
}

impl CapturingErrorApplication {
    pub fn new(behaviour: ErrorBehaviour) -> Self {
        Self {
            behaviour,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Exceptions observed on each call, in order.
    pub fn seen(&self) -> Vec<Option<Arc<ApplicationError>>> {
        self.seen
            .lock()
            .expect("error application mutex poisoned")
            .clone()
    }
}

impl ErrorApplication for CapturingErrorApplication {
    fn call(&self, env: &RequestEnvironment) -> Result<RackResponse, ApplicationError> {
        self.seen
            .lock()
            .expect("error application mutex poisoned")
            .push(env.exception().cloned());
        match &self.behaviour {
            ErrorBehaviour::Render => {
                let cause = env
                    .exception()
                    .map_or_else(|| "none".to_owned(), ToString::to_string);
                Ok(RackResponse::new(500).with_body(format!("rendered: {cause}")))
            }
            ErrorBehaviour::Raise(message) => Err(ApplicationError::raised(message.clone())),
        }
    }
}
