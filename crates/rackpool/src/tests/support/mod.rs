//! Test harness utilities for the dispatch suites.

mod applications;
mod factory;
mod host;

pub use applications::{ErrorBehaviour, PrimaryBehaviour, ScriptedApplication};
pub use factory::{FactoryEvent, RecordingFactory};
pub use host::{FlakyResponse, RecordingHost};
