//! Handling of failures raised by the primary application.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use super::{DISPATCH_TARGET, DispatchOutcome};
use crate::application::ApplicationError;
use crate::environment::{RequestEnvironment, ResponseEnvironment};
use crate::factory::{AcquireError, ApplicationFactory};
use crate::host::HostContext;

/// Status sent when the error application cannot render a response.
pub const SERVER_ERROR_STATUS: u16 = 500;

/// Message logged through the host when escalation itself fails.
pub const ERROR_HANDLING_FAILED: &str = "Error: Couldn't handle error";

/// Message logged through the host when even the bare status cannot be sent.
pub const SEND_ERROR_FAILED: &str = "Error: Couldn't send error status";

/// Failures raised while the error application handles an escalated failure.
#[derive(Debug, Error)]
pub enum EscalationError {
    /// The factory could not supply the error application.
    #[error("failed to acquire error application")]
    Acquire(#[source] AcquireError),
    /// The error application raised, or its result could not be written.
    #[error("error application failed")]
    Application(#[source] ApplicationError),
}

/// Routes `failure` through the error application, degrading to a bare
/// server error status when that fails too. Never propagates.
pub(super) fn escalate(
    factory: &dyn ApplicationFactory,
    host: &dyn HostContext,
    request: &mut RequestEnvironment,
    failure: ApplicationError,
    response: &mut dyn ResponseEnvironment,
) -> DispatchOutcome {
    match handle_with_error_application(factory, request, failure, response) {
        Ok(()) => {
            debug!(target: DISPATCH_TARGET, "error application rendered the response");
            DispatchOutcome::Recovered
        }
        Err(escalation) => {
            error!(
                target: DISPATCH_TARGET,
                error = %escalation,
                status = SERVER_ERROR_STATUS,
                "error handling failed; sending bare status"
            );
            host.log(ERROR_HANDLING_FAILED, Some(&escalation));
            if let Err(send_failure) = response.send_error(SERVER_ERROR_STATUS) {
                host.log(SEND_ERROR_FAILED, Some(&send_failure));
            }
            DispatchOutcome::Degraded
        }
    }
}

fn handle_with_error_application(
    factory: &dyn ApplicationFactory,
    request: &mut RequestEnvironment,
    failure: ApplicationError,
    response: &mut dyn ResponseEnvironment,
) -> Result<(), EscalationError> {
    let error_application = factory
        .acquire_error_application()
        .map_err(EscalationError::Acquire)?;
    request.set_exception(Arc::new(failure));
    error_application
        .call(request)
        .and_then(|result| result.respond(response).map_err(Into::into))
        .map_err(EscalationError::Application)
}
