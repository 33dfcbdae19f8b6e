//! Response-side environment and the structured application result.

use std::io;

use thiserror::Error;

/// Structured result produced by an application call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RackResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl RackResponse {
    /// Creates an empty response with the given status.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header value matching `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Response body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Writes this result into `response`.
    ///
    /// # Errors
    ///
    /// Propagates the sink's [`ResponseError`], e.g. when something was
    /// already written.
    pub fn respond(self, response: &mut dyn ResponseEnvironment) -> Result<(), ResponseError> {
        response.send_response(self)
    }
}

/// Sink receiving the outcome of a dispatch.
///
/// Implementations accept a single write: either a full response or a bare
/// error status. Later writes fail with [`ResponseError::AlreadyCommitted`].
pub trait ResponseEnvironment {
    /// Sends a structured response.
    ///
    /// # Errors
    ///
    /// Fails when the response was already committed or the sink's transport
    /// failed.
    fn send_response(&mut self, response: RackResponse) -> Result<(), ResponseError>;

    /// Sends a bare error status with no body.
    ///
    /// # Errors
    ///
    /// Fails when the response was already committed or the sink's transport
    /// failed.
    fn send_error(&mut self, status: u16) -> Result<(), ResponseError>;

    /// Returns `true` once something has been written.
    fn is_committed(&self) -> bool;
}

/// Errors raised while writing to a [`ResponseEnvironment`].
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The sink already holds an outcome.
    #[error("response already committed; cannot write status {attempted}")]
    AlreadyCommitted {
        /// Status of the rejected write.
        attempted: u16,
    },
    /// The underlying transport failed.
    #[error("response transport failed: {0}")]
    Io(#[from] io::Error),
}

/// What a [`BufferedResponse`] ended up holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// A full response was written.
    Response(RackResponse),
    /// Only an error status was written.
    Error(u16),
}

/// In-memory [`ResponseEnvironment`] that keeps the first write.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    outcome: Option<ResponseOutcome>,
    rejected_writes: usize,
}

impl BufferedResponse {
    /// Creates an uncommitted response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed outcome, if any.
    #[must_use]
    pub const fn outcome(&self) -> Option<&ResponseOutcome> {
        self.outcome.as_ref()
    }

    /// Committed response, when a full response was written.
    #[must_use]
    pub fn response(&self) -> Option<&RackResponse> {
        match self.outcome.as_ref() {
            Some(ResponseOutcome::Response(response)) => Some(response),
            _ => None,
        }
    }

    /// Committed error status, when only a status was written.
    #[must_use]
    pub fn error_status(&self) -> Option<u16> {
        match self.outcome.as_ref() {
            Some(ResponseOutcome::Error(status)) => Some(*status),
            _ => None,
        }
    }

    /// Number of writes refused because the response was already committed.
    #[must_use]
    pub const fn rejected_writes(&self) -> usize {
        self.rejected_writes
    }

    /// Consumes the buffer, returning its outcome.
    #[must_use]
    pub fn into_outcome(self) -> Option<ResponseOutcome> {
        self.outcome
    }

    fn commit(&mut self, outcome: ResponseOutcome, status: u16) -> Result<(), ResponseError> {
        if self.outcome.is_some() {
            self.rejected_writes += 1;
            return Err(ResponseError::AlreadyCommitted { attempted: status });
        }
        self.outcome = Some(outcome);
        Ok(())
    }
}

impl ResponseEnvironment for BufferedResponse {
    fn send_response(&mut self, response: RackResponse) -> Result<(), ResponseError> {
        let status = response.status();
        self.commit(ResponseOutcome::Response(response), status)
    }

    fn send_error(&mut self, status: u16) -> Result<(), ResponseError> {
        self.commit(ResponseOutcome::Error(status), status)
    }

    fn is_committed(&self) -> bool {
        self.outcome.is_some()
    }
}
