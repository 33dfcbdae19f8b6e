//! Request-side environment.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::application::ApplicationError;

/// Attribute carrying the HTTP method.
pub const REQUEST_METHOD: &str = "REQUEST_METHOD";

/// Attribute carrying the request path below the application mount point.
pub const PATH_INFO: &str = "PATH_INFO";

/// Attributes describing one inbound request.
///
/// Attribute values are JSON values so hosts can pass strings, numbers and
/// nested structures without a bespoke value type. The failure raised by the
/// primary application, when there is one, is stored separately in
/// [`RequestEnvironment::exception`].
#[derive(Debug, Clone, Default)]
pub struct RequestEnvironment {
    attributes: HashMap<String, Value>,
    exception: Option<Arc<ApplicationError>>,
}

impl RequestEnvironment {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an environment for `method` and `path`.
    #[must_use]
    pub fn request(method: &str, path: &str) -> Self {
        Self::new()
            .with_attribute(REQUEST_METHOD, method)
            .with_attribute(PATH_INFO, path)
    }

    /// Adds an attribute, returning the updated environment.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Sets an attribute and returns the value it replaced.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Looks up an attribute holding a string.
    #[must_use]
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    /// Removes an attribute, returning its value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    /// Iterates over all attributes in unspecified order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// HTTP method, when the host supplied one.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.attribute_str(REQUEST_METHOD)
    }

    /// Request path, when the host supplied one.
    #[must_use]
    pub fn path_info(&self) -> Option<&str> {
        self.attribute_str(PATH_INFO)
    }

    /// Failure handed to the error application, if escalation happened.
    #[must_use]
    pub fn exception(&self) -> Option<&Arc<ApplicationError>> {
        self.exception.as_ref()
    }

    /// Records the failure being escalated.
    pub fn set_exception(&mut self, exception: Arc<ApplicationError>) {
        self.exception = Some(exception);
    }

    /// Removes and returns the recorded failure.
    pub fn take_exception(&mut self) -> Option<Arc<ApplicationError>> {
        self.exception.take()
    }
}
