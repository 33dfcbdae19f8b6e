//! Request and response carriers threaded through a dispatch.
//!
//! A [`RequestEnvironment`] is owned by the caller for the duration of one
//! dispatch. The dispatcher only adds to it when escalating a failure, and
//! the failure travels in a typed field rather than an attribute so the error
//! application can rely on its shape. A [`ResponseEnvironment`] is the
//! caller's sink; the dispatcher writes to it at most once per dispatch.

mod request;
mod response;

pub use request::{PATH_INFO, REQUEST_METHOD, RequestEnvironment};
pub use response::{
    BufferedResponse, RackResponse, ResponseEnvironment, ResponseError, ResponseOutcome,
};
