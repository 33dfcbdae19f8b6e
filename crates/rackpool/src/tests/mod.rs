//! Test suites for request dispatch and pool bootstrap.

mod support;
