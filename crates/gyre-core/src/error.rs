//! Error taxonomy for the feedback loop.
//!
//! Two failures exist at the loop boundary: a command's execution can fail
//! ([`CommandError`]), and the command source itself can fail
//! ([`UpstreamError`]). Reducer failure is not modeled - reducers are total
//! by contract.

use std::error::Error;

/// Failure raised by a [`Command`](crate::Command) execution.
///
/// Always contained at the command boundary: the engine converts it into
/// "no further mutations" for that command and keeps the loop running.
#[derive(Debug, thiserror::Error)]
#[error("command execution failed: {message}")]
pub struct CommandError {
    message: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl CommandError {
    /// Create a command error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a command error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of the command-producing stream itself.
///
/// Whether this terminates the loop or is absorbed is an explicit
/// configuration choice, see [`UpstreamPolicy`](crate::UpstreamPolicy).
#[derive(Debug, thiserror::Error)]
#[error("command source failed: {message}")]
pub struct UpstreamError {
    message: String,
    #[source]
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl UpstreamError {
    /// Create an upstream error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an upstream error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}
