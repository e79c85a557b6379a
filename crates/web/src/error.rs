use std::io;

use thiserror::Error;

/// An application-level failure raised by a middleware or handler.
///
/// Carries only a message: the pipeline either lets an error handler turn it
/// into a response, or falls back to a 500 carrying this text.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<io::Error> for HandlerError {
    fn from(e: io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}
