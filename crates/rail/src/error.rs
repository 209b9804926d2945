//! Error types for the rail event bus

use std::time::Duration;

/// Errors surfaced to callers of the bus API.
///
/// Registration, attachment and configuration problems are returned directly.
/// Handler failures during emission never show up here: they are reported through
/// the `rail.error` event and the per-handler [`HandlerOutcome`](crate::HandlerOutcome).
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// A handler could not be bound (e.g. blank event name)
    #[error("Invalid handler: {0}")]
    InvalidHandler(String),

    /// Module is missing a usable name
    #[error("Invalid module: {0}")]
    InvalidModule(String),

    /// A module with the same name is already attached
    #[error("Module already attached: {0}")]
    DuplicateModule(String),

    /// The module's connect hook failed; the attach was rolled back
    #[error("Module {module} failed to connect: {message}")]
    ConnectionFailed { module: String, message: String },

    /// No matching event arrived before the deadline
    #[error("Timed out after {}ms waiting for event: {event}", .timeout.as_millis())]
    Timeout { event: String, timeout: Duration },

    /// A regex payload could not be compiled
    #[error("Invalid pattern /{pattern}/{flags}: {message}")]
    InvalidPattern {
        pattern: String,
        flags: String,
        message: String,
    },

    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure raised by a listener or module hook.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<toml::de::Error> for BusError {
    fn from(err: toml::de::Error) -> Self {
        BusError::Config(err.to_string())
    }
}

impl From<std::io::Error> for BusError {
    fn from(err: std::io::Error) -> Self {
        BusError::Config(err.to_string())
    }
}

impl From<BusError> for HandlerError {
    fn from(err: BusError) -> Self {
        Self::new(err.to_string())
    }
}
