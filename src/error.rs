//! Error types shared across the verification pipeline.

use serde::Serialize;

/// A citation string that could not be parsed.
///
/// The code is always `PARSE_ERROR`; input errors are resolved locally and
/// never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct CitationParseError {
    pub code: &'static str,
    pub message: String,
    pub input: String,
}

impl CitationParseError {
    pub const CODE: &'static str = "PARSE_ERROR";

    pub(crate) fn new(message: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            code: Self::CODE,
            message: message.into(),
            input: input.into(),
        }
    }
}

/// Outcome of a single failed outbound attempt.
///
/// Returned from the call site instead of thrown, so the execution policy
/// branches on the variant rather than on an error's type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallFailure {
    /// Upstream answered 429
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Upstream answered 404
    #[error("Resource not found")]
    NotFound,

    /// Upstream answered 5xx
    #[error("Server error: {status}")]
    Server { status: u16 },

    /// Any other non-success status
    #[error("Unexpected status: {status}")]
    UnexpectedStatus { status: u16 },

    /// The attempt exceeded the per-call timeout
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Connection-level failure
    #[error("Network error: {0}")]
    Transport(String),

    /// Body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl CallFailure {
    /// Whether this failure is retried and counted by the circuit breaker.
    ///
    /// Rate-limit and not-found signals are answers from a healthy upstream
    /// and must never trip the breaker.
    pub fn is_breaker_eligible(&self) -> bool {
        matches!(
            self,
            CallFailure::Server { .. } | CallFailure::Timeout(_) | CallFailure::Transport(_)
        )
    }
}

/// Error returned by [`crate::resilience::ExecutionPolicy::execute`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Breaker is open; no network I/O was attempted
    #[error("Circuit breaker is open, retry in {retry_in_ms}ms")]
    CircuitOpen { retry_in_ms: u64 },

    /// The final failure after retries, or a failure that is never retried
    #[error(transparent)]
    Failed(CallFailure),
}

/// Invalid process configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
