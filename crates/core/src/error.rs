//! Error types for the Wingman domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] wraps them all.

use std::time::Duration;
use thiserror::Error;

/// The top-level error type for all Wingman operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Input validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- History persistence ---
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    // --- Remote completion ---
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Malformed caller input. Always returned before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Turn text must not be empty")]
    EmptyText,

    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Unrecognized role: {0:?} (expected \"user\" or \"assistant\")")]
    UnknownRole(String),

    #[error("Profile text must not be empty")]
    EmptyProfile,
}

/// Failures of the history backend.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("I/O failure for conversation '{identity}': {reason}")]
    Io { identity: String, reason: String },

    #[error("Corrupt history for conversation '{identity}': {reason}")]
    Corrupt { identity: String, reason: String },

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Failures of a remote completion call.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Network error: {0}")]
    Network(String),

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Gateway not configured: {0}")]
    NotConfigured(String),

    #[error("Operation not supported by gateway '{0}'")]
    Unsupported(String),

    #[error("Attachment could not be used: {0}")]
    Attachment(String),
}
