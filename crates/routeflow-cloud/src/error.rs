//! Reconciliation error types

use thiserror::Error;

/// Errors surfaced by the reconciliation core.
///
/// A remote "not found" is deliberately absent from this list: reconcilers
/// normalize it into the `Absent` lifecycle state instead of failing.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Authorization denied: {0}")]
    AuthDenied(String),

    /// Backend validation failure; the message is the backend's text, unmodified.
    #[error("Request rejected by backend ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Field '{field}' of {kind} cannot be changed after creation")]
    ImmutableFieldChanged { kind: String, field: String },

    #[error("No more results available")]
    NoMoreResults,

    #[error("Pagination cursor repeated: {0}")]
    CursorLoopDetected(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
