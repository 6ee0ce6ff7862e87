//! Error types for auditdash
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in auditdash
#[derive(Debug, Error)]
pub enum AuditdashError {
    /// A request settled as a final failure (status is None for transport faults)
    #[error("Request failed{}: {body}", status_suffix(.status))]
    Request { status: Option<u16>, body: String },

    /// No usable credentials are stored
    #[error("Not logged in")]
    Unauthenticated,

    /// The server answered with a payload we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Caller supplied an unusable argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The transport could not be set up
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credential persistence error
    #[error("Credential store error: {0}")]
    CredentialStore(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditdashError {
    /// HTTP status of a failed request, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            AuditdashError::Request { status, .. } => *status,
            _ => None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {}", s)).unwrap_or_default()
}

/// Result type alias for auditdash operations
pub type Result<T> = std::result::Result<T, AuditdashError>;
