//! Domain errors for the prompt optimization service.

use thiserror::Error;

/// Domain-level errors that can occur across the optimization pipeline.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Unknown prompt version: {0}")]
    UnknownVersion(String),

    #[error("Unsupported generation provider: {0}")]
    UnsupportedProvider(String),

    #[error("Malformed generation response: {0}")]
    MalformedResponse(String),

    #[error("Generation retries exhausted after {0} attempts")]
    RetriesExhausted(u32),

    #[error("Generation request failed ({status}): {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Upstream transport error: {0}")]
    Transport(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// True for errors caused by a malformed request rather than an
    /// internal or upstream failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationFailed(_))
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for DomainError {
    fn from(err: reqwest::Error) -> Self {
        DomainError::Transport(err.to_string())
    }
}
