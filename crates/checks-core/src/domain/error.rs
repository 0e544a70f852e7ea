//! Domain-level error taxonomy for checks.

use checks_state::StorageError;

/// Checks domain errors.
#[derive(Debug, thiserror::Error)]
pub enum ChecksError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("checker {0} already exists")]
    AlreadyExists(String),

    #[error("invalid checker config: {0}")]
    InvalidConfig(String),

    #[error("invalid checker UUID: {0}")]
    InvalidCheckerId(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("concurrent updates of {ref_name}: gave up after {attempts} attempts")]
    Conflict { ref_name: String, attempts: u32 },

    #[error("ref migration failed: {0}")]
    Migration(String),

    #[error("storage error: {0}")]
    Store(#[from] StorageError),
}

impl From<toml::de::Error> for ChecksError {
    fn from(e: toml::de::Error) -> Self {
        ChecksError::InvalidConfig(e.message().to_string())
    }
}

impl From<toml::ser::Error> for ChecksError {
    fn from(e: toml::ser::Error) -> Self {
        ChecksError::InvalidConfig(e.to_string())
    }
}

/// Result type for checks domain operations.
pub type Result<T> = std::result::Result<T, ChecksError>;
