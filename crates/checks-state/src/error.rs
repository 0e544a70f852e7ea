//! Error types for checks-state

use thiserror::Error;

/// Errors that can occur in the ref store layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// No object is stored under the given id
    #[error("object not found: {id}")]
    ObjectNotFound { id: String },

    /// Object id is not a 64-char hex SHA-256 digest
    #[error("invalid object id: {id}")]
    InvalidObjectId { id: String },

    /// Ref name is empty or malformed
    #[error("invalid ref name: {name:?}")]
    InvalidRefName { name: String },

    /// Compare-and-swap on a ref lost: the ref does not point where the caller expected
    #[error("lock failure on {ref_name}: expected {expected}, found {actual}")]
    LockFailure {
        ref_name: String,
        expected: String,
        actual: String,
    },

    /// Object bytes could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Database connection error
    #[error("connection failed: {0}")]
    Connection(String),

    /// Schema setup error
    #[error("schema setup failed: {0}")]
    SchemaSetup(String),

    /// Any other backend failure
    #[error("backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Whether this error is a lost compare-and-swap race.
    pub fn is_lock_failure(&self) -> bool {
        matches!(self, StorageError::LockFailure { .. })
    }
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
