//! Storage trait definitions for the checks ref store
//!
//! The store is a small git-like substrate:
//! - content-addressed immutable objects (put/get by [`ObjectId`])
//! - [`Commit`] objects with parents, a path → object tree and a message
//! - named refs that move only through atomic compare-and-swap
//!
//! Notes are modelled as tree entries of a commit: the entry path is the
//! note key and the entry target is the note blob.
//!
//! All traits are async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ObjectId: content address
// ---------------------------------------------------------------------------

/// Object id (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `for_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Compute the id of the given bytes.
    pub fn for_bytes(data: &[u8]) -> Self {
        ObjectId(sha256_hex(data))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ObjectId {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidObjectId { id: s });
        }
        Ok(ObjectId(s.to_ascii_lowercase()))
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lowercase hex SHA-256 of `data`.
///
/// Also used to derive stable ref-name shards and note keys from
/// user-supplied names.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Author/committer identity recorded on commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonIdent {
    pub name: String,
    pub email: String,
}

impl PersonIdent {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// An immutable commit object.
///
/// `tree` maps a path (a file name, or a note key for notes commits) to the
/// id of the blob stored there. The map is ordered so that the encoding, and
/// therefore the commit id, is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub parents: Vec<ObjectId>,
    pub tree: BTreeMap<String, ObjectId>,
    pub message: String,
    pub author: PersonIdent,
    /// Commit time, truncated to whole seconds
    pub committed_at: DateTime<Utc>,
}

impl Commit {
    /// Build a commit stamped with the current time (whole seconds).
    pub fn new(
        parents: Vec<ObjectId>,
        tree: BTreeMap<String, ObjectId>,
        message: impl Into<String>,
        author: PersonIdent,
    ) -> Self {
        Self {
            parents,
            tree,
            message: message.into(),
            author,
            committed_at: Utc::now().trunc_subsecs(0),
        }
    }

    /// Canonical byte encoding; the commit id is the digest of these bytes.
    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(data: &[u8]) -> StorageResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// The first parent, if any.
    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }
}

/// Reject ref names the backends cannot address.
///
/// A trailing `/` is accepted: legacy refs used one.
pub fn validate_ref_name(name: &str) -> StorageResult<()> {
    let bad = name.is_empty()
        || !name.starts_with("refs/")
        || name.contains("..")
        || name.chars().any(|c| c.is_whitespace() || c.is_control());
    if bad {
        return Err(StorageError::InvalidRefName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Render an optional ref target for lock-failure messages.
pub(crate) fn describe_target(target: Option<&ObjectId>) -> String {
    target
        .map(|id| id.to_string())
        .unwrap_or_else(|| "<absent>".to_string())
}

// ---------------------------------------------------------------------------
// RefStore
// ---------------------------------------------------------------------------

/// Ref-based object store.
///
/// Guarantees:
/// - `put_object(data)` always returns the SHA-256 id of `data` and is idempotent.
/// - `get_object(id)` returns the exact bytes previously stored.
/// - `compare_and_swap` is atomic per ref: it succeeds only if the ref
///   currently points at `expected` (`None` = ref absent), then moves it to
///   `new` (`None` = delete). Otherwise it fails with
///   [`StorageError::LockFailure`] and leaves the ref untouched.
/// - Objects are never deleted, so any commit once read stays readable
///   (historical reads).
#[async_trait]
pub trait RefStore: Send + Sync {
    /// Store bytes and return their id.
    async fn put_object(&self, data: &[u8]) -> StorageResult<ObjectId>;

    /// Retrieve bytes by id. Returns `StorageError::ObjectNotFound` if absent.
    async fn get_object(&self, id: &ObjectId) -> StorageResult<Vec<u8>>;

    /// Check whether an object exists.
    async fn contains_object(&self, id: &ObjectId) -> StorageResult<bool>;

    /// Current target of a ref, or `None` if the ref does not exist.
    async fn read_ref(&self, name: &str) -> StorageResult<Option<ObjectId>>;

    /// Atomically move `name` from `expected` to `new`.
    async fn compare_and_swap(
        &self,
        name: &str,
        expected: Option<&ObjectId>,
        new: Option<&ObjectId>,
    ) -> StorageResult<()>;

    /// All refs whose name starts with `prefix`, sorted by name.
    async fn list_refs(&self, prefix: &str) -> StorageResult<Vec<(String, ObjectId)>>;

    /// Store a commit object and return its id.
    async fn put_commit(&self, commit: &Commit) -> StorageResult<ObjectId> {
        let bytes = commit.encode()?;
        self.put_object(&bytes).await
    }

    /// Read and decode a commit object.
    async fn get_commit(&self, id: &ObjectId) -> StorageResult<Commit> {
        let bytes = self.get_object(id).await?;
        Commit::decode(&bytes)
    }

    /// Read the blob at `path` in the tree of `commit`, if present.
    async fn read_blob_at(&self, commit: &ObjectId, path: &str) -> StorageResult<Option<Vec<u8>>> {
        let commit = self.get_commit(commit).await?;
        match commit.tree.get(path) {
            Some(blob) => Ok(Some(self.get_object(blob).await?)),
            None => Ok(None),
        }
    }
}
