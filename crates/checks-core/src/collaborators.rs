//! Interfaces to the systems the checks core reads from but does not own.

use async_trait::async_trait;

use crate::domain::{ChangeId, ChangeSnapshot, CheckKey, CheckRecord, PatchSetId, Result};

/// Persisted check results, keyed by (repository, patch set, checker).
#[async_trait]
pub trait CheckRecords: Send + Sync {
    /// The record for `key`, or `None` if the checker has not reported.
    async fn get(&self, key: &CheckKey) -> Result<Option<CheckRecord>>;
}

/// Source of change data.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Snapshot of the change as of `patch_set`. `NotFound` if the change
    /// or the patch set does not exist.
    async fn snapshot(&self, patch_set: &PatchSetId) -> Result<ChangeSnapshot>;

    /// Snapshot of the change at its current patch set.
    async fn current(&self, change: ChangeId) -> Result<ChangeSnapshot>;
}
