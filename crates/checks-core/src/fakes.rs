//! In-memory fakes for the external collaborators (testing only)
//!
//! Provides `MemoryCheckRecords` and `MemoryChangeSource`, which satisfy the
//! collaborator contracts without any external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::collaborators::{ChangeSource, CheckRecords};
use crate::domain::{
    ChangeId, ChangeSnapshot, CheckKey, CheckRecord, ChecksError, PatchSetId, Result,
};

// ---------------------------------------------------------------------------
// MemoryCheckRecords
// ---------------------------------------------------------------------------

/// In-memory check records backed by a `HashMap<CheckKey, CheckRecord>`.
#[derive(Debug, Default)]
pub struct MemoryCheckRecords {
    records: Mutex<HashMap<CheckKey, CheckRecord>>,
}

impl MemoryCheckRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace a record.
    pub fn upsert(&self, record: CheckRecord) {
        let mut records = self.records.lock().unwrap();
        records.insert(record.key.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CheckRecords for MemoryCheckRecords {
    async fn get(&self, key: &CheckKey) -> Result<Option<CheckRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.get(key).cloned())
    }
}

// ---------------------------------------------------------------------------
// MemoryChangeSource
// ---------------------------------------------------------------------------

/// In-memory change source backed by a `HashMap<ChangeId, ChangeSnapshot>`.
///
/// Every patch set up to the current one resolves to the stored snapshot.
#[derive(Debug, Default)]
pub struct MemoryChangeSource {
    changes: Mutex<HashMap<ChangeId, ChangeSnapshot>>,
}

impl MemoryChangeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace a change.
    pub fn upsert(&self, change: ChangeSnapshot) {
        let mut changes = self.changes.lock().unwrap();
        changes.insert(change.id, change);
    }
}

#[async_trait]
impl ChangeSource for MemoryChangeSource {
    async fn snapshot(&self, patch_set: &PatchSetId) -> Result<ChangeSnapshot> {
        let change = self.current(patch_set.change).await?;
        if patch_set.number == 0 || patch_set.number > change.current_patch_set.number {
            return Err(ChecksError::NotFound(format!("patch set {patch_set}")));
        }
        Ok(change)
    }

    async fn current(&self, change: ChangeId) -> Result<ChangeSnapshot> {
        let changes = self.changes.lock().unwrap();
        changes
            .get(&change)
            .cloned()
            .ok_or_else(|| ChecksError::NotFound(format!("change {change}")))
    }
}
