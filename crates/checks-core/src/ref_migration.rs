//! One-shot migration of the repository index to its canonical ref.
//!
//! The index used to live at `refs/meta/checkers/`. Migration points
//! `refs/meta/checkers` at the legacy tip and only then deletes the legacy
//! ref, so at every step one of them holds the index. Earlier releases moved
//! the index through `refs/tmp/checker-migration`; a leftover temporary ref
//! is finished first.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use checks_state::{ObjectId, RefStore};
use tracing::{debug, info};

use crate::domain::{ChecksError, Result};
use crate::obs;
use crate::refs::{LEGACY_REFS_META_CHECKERS, REFS_META_CHECKERS, REFS_TMP_CHECKER_MIGRATION};

/// Moves the legacy index ref into place.
pub struct RefMigration {
    store: Arc<dyn RefStore>,
}

impl RefMigration {
    pub fn new(store: Arc<dyn RefStore>) -> Self {
        Self { store }
    }

    /// Run the migration. Returns whether any ref was moved.
    ///
    /// Idempotent: a second run finds nothing to do.
    pub async fn migrate(&self) -> Result<bool> {
        let mut moved = false;

        if self.exists(REFS_TMP_CHECKER_MIGRATION).await? {
            info!("finishing interrupted checker ref migration");
            moved |= self
                .rename(REFS_TMP_CHECKER_MIGRATION, REFS_META_CHECKERS)
                .await?;
        }

        if self.exists(LEGACY_REFS_META_CHECKERS).await? {
            moved |= self
                .rename(LEGACY_REFS_META_CHECKERS, REFS_META_CHECKERS)
                .await?;
        }

        if !moved {
            debug!("checker refs already migrated");
        }
        Ok(moved)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.store.read_ref(name).await?.is_some())
    }

    /// Point `to` at the tip of `from`, then delete `from`.
    ///
    /// If `to` already holds the tip, or a descendant of it, only the
    /// delete remains.
    async fn rename(&self, from: &str, to: &str) -> Result<bool> {
        self.try_rename(from, to).await.map_err(|e| {
            ChecksError::Migration(format!(
                "cannot rename {from} to {to}: {e}. Inspect both refs, delete the \
                 stale one, and rerun the migration"
            ))
        })
    }

    async fn try_rename(&self, from: &str, to: &str) -> Result<bool> {
        let Some(tip) = self.store.read_ref(from).await? else {
            return Ok(false);
        };

        match self.store.read_ref(to).await? {
            None => self.store.compare_and_swap(to, None, Some(&tip)).await?,
            Some(existing) if self.is_ancestor(&tip, &existing).await? => {
                debug!(from, to, "target already contains source history");
            }
            Some(existing) => {
                return Err(ChecksError::Migration(format!(
                    "{to} already points at unrelated commit {}",
                    existing.short()
                )))
            }
        }

        self.store.compare_and_swap(from, Some(&tip), None).await?;
        obs::emit_ref_migrated(from, to);
        Ok(true)
    }

    /// Whether `ancestor` is reachable from `descendant` (inclusive).
    async fn is_ancestor(&self, ancestor: &ObjectId, descendant: &ObjectId) -> Result<bool> {
        let mut queue = VecDeque::from([descendant.clone()]);
        let mut seen = BTreeSet::new();
        while let Some(next) = queue.pop_front() {
            if next == *ancestor {
                return Ok(true);
            }
            if !seen.insert(next.clone()) {
                continue;
            }
            queue.extend(self.store.get_commit(&next).await?.parents);
        }
        Ok(false)
    }
}
