//! Combined check state of a patch set.
//!
//! Reduces the results of every checker indexed for a repository to one
//! [`CombinedCheckState`]. Read-only: nothing is persisted, so the state can
//! be recomputed on every request.

use std::sync::Arc;

use checks_state::{PersonIdent, RefStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::checker_store::CheckerStore;
use crate::collaborators::{ChangeSource, CheckRecords};
use crate::config::ChecksConfig;
use crate::domain::{CheckKey, CheckState, CheckerConfig, ChecksError, PatchSetId, Result};
use crate::obs;
use crate::query::QueryMatcher;
use crate::repository_index::RepositoryIndex;

// ---------------------------------------------------------------------------
// CombinedCheckState
// ---------------------------------------------------------------------------

/// Aggregate status of all checks relevant to a patch set.
///
/// Variants are declared in ascending precedence, so the combined state of
/// several contributions is their maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombinedCheckState {
    NotRelevant,
    Successful,
    InProgress,
    Warning,
    Failed,
}

impl CombinedCheckState {
    /// Highest-precedence state of `states`; `NotRelevant` if there are none.
    pub fn combine(states: impl IntoIterator<Item = CombinedCheckState>) -> Self {
        states
            .into_iter()
            .max()
            .unwrap_or(CombinedCheckState::NotRelevant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CombinedCheckState::NotRelevant => "NOT_RELEVANT",
            CombinedCheckState::Successful => "SUCCESSFUL",
            CombinedCheckState::InProgress => "IN_PROGRESS",
            CombinedCheckState::Warning => "WARNING",
            CombinedCheckState::Failed => "FAILED",
        }
    }
}

impl From<CheckState> for CombinedCheckState {
    fn from(state: CheckState) -> Self {
        match state {
            CheckState::Failed => CombinedCheckState::Failed,
            CheckState::NotStarted | CheckState::Scheduled | CheckState::Running => {
                CombinedCheckState::InProgress
            }
            CheckState::Successful => CombinedCheckState::Successful,
            CheckState::NotRelevant => CombinedCheckState::NotRelevant,
        }
    }
}

/// Contribution of one checker.
///
/// `applicable` is `None` when the checker's query could not be evaluated.
/// `backfilled` marks a `NotStarted` state standing in for a missing record.
/// Returns `None` when the checker does not contribute.
pub(crate) fn classify(
    checker: &CheckerConfig,
    state: CheckState,
    backfilled: bool,
    applicable: Option<bool>,
) -> Option<CombinedCheckState> {
    match applicable {
        None => Some(CombinedCheckState::Warning),
        Some(false) if backfilled => None,
        Some(false) if state == CheckState::NotRelevant => Some(CombinedCheckState::NotRelevant),
        Some(false) => Some(CombinedCheckState::Warning),
        Some(true) => match CombinedCheckState::from(state) {
            CombinedCheckState::Failed if !checker.blocks_submit() => {
                Some(CombinedCheckState::Warning)
            }
            combined => Some(combined),
        },
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Computes [`CombinedCheckState`] per (repository, patch set).
pub struct CombinedStateAggregator {
    store: Arc<dyn RefStore>,
    checkers: CheckerStore,
    records: Arc<dyn CheckRecords>,
    changes: Arc<dyn ChangeSource>,
    committer: PersonIdent,
}

impl CombinedStateAggregator {
    pub fn new(
        store: Arc<dyn RefStore>,
        records: Arc<dyn CheckRecords>,
        changes: Arc<dyn ChangeSource>,
        config: &ChecksConfig,
    ) -> Self {
        Self {
            checkers: CheckerStore::new(Arc::clone(&store), config),
            store,
            records,
            changes,
            committer: config.committer(),
        }
    }

    /// Combined state of all checkers indexed for `repository` on
    /// `patch_set`.
    ///
    /// Checkers that fail to load are skipped. Missing records are backfilled
    /// as `NotStarted` for enabled checkers on the current patch set only.
    pub async fn combined_check_state(
        &self,
        repository: &str,
        patch_set: &PatchSetId,
    ) -> Result<CombinedCheckState> {
        let index = RepositoryIndex::load(Arc::clone(&self.store), self.committer.clone()).await?;
        let candidates = index.get(repository).await?;
        if candidates.is_empty() {
            obs::emit_combined_state(
                repository,
                &patch_set.to_string(),
                CombinedCheckState::NotRelevant.as_str(),
                0,
            );
            return Ok(CombinedCheckState::NotRelevant);
        }

        let change = self.changes.snapshot(patch_set).await?;
        let is_current = change.current_patch_set == *patch_set;

        let mut contributions = Vec::new();
        for id in candidates {
            let checker = match self.checkers.load(&id).await {
                Ok(checker) => checker,
                Err(e @ (ChecksError::NotFound(_) | ChecksError::InvalidConfig(_))) => {
                    obs::emit_checker_skipped(id.as_str(), &e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let applicable = match QueryMatcher::matches(Some(&checker.query), &change) {
                Ok(applicable) => Some(applicable),
                Err(e) => {
                    warn!(checker = %id, query = %checker.query, error = %e, "cannot evaluate checker query");
                    None
                }
            };

            let key = CheckKey::new(repository, *patch_set, id.clone());
            let (state, backfilled) = match self.records.get(&key).await? {
                Some(record) => (record.state, false),
                None if checker.is_enabled() && is_current => (CheckState::NotStarted, true),
                None => {
                    debug!(checker = %id, "no check record, not backfilling");
                    continue;
                }
            };

            if let Some(contribution) = classify(&checker, state, backfilled, applicable) {
                debug!(checker = %id, ?state, ?contribution, "check contributes");
                contributions.push(contribution);
            }
        }

        let combined = CombinedCheckState::combine(contributions.iter().copied());
        obs::emit_combined_state(
            repository,
            &patch_set.to_string(),
            combined.as_str(),
            contributions.len(),
        );
        Ok(combined)
    }
}
