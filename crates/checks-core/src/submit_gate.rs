//! Submit rule: may a change be merged?
//!
//! A change is blocked while any required checker of its repository has a
//! non-passing state on the current patch set. The gate always returns a
//! [`SubmitRecord`]; failures become `RuleError` records.

use std::sync::Arc;

use checks_state::{PersonIdent, RefStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::checker_store::CheckerStore;
use crate::collaborators::{ChangeSource, CheckRecords};
use crate::config::ChecksConfig;
use crate::domain::{
    ChangeId, ChangeSnapshot, CheckKey, CheckState, CheckerConfig, ChecksError, Result,
};
use crate::obs;
use crate::repository_index::RepositoryIndex;

/// Requirement text shown for blocked changes.
pub const REQUIREMENT_FALLBACK_TEXT: &str = "All required checks must pass";
/// Requirement type shown for blocked changes.
pub const REQUIREMENT_TYPE: &str = "checks_pass";

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitStatus {
    Ok,
    NotReady,
    RuleError,
}

impl SubmitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitStatus::Ok => "OK",
            SubmitStatus::NotReady => "NOT_READY",
            SubmitStatus::RuleError => "RULE_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequirement {
    pub fallback_text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl SubmitRequirement {
    /// The single requirement reported for blocked changes.
    pub fn checks_pass() -> Self {
        Self {
            fallback_text: REQUIREMENT_FALLBACK_TEXT.to_string(),
            kind: REQUIREMENT_TYPE.to_string(),
        }
    }
}

/// Outcome of the submit rule for one change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRecord {
    pub status: SubmitStatus,
    pub requirements: Option<Vec<SubmitRequirement>>,
    pub error_message: Option<String>,
}

impl SubmitRecord {
    fn ok() -> Self {
        Self {
            status: SubmitStatus::Ok,
            requirements: None,
            error_message: None,
        }
    }

    fn not_ready() -> Self {
        Self {
            status: SubmitStatus::NotReady,
            requirements: Some(vec![SubmitRequirement::checks_pass()]),
            error_message: None,
        }
    }

    fn rule_error(message: String) -> Self {
        Self {
            status: SubmitStatus::RuleError,
            requirements: None,
            error_message: Some(message),
        }
    }

    /// Whether submission is allowed.
    pub fn is_ok(&self) -> bool {
        self.status == SubmitStatus::Ok
    }
}

/// Whether `checker` can block `change`: enabled, blocking on a non-passing
/// state, and homed in the change's repository. Its query is not consulted.
pub fn is_required(checker: &CheckerConfig, change: &ChangeSnapshot) -> bool {
    checker.blocks_submit() && checker.repository == change.repository
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Evaluates the submit rule.
pub struct SubmitGate {
    store: Arc<dyn RefStore>,
    checkers: CheckerStore,
    records: Arc<dyn CheckRecords>,
    changes: Arc<dyn ChangeSource>,
    committer: PersonIdent,
}

impl SubmitGate {
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

    /// Verdict for `change` at its current patch set. Never fails.
    pub async fn submit_verdict(&self, change: ChangeId) -> SubmitRecord {
        let record = match self.changes.current(change).await {
            Err(e) => {
                warn!(change = %change, error = %e, "cannot load current patch set");
                SubmitRecord::rule_error(format!(
                    "failed to load the current patch set of change {change}"
                ))
            }
            Ok(snapshot) => match self.all_required_passing(&snapshot).await {
                Ok(true) => SubmitRecord::ok(),
                Ok(false) => SubmitRecord::not_ready(),
                Err(e) => {
                    warn!(change = %change, error = %e, "cannot evaluate check states");
                    SubmitRecord::rule_error(format!(
                        "failed to evaluate check states for change {change}"
                    ))
                }
            },
        };
        obs::emit_submit_evaluated(&change.to_string(), record.status.as_str());
        record
    }

    async fn all_required_passing(&self, change: &ChangeSnapshot) -> Result<bool> {
        let index = RepositoryIndex::load(Arc::clone(&self.store), self.committer.clone()).await?;
        for id in index.get(&change.repository).await? {
            let checker = match self.checkers.load(&id).await {
                Ok(checker) => checker,
                Err(e @ (ChecksError::NotFound(_) | ChecksError::InvalidConfig(_))) => {
                    obs::emit_checker_skipped(id.as_str(), &e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !is_required(&checker, change) {
                continue;
            }

            let key = CheckKey::new(&change.repository, change.current_patch_set, id.clone());
            let state = self
                .records
                .get(&key)
                .await?
                .map(|record| record.state)
                .unwrap_or(CheckState::NotStarted);
            if !state.is_passing() {
                debug!(checker = %id, ?state, "required check not passing");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_carries_requirement() {
        let record = SubmitRecord::not_ready();
        assert!(!record.is_ok());
        let requirements = record.requirements.unwrap();
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].fallback_text, "All required checks must pass");
        assert_eq!(requirements[0].kind, "checks_pass");
    }

    #[test]
    fn requirement_serializes_type_field() {
        let json = serde_json::to_value(SubmitRequirement::checks_pass()).unwrap();
        assert_eq!(json["type"], "checks_pass");
    }

    #[test]
    fn ok_record() {
        let record = SubmitRecord::ok();
        assert!(record.is_ok());
        assert!(record.requirements.is_none());
        assert!(record.error_message.is_none());
    }
}
