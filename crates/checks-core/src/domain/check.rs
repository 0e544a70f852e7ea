//! Check records reported by checkers, keyed per patch set.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::checker_id::CheckerId;

/// Numeric change identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChangeId(pub u64);

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One patch set of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatchSetId {
    pub change: ChangeId,
    pub number: u32,
}

impl PatchSetId {
    pub fn new(change: u64, number: u32) -> Self {
        Self {
            change: ChangeId(change),
            number,
        }
    }
}

impl fmt::Display for PatchSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.change, self.number)
    }
}

/// State reported for one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckState {
    NotStarted,
    Scheduled,
    Running,
    Failed,
    Successful,
    NotRelevant,
}

impl CheckState {
    /// Not yet finished: `NotStarted`, `Scheduled` or `Running`.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            CheckState::NotStarted | CheckState::Scheduled | CheckState::Running
        )
    }

    /// Does not block submission.
    pub fn is_passing(&self) -> bool {
        matches!(self, CheckState::Successful | CheckState::NotRelevant)
    }
}

/// Identity of a check record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CheckKey {
    pub repository: String,
    pub patch_set: PatchSetId,
    pub checker: CheckerId,
}

impl CheckKey {
    pub fn new(repository: impl Into<String>, patch_set: PatchSetId, checker: CheckerId) -> Self {
        Self {
            repository: repository.into(),
            patch_set,
            checker,
        }
    }
}

/// A check result as persisted by the check-record repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub key: CheckKey,
    pub state: CheckState,
    pub message: Option<String>,
    pub url: Option<String>,
    pub started: Option<DateTime<Utc>>,
    pub finished: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl CheckRecord {
    pub fn new(key: CheckKey, state: CheckState) -> Self {
        let now = Utc::now().trunc_subsecs(0);
        Self {
            key,
            state,
            message: None,
            url: None,
            started: None,
            finished: None,
            created: now,
            updated: now,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}
