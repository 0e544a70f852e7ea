//! Checker configuration.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use checks_state::ObjectId;
use serde::{Deserialize, Serialize};

use super::checker_id::CheckerId;
use super::error::ChecksError;

/// Query applied when a checker has none configured.
pub const DEFAULT_QUERY: &str = "status:open";

/// Whether a checker is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckerStatus {
    #[default]
    Enabled,
    Disabled,
}

impl CheckerStatus {
    /// Value used in the config document.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckerStatus::Enabled => "enabled",
            CheckerStatus::Disabled => "disabled",
        }
    }
}

impl FromStr for CheckerStatus {
    type Err = ChecksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enabled" => Ok(CheckerStatus::Enabled),
            "disabled" => Ok(CheckerStatus::Disabled),
            other => Err(ChecksError::InvalidConfig(format!(
                "invalid status: {other:?}"
            ))),
        }
    }
}

impl fmt::Display for CheckerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule marking a checker as submit-required while it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockingCondition {
    /// Block submission while the check is not passing.
    StateNotPassing,
}

impl BlockingCondition {
    /// Value used in the config document.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockingCondition::StateNotPassing => "state not passing",
        }
    }
}

impl FromStr for BlockingCondition {
    type Err = ChecksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "state not passing" | "state_not_passing" => Ok(BlockingCondition::StateNotPassing),
            other => Err(ChecksError::InvalidConfig(format!(
                "invalid blocking condition: {other:?}"
            ))),
        }
    }
}

/// A loaded checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerConfig {
    pub id: CheckerId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    /// Home repository; never empty.
    pub repository: String,
    pub status: CheckerStatus,
    pub blocking: BTreeSet<BlockingCondition>,
    /// Applicability query; [`DEFAULT_QUERY`] when none is stored.
    pub query: String,
    /// Set once at creation, whole seconds.
    pub created: DateTime<Utc>,
    /// Commit time of the tip the config was loaded from.
    pub updated: DateTime<Utc>,
    /// Commit backing this load.
    pub ref_state: ObjectId,
}

impl CheckerConfig {
    pub fn is_enabled(&self) -> bool {
        self.status == CheckerStatus::Enabled
    }

    /// Enabled and blocking on a non-passing state. Callers add the scope
    /// condition (home repository or applicability).
    pub fn blocks_submit(&self) -> bool {
        self.is_enabled() && self.blocking.contains(&BlockingCondition::StateNotPassing)
    }
}

/// Fields for creating a checker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckerCreation {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub repository: String,
    pub status: Option<CheckerStatus>,
    pub blocking: Option<BTreeSet<BlockingCondition>>,
    pub query: Option<String>,
}

impl CheckerCreation {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_status(mut self, status: CheckerStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Block submission while the check is not passing.
    pub fn blocking(mut self) -> Self {
        self.blocking = Some(BTreeSet::from([BlockingCondition::StateNotPassing]));
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// Partial update of a checker. `None` leaves a field untouched; an empty
/// string clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckerUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub repository: Option<String>,
    pub status: Option<CheckerStatus>,
    pub blocking: Option<BTreeSet<BlockingCondition>>,
    pub query: Option<String>,
}

impl CheckerUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn status(mut self, status: CheckerStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn blocking(mut self, blocking: BTreeSet<BlockingCondition>) -> Self {
        self.blocking = Some(blocking);
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}
