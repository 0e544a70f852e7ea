//! The `checker.config` document.
//!
//! A TOML file with one `[checker]` section:
//!
//! ```toml
//! [checker]
//! uuid = "test:my-checker"
//! name = "My Checker"
//! repository = "my/repo"
//! status = "enabled"
//! blocking = ["state not passing"]
//! query = "status:open"
//! created = "2024-05-01T10:00:00Z"
//! ```
//!
//! Unknown keys and sections are ignored on read and dropped on rewrite.

use std::collections::BTreeSet;

use chrono::{DateTime, SubsecRound, Utc};
use checks_state::ObjectId;
use serde::{Deserialize, Serialize};

use crate::domain::{
    BlockingCondition, CheckerConfig, CheckerCreation, CheckerId, CheckerStatus, CheckerUpdate,
    ChecksError, Result, DEFAULT_QUERY,
};

/// Parsed contents of a checker's config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerDocument {
    pub id: CheckerId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub repository: String,
    pub status: CheckerStatus,
    pub blocking: BTreeSet<BlockingCondition>,
    /// `None` means the default query applies.
    pub query: Option<String>,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    checker: Option<CheckerSection>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckerSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    blocking: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<String>,
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ChecksError::InvalidConfig(format!("checker.{key} is missing")))
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CheckerDocument {
    /// Document for a new checker. Unset fields take their defaults; the
    /// query is written out explicitly.
    pub fn for_creation(
        id: CheckerId,
        creation: &CheckerCreation,
        created: DateTime<Utc>,
    ) -> Result<Self> {
        let repository = creation.repository.trim();
        if repository.is_empty() {
            return Err(ChecksError::InvalidConfig(
                "repository is required".to_string(),
            ));
        }
        Ok(Self {
            id,
            name: optional(creation.name.clone()),
            description: optional(creation.description.clone()),
            url: optional(creation.url.clone()),
            repository: repository.to_string(),
            status: creation.status.unwrap_or_default(),
            blocking: creation.blocking.clone().unwrap_or_default(),
            query: optional(creation.query.clone()).or_else(|| Some(DEFAULT_QUERY.to_string())),
            created: created.trunc_subsecs(0),
        })
    }

    /// Copy of `self` with the present fields of `update` applied.
    ///
    /// An empty string clears an optional field. Emptying the repository
    /// fails the whole update.
    pub fn apply(&self, update: &CheckerUpdate) -> Result<Self> {
        let mut next = self.clone();
        if let Some(name) = &update.name {
            next.name = optional(Some(name.clone()));
        }
        if let Some(description) = &update.description {
            next.description = optional(Some(description.clone()));
        }
        if let Some(url) = &update.url {
            next.url = optional(Some(url.clone()));
        }
        if let Some(repository) = &update.repository {
            let repository = repository.trim();
            if repository.is_empty() {
                return Err(ChecksError::InvalidConfig(
                    "repository cannot be unset".to_string(),
                ));
            }
            next.repository = repository.to_string();
        }
        if let Some(status) = update.status {
            next.status = status;
        }
        if let Some(blocking) = &update.blocking {
            next.blocking = blocking.clone();
        }
        if let Some(query) = &update.query {
            next.query = optional(Some(query.clone()));
        }
        Ok(next)
    }

    /// Decode a config file. Any structural problem is `InvalidConfig`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ChecksError::InvalidConfig(format!("not UTF-8: {e}")))?;
        let file: ConfigFile = toml::from_str(text)?;
        let section = file
            .checker
            .ok_or_else(|| ChecksError::InvalidConfig("missing [checker] section".to_string()))?;

        let raw_id = required(section.uuid, "uuid")?;
        let id = CheckerId::parse(&raw_id)
            .map_err(|_| ChecksError::InvalidConfig(format!("invalid uuid: {raw_id}")))?;
        let repository = required(section.repository, "repository")?;
        let status: CheckerStatus = required(section.status, "status")?.parse()?;
        let blocking = section
            .blocking
            .iter()
            .map(|b| b.parse())
            .collect::<Result<BTreeSet<BlockingCondition>>>()?;
        let created_raw = required(section.created, "created")?;
        let created = DateTime::parse_from_rfc3339(&created_raw)
            .map_err(|e| ChecksError::InvalidConfig(format!("invalid created {created_raw:?}: {e}")))?
            .with_timezone(&Utc);

        Ok(Self {
            id,
            name: optional(section.name),
            description: optional(section.description),
            url: optional(section.url),
            repository,
            status,
            blocking,
            query: optional(section.query),
            created,
        })
    }

    /// Encode as a config file. Empty optionals are omitted.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let file = ConfigFile {
            checker: Some(CheckerSection {
                uuid: Some(self.id.to_string()),
                name: optional(self.name.clone()),
                description: optional(self.description.clone()),
                url: optional(self.url.clone()),
                repository: Some(self.repository.clone()),
                status: Some(self.status.as_str().to_string()),
                blocking: self.blocking.iter().map(|b| b.as_str().to_string()).collect(),
                query: optional(self.query.clone()),
                created: Some(self.created.trunc_subsecs(0).to_rfc3339()),
            }),
        };
        Ok(toml::to_string(&file)?.into_bytes())
    }

    /// Attach the commit the document was read from.
    pub fn into_config(self, ref_state: ObjectId, updated: DateTime<Utc>) -> CheckerConfig {
        CheckerConfig {
            id: self.id,
            name: self.name,
            description: self.description,
            url: self.url,
            repository: self.repository,
            status: self.status,
            blocking: self.blocking,
            query: self.query.unwrap_or_else(|| DEFAULT_QUERY.to_string()),
            created: self.created,
            updated,
            ref_state,
        }
    }
}
