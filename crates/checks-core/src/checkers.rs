//! Checker management facade.
//!
//! Validates user input and keeps the repository index in step with checker
//! configs: creating a checker indexes it under its repository, moving it to
//! another repository moves its index entry.
//!
//! Config and index live on different refs and are not written atomically.
//! A retried create of the same checker and every update re-insert the
//! index entry, so a checker left unindexed by a failed index commit is
//! repaired by the next such call.

use std::sync::Arc;

use checks_state::{PersonIdent, RefStore};
use tracing::{debug, warn};

use crate::checker_store::CheckerStore;
use crate::config::ChecksConfig;
use crate::domain::{
    CheckerConfig, CheckerCreation, CheckerId, CheckerUpdate, ChecksError, Result,
};
use crate::obs;
use crate::query::QueryMatcher;
use crate::refs::REFS_META_CHECKERS;
use crate::repository_index::RepositoryIndex;

#[derive(Debug, Clone, Copy)]
enum IndexChange<'a> {
    Insert(&'a str),
    Move { from: &'a str, to: &'a str },
}

/// Creates, updates and lists checkers.
#[derive(Clone)]
pub struct Checkers {
    store: Arc<dyn RefStore>,
    checkers: CheckerStore,
    committer: PersonIdent,
    max_commit_attempts: u32,
}

impl Checkers {
    pub fn new(store: Arc<dyn RefStore>, config: &ChecksConfig) -> Self {
        Self {
            checkers: CheckerStore::new(Arc::clone(&store), config),
            store,
            committer: config.committer(),
            max_commit_attempts: config.max_commit_attempts.max(1),
        }
    }

    /// The underlying config store.
    pub fn config_store(&self) -> &CheckerStore {
        &self.checkers
    }

    /// Create a checker and index it under its repository.
    pub async fn create(&self, id: &str, creation: CheckerCreation) -> Result<CheckerConfig> {
        let id = CheckerId::parse(id)?;
        let mut creation = creation;
        if let Some(url) = &creation.url {
            creation.url = Some(clean_url(url)?);
        }
        if let Some(query) = &creation.query {
            creation.query = Some(QueryMatcher::clean(query)?);
        }

        let checker = match self.checkers.create(&id, &creation).await {
            Ok(checker) => checker,
            Err(ChecksError::AlreadyExists(existing)) => {
                self.repair_index_entry(&id, creation.repository.trim()).await;
                return Err(ChecksError::AlreadyExists(existing));
            }
            Err(e) => return Err(e),
        };
        self.apply_to_index(&id, IndexChange::Insert(&checker.repository))
            .await?;
        Ok(checker)
    }

    /// Update a checker. A repository change moves its index entry; otherwise
    /// the entry under its repository is re-inserted if missing.
    pub async fn update(&self, id: &CheckerId, update: CheckerUpdate) -> Result<CheckerConfig> {
        let mut update = update;
        if let Some(url) = &update.url {
            update.url = Some(clean_url(url)?);
        }
        if let Some(query) = &update.query {
            update.query = Some(QueryMatcher::clean(query)?);
        }

        let before = self.checkers.load(id).await?;
        let after = self.checkers.update(id, &update).await?;
        if before.repository != after.repository {
            self.apply_to_index(
                id,
                IndexChange::Move {
                    from: &before.repository,
                    to: &after.repository,
                },
            )
            .await?;
        } else {
            self.apply_to_index(id, IndexChange::Insert(&after.repository))
                .await?;
        }
        Ok(after)
    }

    pub async fn get(&self, id: &CheckerId) -> Result<CheckerConfig> {
        self.checkers.load(id).await
    }

    pub async fn exists(&self, id: &CheckerId) -> Result<bool> {
        self.checkers.exists(id).await
    }

    /// All loadable checkers, ordered by id.
    pub async fn list(&self) -> Result<Vec<CheckerConfig>> {
        self.checkers.list().await
    }

    /// Checkers indexed for `repository` whose config still names it,
    /// ordered by id. Checkers that fail to load are skipped.
    pub async fn list_checkers_of(&self, repository: &str) -> Result<Vec<CheckerConfig>> {
        let index = RepositoryIndex::load(Arc::clone(&self.store), self.committer.clone()).await?;
        let mut result = Vec::new();
        for id in index.get(repository).await? {
            match self.checkers.load(&id).await {
                Ok(checker) if checker.repository == repository => result.push(checker),
                Ok(checker) => debug!(
                    checker = %id,
                    repository = %checker.repository,
                    "index entry is stale, skipping"
                ),
                Err(e @ (ChecksError::NotFound(_) | ChecksError::InvalidConfig(_))) => {
                    obs::emit_checker_skipped(id.as_str(), &e)
                }
                Err(e) => return Err(e),
            }
        }
        Ok(result)
    }

    /// Index an existing checker if its config names `repository`.
    /// Failures are logged; the caller reports its own outcome.
    async fn repair_index_entry(&self, id: &CheckerId, repository: &str) {
        let existing = match self.checkers.load(id).await {
            Ok(existing) => existing,
            Err(e) => {
                debug!(checker = %id, error = %e, "cannot load existing checker");
                return;
            }
        };
        if existing.repository != repository {
            return;
        }
        if let Err(e) = self
            .apply_to_index(id, IndexChange::Insert(&existing.repository))
            .await
        {
            warn!(checker = %id, error = %e, "cannot repair repository index entry");
        }
    }

    async fn apply_to_index(&self, id: &CheckerId, change: IndexChange<'_>) -> Result<()> {
        for attempt in 1..=self.max_commit_attempts {
            let mut index =
                RepositoryIndex::load(Arc::clone(&self.store), self.committer.clone()).await?;
            match change {
                IndexChange::Insert(repository) => index.insert(id, repository).await?,
                IndexChange::Move { from, to } => index.update(id, from, to).await?,
            }
            match index.commit().await {
                Ok(_) => return Ok(()),
                Err(ChecksError::Conflict { .. }) => {
                    warn!(checker = %id, attempt, "repository index moved, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(ChecksError::Conflict {
            ref_name: REFS_META_CHECKERS.to_string(),
            attempts: self.max_commit_attempts,
        })
    }
}

/// Trim `url` and require an http(s) scheme. Empty stays empty.
fn clean_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    let lower = trimmed.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(trimmed.to_string()),
        _ => Err(ChecksError::InvalidConfig(format!(
            "only http/https URLs supported: {trimmed}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_must_be_http() {
        assert_eq!(
            clean_url(" https://ci.example.com/x ").unwrap(),
            "https://ci.example.com/x"
        );
        assert!(clean_url("HTTP://ci.example.com").is_ok());
        assert_eq!(clean_url("  ").unwrap(), "");
        assert!(clean_url("ftp://ci.example.com").is_err());
        assert!(clean_url("javascript:alert(1)").is_err());
        assert!(clean_url("https://").is_err());
    }
}
