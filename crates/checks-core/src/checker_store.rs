//! Versioned checker configs, one ref per checker.
//!
//! Every write is a commit whose parent is the tip the write was computed
//! from, published by compare-and-swap on that tip. A lost race on update
//! is retried against the new tip up to `max_commit_attempts` times.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use checks_state::{Commit, ObjectId, PersonIdent, RefStore};
use tracing::{debug, instrument};

use crate::config::ChecksConfig;
use crate::document::CheckerDocument;
use crate::domain::{
    CheckerConfig, CheckerCreation, CheckerId, CheckerUpdate, ChecksError, Result,
};
use crate::obs;
use crate::refs::{checker_ref, CHECKER_CONFIG_FILE, REFS_CHECKERS};

const CREATE_MESSAGE: &str = "Create checker";
const UPDATE_MESSAGE: &str = "Update checker";

/// Reads and writes checker configs.
#[derive(Clone)]
pub struct CheckerStore {
    store: Arc<dyn RefStore>,
    committer: PersonIdent,
    max_commit_attempts: u32,
}

/// A document together with the commit it was read from.
struct Loaded {
    document: CheckerDocument,
    tip: ObjectId,
    commit: Commit,
}

impl Loaded {
    fn into_config(self) -> CheckerConfig {
        self.document.into_config(self.tip, self.commit.committed_at)
    }
}

impl CheckerStore {
    pub fn new(store: Arc<dyn RefStore>, config: &ChecksConfig) -> Self {
        Self {
            store,
            committer: config.committer(),
            max_commit_attempts: config.max_commit_attempts.max(1),
        }
    }

    /// Create a checker. Fails `AlreadyExists` if its ref is taken, also
    /// when another writer wins the race for it.
    #[instrument(skip_all, fields(checker = %id))]
    pub async fn create(&self, id: &CheckerId, creation: &CheckerCreation) -> Result<CheckerConfig> {
        let document = CheckerDocument::for_creation(id.clone(), creation, Utc::now())?;
        let ref_name = checker_ref(id);
        if self.store.read_ref(&ref_name).await?.is_some() {
            return Err(ChecksError::AlreadyExists(id.to_string()));
        }

        let (tip, commit) = self.write_commit(&document, None, CREATE_MESSAGE).await?;
        match self
            .store
            .compare_and_swap(&ref_name, None, Some(&tip))
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_lock_failure() => {
                return Err(ChecksError::AlreadyExists(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        obs::emit_checker_created(id.as_str(), &document.repository, tip.as_str());
        Ok(Loaded {
            document,
            tip,
            commit,
        }
        .into_config())
    }

    /// Load the current config. `NotFound` if the checker has no ref.
    pub async fn load(&self, id: &CheckerId) -> Result<CheckerConfig> {
        Ok(self.load_tip(id).await?.into_config())
    }

    pub async fn exists(&self, id: &CheckerId) -> Result<bool> {
        Ok(self.store.read_ref(&checker_ref(id)).await?.is_some())
    }

    /// Apply the present fields of `update`.
    ///
    /// Commits only when the document changes; otherwise returns the loaded
    /// config with its ref-state untouched.
    #[instrument(skip_all, fields(checker = %id))]
    pub async fn update(&self, id: &CheckerId, update: &CheckerUpdate) -> Result<CheckerConfig> {
        let ref_name = checker_ref(id);

        for attempt in 1..=self.max_commit_attempts {
            let current = self.load_tip(id).await?;
            let document = current.document.apply(update)?;
            if document == current.document {
                debug!(checker = %id, "update is a no-op");
                return Ok(current.into_config());
            }

            let (tip, commit) = self
                .write_commit(&document, Some(&current.tip), UPDATE_MESSAGE)
                .await?;
            match self
                .store
                .compare_and_swap(&ref_name, Some(&current.tip), Some(&tip))
                .await
            {
                Ok(()) => {
                    obs::emit_checker_updated(id.as_str(), tip.as_str(), attempt);
                    return Ok(Loaded {
                        document,
                        tip,
                        commit,
                    }
                    .into_config());
                }
                Err(e) if e.is_lock_failure() => {
                    debug!(checker = %id, attempt, "ref moved during update, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ChecksError::Conflict {
            ref_name,
            attempts: self.max_commit_attempts,
        })
    }

    /// All checkers whose config loads, ordered by id. Broken ones are
    /// logged and skipped.
    pub async fn list(&self) -> Result<Vec<CheckerConfig>> {
        let mut configs = Vec::new();
        for (ref_name, tip) in self.store.list_refs(REFS_CHECKERS).await? {
            match self.read_document(&tip).await {
                Ok(loaded) if checker_ref(&loaded.document.id) == ref_name => {
                    configs.push(loaded.into_config())
                }
                Ok(loaded) => obs::emit_checker_skipped(
                    &ref_name,
                    &format!("stored uuid {} does not match its ref", loaded.document.id),
                ),
                Err(e) => obs::emit_checker_skipped(&ref_name, &e),
            }
        }
        configs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(configs)
    }

    // -- private helpers -----------------------------------------------------

    async fn load_tip(&self, id: &CheckerId) -> Result<Loaded> {
        let tip = self
            .store
            .read_ref(&checker_ref(id))
            .await?
            .ok_or_else(|| ChecksError::NotFound(format!("checker {id}")))?;
        let loaded = self.read_document(&tip).await?;
        if loaded.document.id != *id {
            return Err(ChecksError::InvalidConfig(format!(
                "config of {id} names {} instead",
                loaded.document.id
            )));
        }
        debug!(checker = %id, tip = %tip.short(), "loaded checker");
        Ok(loaded)
    }

    async fn read_document(&self, tip: &ObjectId) -> Result<Loaded> {
        let commit = self.store.get_commit(tip).await?;
        let blob = commit.tree.get(CHECKER_CONFIG_FILE).ok_or_else(|| {
            ChecksError::InvalidConfig(format!("commit {} has no {CHECKER_CONFIG_FILE}", tip.short()))
        })?;
        let bytes = self.store.get_object(blob).await?;
        let document = CheckerDocument::parse(&bytes)?;
        Ok(Loaded {
            document,
            tip: tip.clone(),
            commit,
        })
    }

    async fn write_commit(
        &self,
        document: &CheckerDocument,
        parent: Option<&ObjectId>,
        message: &str,
    ) -> Result<(ObjectId, Commit)> {
        let blob = self.store.put_object(&document.encode()?).await?;
        let tree = BTreeMap::from([(CHECKER_CONFIG_FILE.to_string(), blob)]);
        let commit = Commit::new(
            parent.into_iter().cloned().collect(),
            tree,
            message,
            self.committer.clone(),
        );
        let id = self.store.put_commit(&commit).await?;
        Ok((id, commit))
    }
}
