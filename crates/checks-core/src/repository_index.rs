//! Repository → checkers index.
//!
//! Stored as notes on `refs/meta/checkers`: one tree entry per repository,
//! keyed by the SHA-256 of the repository name, holding the sorted checker
//! ids one per line. Mutations accumulate in memory and are published as a
//! single commit by [`RepositoryIndex::commit`].
//!
//! Before migration the index lived at `refs/meta/checkers/`. Reads fall
//! back to that ref, or to the temporary ref of an interrupted migration,
//! while the canonical one is absent; the first write lands on the
//! canonical ref on top of the fallback tip.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use checks_state::{Commit, ObjectId, PersonIdent, RefStore, StorageError};
use tracing::{debug, warn};

use crate::domain::{CheckerId, ChecksError, Result};
use crate::obs;
use crate::refs::{
    repository_note_key, LEGACY_REFS_META_CHECKERS, REFS_META_CHECKERS,
    REFS_TMP_CHECKER_MIGRATION,
};

const COMMIT_SUBJECT: &str = "Update checkers by repository";

/// The committed state an index was read from.
#[derive(Debug, Clone, Default)]
struct Base {
    /// Commit the tree was read from; parent of the next commit.
    parent: Option<ObjectId>,
    /// Value the canonical ref must still hold for a commit to succeed.
    expected: Option<ObjectId>,
    tree: BTreeMap<String, ObjectId>,
}

/// A loaded index plus pending mutations.
pub struct RepositoryIndex {
    store: Arc<dyn RefStore>,
    committer: PersonIdent,
    base: Base,
    pending: BTreeMap<String, BTreeSet<CheckerId>>,
    mutations: Vec<(CheckerId, String)>,
}

impl RepositoryIndex {
    /// Load the index at HEAD.
    ///
    /// While the canonical ref is absent, reads fall back to the legacy ref
    /// and then to the temporary ref of an interrupted migration.
    pub async fn load(store: Arc<dyn RefStore>, committer: PersonIdent) -> Result<Self> {
        if let Some(tip) = store.read_ref(REFS_META_CHECKERS).await? {
            let base = Base {
                tree: store.get_commit(&tip).await?.tree,
                parent: Some(tip.clone()),
                expected: Some(tip),
            };
            return Ok(Self::with_base(store, committer, base));
        }

        for fallback in [LEGACY_REFS_META_CHECKERS, REFS_TMP_CHECKER_MIGRATION] {
            if let Some(tip) = store.read_ref(fallback).await? {
                debug!(ref_name = fallback, tip = %tip.short(), "reading repository index from fallback ref");
                let base = Base {
                    tree: store.get_commit(&tip).await?.tree,
                    parent: Some(tip),
                    expected: None,
                };
                return Ok(Self::with_base(store, committer, base));
            }
        }
        Ok(Self::with_base(store, committer, Base::default()))
    }

    /// Load the index as of `revision`.
    ///
    /// A `None` or unknown revision yields an empty index.
    pub async fn load_at(
        store: Arc<dyn RefStore>,
        committer: PersonIdent,
        revision: Option<&ObjectId>,
    ) -> Result<Self> {
        let base = match revision {
            None => Base::default(),
            Some(rev) => match store.get_commit(rev).await {
                Ok(commit) => Base {
                    tree: commit.tree,
                    parent: Some(rev.clone()),
                    expected: Some(rev.clone()),
                },
                Err(StorageError::ObjectNotFound { .. }) => {
                    debug!(revision = %rev.short(), "unknown index revision");
                    Base::default()
                }
                Err(e) => return Err(e.into()),
            },
        };
        Ok(Self::with_base(store, committer, base))
    }

    fn with_base(store: Arc<dyn RefStore>, committer: PersonIdent, base: Base) -> Self {
        Self {
            store,
            committer,
            base,
            pending: BTreeMap::new(),
            mutations: Vec::new(),
        }
    }

    /// Commit the index was read from, if any.
    pub fn revision(&self) -> Option<&ObjectId> {
        self.base.parent.as_ref()
    }

    /// Checkers of `repository`, including pending mutations.
    pub async fn get(&self, repository: &str) -> Result<BTreeSet<CheckerId>> {
        let key = repository_note_key(repository);
        if let Some(ids) = self.pending.get(&key) {
            return Ok(ids.clone());
        }
        self.read_note(&key).await
    }

    /// Add `id` to `repository`. No-op if already present.
    pub async fn insert(&mut self, id: &CheckerId, repository: &str) -> Result<()> {
        let mut ids = self.get(repository).await?;
        if ids.insert(id.clone()) {
            self.record(id, repository, ids);
        }
        Ok(())
    }

    /// Remove `id` from `repository`. No-op if absent.
    pub async fn remove(&mut self, id: &CheckerId, repository: &str) -> Result<()> {
        let mut ids = self.get(repository).await?;
        if ids.remove(id) {
            self.record(id, repository, ids);
        }
        Ok(())
    }

    /// Move `id` from one repository to another.
    pub async fn update(&mut self, id: &CheckerId, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Ok(());
        }
        self.remove(id, from).await?;
        self.insert(id, to).await
    }

    /// Publish pending mutations as one commit.
    ///
    /// Returns the new commit, or `None` when no note changed. A concurrent
    /// write to the index fails with `Conflict`.
    pub async fn commit(&mut self) -> Result<Option<ObjectId>> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        let mut tree = self.base.tree.clone();
        for (key, ids) in &self.pending {
            if ids.is_empty() {
                tree.remove(key);
            } else {
                let blob = self.store.put_object(encode_note(ids).as_bytes()).await?;
                tree.insert(key.clone(), blob);
            }
        }
        if tree == self.base.tree {
            debug!("repository index unchanged, nothing to commit");
            self.pending.clear();
            self.mutations.clear();
            return Ok(None);
        }

        let commit = Commit::new(
            self.base.parent.iter().cloned().collect(),
            tree.clone(),
            self.commit_message(),
            self.committer.clone(),
        );
        let tip = self.store.put_commit(&commit).await?;
        match self
            .store
            .compare_and_swap(REFS_META_CHECKERS, self.base.expected.as_ref(), Some(&tip))
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_lock_failure() => {
                return Err(ChecksError::Conflict {
                    ref_name: REFS_META_CHECKERS.to_string(),
                    attempts: 1,
                })
            }
            Err(e) => return Err(e.into()),
        }

        obs::emit_index_committed(REFS_META_CHECKERS, tip.as_str(), self.mutations.len());
        self.base = Base {
            parent: Some(tip.clone()),
            expected: Some(tip.clone()),
            tree,
        };
        self.pending.clear();
        self.mutations.clear();
        Ok(Some(tip))
    }

    // -- private helpers -----------------------------------------------------

    fn record(&mut self, id: &CheckerId, repository: &str, ids: BTreeSet<CheckerId>) {
        self.pending.insert(repository_note_key(repository), ids);
        self.mutations.push((id.clone(), repository.to_string()));
    }

    fn commit_message(&self) -> String {
        let blocks: Vec<String> = self
            .mutations
            .iter()
            .map(|(id, repository)| format!("Checker: {id}\nRepository: {repository}"))
            .collect();
        format!("{COMMIT_SUBJECT}\n\n{}", blocks.join("\n"))
    }

    async fn read_note(&self, key: &str) -> Result<BTreeSet<CheckerId>> {
        let Some(blob) = self.base.tree.get(key) else {
            return Ok(BTreeSet::new());
        };
        let bytes = self.store.get_object(blob).await?;
        Ok(decode_note(&String::from_utf8_lossy(&bytes)))
    }
}

fn encode_note(ids: &BTreeSet<CheckerId>) -> String {
    let mut note = String::new();
    for id in ids {
        note.push_str(id.as_str());
        note.push('\n');
    }
    note
}

fn decode_note(text: &str) -> BTreeSet<CheckerId> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match CheckerId::parse(line) {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(line = %line, "ignoring invalid checker id in repository index");
                None
            }
        })
        .collect()
}
