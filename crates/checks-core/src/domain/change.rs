//! Change snapshots supplied by the change source.

use checks_state::PersonIdent;
use serde::{Deserialize, Serialize};

use super::check::{ChangeId, PatchSetId};

/// Lifecycle status of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    #[default]
    New,
    Merged,
    Abandoned,
}

impl ChangeStatus {
    pub fn is_open(&self) -> bool {
        *self == ChangeStatus::New
    }
}

/// A file touched by a patch set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub insertions: u32,
    pub deletions: u32,
}

impl FileChange {
    pub fn new(path: impl Into<String>, insertions: u32, deletions: u32) -> Self {
        Self {
            path: path.into(),
            insertions,
            deletions,
        }
    }
}

/// Everything the query matcher can see of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSnapshot {
    pub id: ChangeId,
    pub repository: String,
    /// Destination branch, short form (`main`, not `refs/heads/main`).
    pub branch: String,
    pub status: ChangeStatus,
    pub current_patch_set: PatchSetId,
    pub owner: PersonIdent,
    pub author: PersonIdent,
    pub committer: PersonIdent,
    pub topic: Option<String>,
    pub hashtags: Vec<String>,
    /// Reviewer account names or emails.
    pub reviewers: Vec<String>,
    pub assignee: Option<String>,
    pub files: Vec<FileChange>,
    /// Commit message footers as `(key, value)` pairs.
    pub footers: Vec<(String, String)>,
    pub work_in_progress: bool,
    pub unresolved_comments: u32,
}

impl ChangeSnapshot {
    /// A new, open change with one patch set and no files.
    pub fn new(id: u64, repository: impl Into<String>, branch: impl Into<String>) -> Self {
        let someone = PersonIdent::new("Change Owner", "owner@example.com");
        Self {
            id: ChangeId(id),
            repository: repository.into(),
            branch: branch.into(),
            status: ChangeStatus::New,
            current_patch_set: PatchSetId::new(id, 1),
            owner: someone.clone(),
            author: someone.clone(),
            committer: someone,
            topic: None,
            hashtags: Vec::new(),
            reviewers: Vec::new(),
            assignee: None,
            files: Vec::new(),
            footers: Vec::new(),
            work_in_progress: false,
            unresolved_comments: 0,
        }
    }

    pub fn with_status(mut self, status: ChangeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_file(mut self, file: FileChange) -> Self {
        self.files.push(file);
        self
    }

    /// Total inserted lines over all files.
    pub fn insertions(&self) -> u64 {
        self.files.iter().map(|f| u64::from(f.insertions)).sum()
    }

    /// Total deleted lines over all files.
    pub fn deletions(&self) -> u64 {
        self.files.iter().map(|f| u64::from(f.deletions)).sum()
    }

    /// Full destination ref name.
    pub fn dest_ref(&self) -> String {
        if self.branch.starts_with("refs/") {
            self.branch.clone()
        } else {
            format!("refs/heads/{}", self.branch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_counts_sum_over_files() {
        let change = ChangeSnapshot::new(1, "repo", "main")
            .with_file(FileChange::new("a.rs", 10, 2))
            .with_file(FileChange::new("b.rs", 5, 3));
        assert_eq!(change.insertions(), 15);
        assert_eq!(change.deletions(), 5);
    }

    #[test]
    fn dest_ref_is_fully_qualified() {
        assert_eq!(
            ChangeSnapshot::new(1, "r", "main").dest_ref(),
            "refs/heads/main"
        );
        assert_eq!(
            ChangeSnapshot::new(1, "r", "refs/meta/config").dest_ref(),
            "refs/meta/config"
        );
    }

    #[test]
    fn new_change_is_open() {
        let change = ChangeSnapshot::new(7, "r", "main");
        assert!(change.status.is_open());
        assert_eq!(change.current_patch_set, PatchSetId::new(7, 1));
    }
}
