//! Domain models for checks.
//!
//! Canonical definitions for the core entities:
//! - `CheckerId`: immutable `scheme:name` identifier
//! - `CheckerConfig`: a loaded checker and its creation/update inputs
//! - `CheckRecord`: a reported result for one checker on one patch set
//! - `ChangeSnapshot`: the change data queries are evaluated against

pub mod change;
pub mod check;
pub mod checker;
pub mod checker_id;
pub mod error;

// Re-export main types and errors
pub use change::{ChangeSnapshot, ChangeStatus, FileChange};
pub use check::{ChangeId, CheckKey, CheckRecord, CheckState, PatchSetId};
pub use checker::{
    BlockingCondition, CheckerConfig, CheckerCreation, CheckerStatus, CheckerUpdate,
    DEFAULT_QUERY,
};
pub use checker_id::CheckerId;
pub use error::{ChecksError, Result};
