//! Checks Core Library
//!
//! Checker configuration management and merge gating on top of the
//! `checks-state` ref store:
//!
//! - [`CheckerStore`]: versioned checker configs, one ref per checker
//! - [`RepositoryIndex`]: repository → checker ids, batched note commits
//! - [`RefMigration`]: moves the index from its legacy ref
//! - [`QueryMatcher`]: checker applicability queries
//! - [`Checkers`]: facade keeping configs and index consistent
//! - [`CombinedStateAggregator`]: combined check state per patch set
//! - [`SubmitGate`]: submit verdict per change

pub mod checker_store;
pub mod checkers;
pub mod collaborators;
pub mod combined_state;
pub mod config;
pub mod document;
pub mod domain;
pub mod fakes;
pub mod obs;
pub mod query;
pub mod ref_migration;
pub mod refs;
pub mod repository_index;
pub mod submit_gate;
pub mod telemetry;

pub use checker_store::CheckerStore;
pub use checkers::Checkers;
pub use collaborators::{ChangeSource, CheckRecords};
pub use combined_state::{CombinedCheckState, CombinedStateAggregator};
pub use config::ChecksConfig;
pub use document::CheckerDocument;
pub use domain::{
    BlockingCondition, ChangeId, ChangeSnapshot, ChangeStatus, CheckKey, CheckRecord, CheckState,
    CheckerConfig, CheckerCreation, CheckerId, CheckerStatus, CheckerUpdate, ChecksError,
    FileChange, PatchSetId, Result, DEFAULT_QUERY,
};
pub use obs::{
    emit_checker_created, emit_checker_skipped, emit_checker_updated, emit_combined_state,
    emit_index_committed, emit_ref_migrated, emit_submit_evaluated,
};
pub use query::{CheckerQuery, QueryMatcher};
pub use ref_migration::RefMigration;
pub use repository_index::RepositoryIndex;
pub use submit_gate::{is_required, SubmitGate, SubmitRecord, SubmitRequirement, SubmitStatus};
pub use telemetry::init_tracing;
