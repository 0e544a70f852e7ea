//! Checks-State: ref-based object store for checker configuration
//!
//! This crate provides the persistence substrate for checker configs and the
//! repository index. It handles all I/O with the backing database.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: content addressing, atomic ref updates, historical reads.
//!
//! ## Key Components
//!
//! - `RefStore`: objects by content id, commits, refs moved by compare-and-swap
//! - `MemoryRefStore`: in-memory fake for tests
//! - `SurrealRefStore`: SurrealDB backend (`mem://`, SurrealKV, or remote)

pub mod connection;
mod error;
pub mod fakes;
mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_refs;

pub use error::StorageError;
pub use schema::{ObjectRecord, RefRecord};
pub use storage_traits::{
    sha256_hex, validate_ref_name, Commit, ObjectId, PersonIdent, RefStore, StorageResult,
};
pub use surreal_refs::SurrealRefStore;
