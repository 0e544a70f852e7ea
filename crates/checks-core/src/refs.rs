//! Ref names used by the checks store.

use checks_state::sha256_hex;

use crate::domain::CheckerId;

/// Prefix of all checker config refs.
pub const REFS_CHECKERS: &str = "refs/checkers/";

/// Canonical ref of the repository index.
pub const REFS_META_CHECKERS: &str = "refs/meta/checkers";

/// Where the repository index lived before migration.
pub const LEGACY_REFS_META_CHECKERS: &str = "refs/meta/checkers/";

/// Temporary ref holding the index while it is being migrated.
pub const REFS_TMP_CHECKER_MIGRATION: &str = "refs/tmp/checker-migration";

/// File holding a checker's config in its commit tree.
pub const CHECKER_CONFIG_FILE: &str = "checker.config";

/// Ref of a checker: `refs/checkers/<scheme>/<hh>/<sha256(name)>`.
///
/// The two-character shard keeps any single directory of refs small.
pub fn checker_ref(id: &CheckerId) -> String {
    let digest = sha256_hex(id.name().as_bytes());
    format!("{}{}/{}/{}", REFS_CHECKERS, id.scheme(), &digest[..2], digest)
}

/// Note key of a repository in the index.
pub fn repository_note_key(repository: &str) -> String {
    sha256_hex(repository.as_bytes())
}
