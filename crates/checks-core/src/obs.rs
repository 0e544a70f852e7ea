//! Structured observability hooks for checker and gating events.
//!
//! Emission functions for the writes that form the audit trail (checker
//! created/updated, index committed, ref migrated) and for the derived
//! verdicts (combined state, submit evaluation).
//!
//! Events are emitted at `info!` level (configurable via `CHECKS_LOG` env var).
//! For JSON output, set `CHECKS_LOG_FORMAT=json`.

use tracing::{info, warn};

/// Emit event: checker created.
///
/// # Example
///
/// ```ignore
/// emit_checker_created("test:lint", "my/repo", "3f2a…");
/// // logs: event=checker.created checker=test:lint repository=my/repo commit=3f2a…
/// ```
pub fn emit_checker_created(checker: &str, repository: &str, commit: &str) {
    info!(
        event = "checker.created",
        checker = %checker,
        repository = %repository,
        commit = %commit,
    );
}

/// Emit event: checker config rewritten.
pub fn emit_checker_updated(checker: &str, commit: &str, attempt: u32) {
    info!(
        event = "checker.updated",
        checker = %checker,
        commit = %commit,
        attempt = attempt,
    );
}

/// Emit event: repository index commit published.
pub fn emit_index_committed(ref_name: &str, commit: &str, mutations: usize) {
    info!(
        event = "index.committed",
        ref_name = %ref_name,
        commit = %commit,
        mutations = mutations,
    );
}

/// Emit event: a ref was renamed during migration.
pub fn emit_ref_migrated(from: &str, to: &str) {
    info!(event = "ref.migrated", from = %from, to = %to);
}

/// Emit event: a checker was left out of a computation (warning level).
pub fn emit_checker_skipped(checker: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "checker.skipped", checker = %checker, reason = %reason);
}

/// Emit event: combined check state computed for a patch set.
pub fn emit_combined_state(repository: &str, patch_set: &str, state: &str, contributions: usize) {
    info!(
        event = "combined_state.computed",
        repository = %repository,
        patch_set = %patch_set,
        state = %state,
        contributions = contributions,
    );
}

/// Emit event: submit rule evaluated for a change.
pub fn emit_submit_evaluated(change: &str, status: &str) {
    info!(event = "submit.evaluated", change = %change, status = %status);
}
