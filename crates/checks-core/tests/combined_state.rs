//! Combined check state of a patch set, end to end over the in-memory store.

use std::collections::BTreeMap;
use std::sync::Arc;

use checks_core::fakes::{MemoryChangeSource, MemoryCheckRecords};
use checks_core::refs::{checker_ref, CHECKER_CONFIG_FILE};
use checks_core::{
    ChangeSnapshot, ChangeStatus, CheckKey, CheckRecord, CheckState, CheckerCreation, CheckerId,
    CheckerStatus, Checkers, ChecksConfig, ChecksError, CombinedCheckState,
    CombinedStateAggregator, PatchSetId,
};
use checks_state::fakes::MemoryRefStore;
use checks_state::{Commit, PersonIdent, RefStore};

const REPO: &str = "platform/server";

struct Fixture {
    store: Arc<MemoryRefStore>,
    records: Arc<MemoryCheckRecords>,
    changes: Arc<MemoryChangeSource>,
    checkers: Checkers,
    aggregator: CombinedStateAggregator,
}

impl Fixture {
    fn new() -> Self {
        let config = ChecksConfig::default();
        let store = Arc::new(MemoryRefStore::new());
        let records = Arc::new(MemoryCheckRecords::new());
        let changes = Arc::new(MemoryChangeSource::new());
        Self {
            checkers: Checkers::new(store.clone(), &config),
            aggregator: CombinedStateAggregator::new(
                store.clone(),
                records.clone(),
                changes.clone(),
                &config,
            ),
            store,
            records,
            changes,
        }
    }

    /// An open change in `REPO` with `patch_sets` patch sets.
    fn change(&self, id: u64, patch_sets: u32) -> PatchSetId {
        let mut change = ChangeSnapshot::new(id, REPO, "main");
        change.current_patch_set = PatchSetId::new(id, patch_sets);
        self.changes.upsert(change);
        PatchSetId::new(id, patch_sets)
    }

    async fn checker(&self, id: &str, creation: CheckerCreation) -> CheckerId {
        self.checkers.create(id, creation).await.unwrap().id
    }

    fn record(&self, checker: &CheckerId, patch_set: PatchSetId, state: CheckState) {
        self.records.upsert(CheckRecord::new(
            CheckKey::new(REPO, patch_set, checker.clone()),
            state,
        ));
    }

    async fn combined(&self, patch_set: PatchSetId) -> CombinedCheckState {
        self.aggregator
            .combined_check_state(REPO, &patch_set)
            .await
            .unwrap()
    }
}

fn required() -> CheckerCreation {
    CheckerCreation::new(REPO).blocking()
}

// ---- core scenarios ----

#[tokio::test]
async fn no_checkers_is_not_relevant() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    assert_eq!(fx.combined(ps).await, CombinedCheckState::NotRelevant);
}

#[tokio::test]
async fn no_checkers_does_not_resolve_the_change() {
    let fx = Fixture::new();
    let unknown = PatchSetId::new(404, 1);
    assert_eq!(fx.combined(unknown).await, CombinedCheckState::NotRelevant);
}

#[tokio::test]
async fn missing_record_of_enabled_checker_is_in_progress() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    fx.checker("ci:build", required()).await;
    assert_eq!(fx.combined(ps).await, CombinedCheckState::InProgress);
    assert!(fx.records.is_empty());
}

#[tokio::test]
async fn failure_wins_over_success() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    let build = fx.checker("ci:build", required()).await;
    let lint = fx.checker("ci:lint", required()).await;
    fx.record(&build, ps, CheckState::Successful);
    fx.record(&lint, ps, CheckState::Failed);
    assert_eq!(fx.combined(ps).await, CombinedCheckState::Failed);
}

#[tokio::test]
async fn disabled_checker_with_success_counts() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    let checker = fx
        .checker(
            "ci:build",
            CheckerCreation::new(REPO).with_status(CheckerStatus::Disabled),
        )
        .await;
    fx.record(&checker, ps, CheckState::Successful);
    assert_eq!(fx.combined(ps).await, CombinedCheckState::Successful);
}

#[tokio::test]
async fn failure_of_inapplicable_checker_is_a_warning() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    let checker = fx
        .checker("ci:post-merge", required().with_query("status:merged"))
        .await;
    fx.record(&checker, ps, CheckState::Failed);
    assert_eq!(fx.combined(ps).await, CombinedCheckState::Warning);
}

// ---- edge cases ----

#[tokio::test]
async fn inapplicable_checker_without_record_is_ignored() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    fx.checker("ci:post-merge", required().with_query("status:merged"))
        .await;
    let build = fx.checker("ci:build", required()).await;
    fx.record(&build, ps, CheckState::Successful);
    assert_eq!(fx.combined(ps).await, CombinedCheckState::Successful);
}

#[tokio::test]
async fn inapplicable_not_relevant_record_stays_not_relevant() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    let checker = fx
        .checker("ci:post-merge", required().with_query("status:merged"))
        .await;
    fx.record(&checker, ps, CheckState::NotRelevant);
    assert_eq!(fx.combined(ps).await, CombinedCheckState::NotRelevant);
}

#[tokio::test]
async fn optional_failure_is_a_warning() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    let checker = fx.checker("ci:coverage", CheckerCreation::new(REPO)).await;
    fx.record(&checker, ps, CheckState::Failed);
    assert_eq!(fx.combined(ps).await, CombinedCheckState::Warning);
}

#[tokio::test]
async fn running_check_is_in_progress() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    let build = fx.checker("ci:build", required()).await;
    let lint = fx.checker("ci:lint", required()).await;
    fx.record(&build, ps, CheckState::Successful);
    fx.record(&lint, ps, CheckState::Running);
    assert_eq!(fx.combined(ps).await, CombinedCheckState::InProgress);
}

#[tokio::test]
async fn disabled_checker_is_not_backfilled() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    fx.checker(
        "ci:build",
        required().with_status(CheckerStatus::Disabled),
    )
    .await;
    assert_eq!(fx.combined(ps).await, CombinedCheckState::NotRelevant);
}

#[tokio::test]
async fn old_patch_set_is_not_backfilled() {
    let fx = Fixture::new();
    fx.change(1, 2);
    let old = PatchSetId::new(1, 1);
    let current = PatchSetId::new(1, 2);
    fx.checker("ci:build", required()).await;

    assert_eq!(fx.combined(old).await, CombinedCheckState::NotRelevant);
    assert_eq!(fx.combined(current).await, CombinedCheckState::InProgress);
}

#[tokio::test]
async fn checker_of_another_repository_is_not_counted() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    fx.checker("ci:other", CheckerCreation::new("platform/web").blocking())
        .await;
    assert_eq!(fx.combined(ps).await, CombinedCheckState::NotRelevant);
}

#[tokio::test]
async fn unevaluable_query_is_a_warning() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    // Written through the config store, bypassing query validation.
    let checker = CheckerId::parse("ci:legacy").unwrap();
    fx.checkers
        .config_store()
        .create(&checker, &required().with_query("is:open"))
        .await
        .unwrap();
    let mut index = checks_core::RepositoryIndex::load(
        fx.store.clone(),
        ChecksConfig::default().committer(),
    )
    .await
    .unwrap();
    index.insert(&checker, REPO).await.unwrap();
    index.commit().await.unwrap();
    fx.record(&checker, ps, CheckState::Successful);

    assert_eq!(fx.combined(ps).await, CombinedCheckState::Warning);
}

#[tokio::test]
async fn broken_checker_is_skipped() {
    let fx = Fixture::new();
    let ps = fx.change(1, 1);
    let build = fx.checker("ci:build", required()).await;
    let broken = fx.checker("ci:broken", required()).await;
    fx.record(&build, ps, CheckState::Successful);

    let blob = fx.store.put_object(b"[checker]\n").await.unwrap();
    let commit = Commit::new(
        vec![],
        BTreeMap::from([(CHECKER_CONFIG_FILE.to_string(), blob)]),
        "Break checker",
        PersonIdent::new("n", "e@x"),
    );
    let tip = fx.store.put_commit(&commit).await.unwrap();
    let current = fx.store.read_ref(&checker_ref(&broken)).await.unwrap();
    fx.store
        .compare_and_swap(&checker_ref(&broken), current.as_ref(), Some(&tip))
        .await
        .unwrap();

    assert_eq!(fx.combined(ps).await, CombinedCheckState::Successful);
}

#[tokio::test]
async fn merged_change_with_default_query() {
    let fx = Fixture::new();
    let mut change = ChangeSnapshot::new(1, REPO, "main").with_status(ChangeStatus::Merged);
    change.current_patch_set = PatchSetId::new(1, 1);
    fx.changes.upsert(change);
    let ps = PatchSetId::new(1, 1);
    fx.checker("ci:build", required()).await;

    // Not applicable and no record: contributes nothing.
    assert_eq!(fx.combined(ps).await, CombinedCheckState::NotRelevant);
}

#[tokio::test]
async fn unknown_patch_set_is_not_found() {
    let fx = Fixture::new();
    fx.change(1, 1);
    fx.checker("ci:build", required()).await;

    let err = fx
        .aggregator
        .combined_check_state(REPO, &PatchSetId::new(1, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, ChecksError::NotFound(_)));
}
