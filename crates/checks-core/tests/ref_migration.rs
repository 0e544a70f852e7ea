//! Migration of the repository index from its legacy ref.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use checks_core::refs::{
    repository_note_key, LEGACY_REFS_META_CHECKERS, REFS_META_CHECKERS,
    REFS_TMP_CHECKER_MIGRATION,
};
use checks_core::{CheckerId, ChecksError, RefMigration, RepositoryIndex};
use checks_state::fakes::MemoryRefStore;
use checks_state::{Commit, ObjectId, PersonIdent, RefStore};

fn committer() -> PersonIdent {
    PersonIdent::new("Checks Server", "noreply@checks.local")
}

async fn index_commit(
    store: &MemoryRefStore,
    note: &str,
    parents: Vec<ObjectId>,
) -> ObjectId {
    let blob = store.put_object(note.as_bytes()).await.unwrap();
    let commit = Commit::new(
        parents,
        BTreeMap::from([(repository_note_key("repo"), blob)]),
        "Update checkers by repository",
        committer(),
    );
    store.put_commit(&commit).await.unwrap()
}

async fn set_ref(store: &MemoryRefStore, name: &str, tip: &ObjectId) {
    store.compare_and_swap(name, None, Some(tip)).await.unwrap();
}

async fn checkers_of_repo(store: &Arc<MemoryRefStore>) -> BTreeSet<String> {
    RepositoryIndex::load(store.clone(), committer())
        .await
        .unwrap()
        .get("repo")
        .await
        .unwrap()
        .into_iter()
        .map(|c: CheckerId| c.to_string())
        .collect()
}

#[tokio::test]
async fn moves_legacy_ref_to_canonical() {
    let store = Arc::new(MemoryRefStore::new());
    let tip = index_commit(&store, "test:a\n", vec![]).await;
    set_ref(&store, LEGACY_REFS_META_CHECKERS, &tip).await;
    assert_eq!(checkers_of_repo(&store).await, BTreeSet::from(["test:a".to_string()]));

    let moved = RefMigration::new(store.clone()).migrate().await.unwrap();

    assert!(moved);
    assert_eq!(store.read_ref(REFS_META_CHECKERS).await.unwrap(), Some(tip));
    assert_eq!(store.read_ref(LEGACY_REFS_META_CHECKERS).await.unwrap(), None);
    assert_eq!(store.read_ref(REFS_TMP_CHECKER_MIGRATION).await.unwrap(), None);
    assert_eq!(checkers_of_repo(&store).await, BTreeSet::from(["test:a".to_string()]));
}

#[tokio::test]
async fn second_run_is_a_noop() {
    let store = Arc::new(MemoryRefStore::new());
    let tip = index_commit(&store, "test:a\n", vec![]).await;
    set_ref(&store, LEGACY_REFS_META_CHECKERS, &tip).await;

    let migration = RefMigration::new(store.clone());
    assert!(migration.migrate().await.unwrap());
    assert!(!migration.migrate().await.unwrap());
    assert_eq!(store.read_ref(REFS_META_CHECKERS).await.unwrap(), Some(tip));
}

#[tokio::test]
async fn nothing_to_migrate() {
    let store = Arc::new(MemoryRefStore::new());
    assert!(!RefMigration::new(store.clone()).migrate().await.unwrap());

    let tip = index_commit(&store, "test:a\n", vec![]).await;
    set_ref(&store, REFS_META_CHECKERS, &tip).await;
    assert!(!RefMigration::new(store.clone()).migrate().await.unwrap());
    assert_eq!(store.read_ref(REFS_META_CHECKERS).await.unwrap(), Some(tip));
}

#[tokio::test]
async fn finishes_interrupted_migration() {
    let store = Arc::new(MemoryRefStore::new());
    let tip = index_commit(&store, "test:a\n", vec![]).await;
    set_ref(&store, REFS_TMP_CHECKER_MIGRATION, &tip).await;

    assert!(RefMigration::new(store.clone()).migrate().await.unwrap());

    assert_eq!(store.read_ref(REFS_META_CHECKERS).await.unwrap(), Some(tip));
    assert_eq!(store.read_ref(REFS_TMP_CHECKER_MIGRATION).await.unwrap(), None);
}

#[tokio::test]
async fn canonical_ref_ahead_of_legacy_keeps_its_history() {
    // A write after the fallback read put a descendant of the legacy tip on
    // the canonical ref.
    let store = Arc::new(MemoryRefStore::new());
    let legacy = index_commit(&store, "test:a\n", vec![]).await;
    set_ref(&store, LEGACY_REFS_META_CHECKERS, &legacy).await;
    let canonical = index_commit(&store, "test:a\ntest:b\n", vec![legacy.clone()]).await;
    set_ref(&store, REFS_META_CHECKERS, &canonical).await;

    assert!(RefMigration::new(store.clone()).migrate().await.unwrap());

    assert_eq!(store.read_ref(REFS_META_CHECKERS).await.unwrap(), Some(canonical));
    assert_eq!(store.read_ref(LEGACY_REFS_META_CHECKERS).await.unwrap(), None);
    assert_eq!(
        checkers_of_repo(&store).await,
        BTreeSet::from(["test:a".to_string(), "test:b".to_string()])
    );
}

#[tokio::test]
async fn unrelated_histories_fail_with_guidance() {
    let store = Arc::new(MemoryRefStore::new());
    let legacy = index_commit(&store, "test:a\n", vec![]).await;
    set_ref(&store, LEGACY_REFS_META_CHECKERS, &legacy).await;
    let canonical = index_commit(&store, "test:other\n", vec![]).await;
    set_ref(&store, REFS_META_CHECKERS, &canonical).await;

    let err = RefMigration::new(store.clone()).migrate().await.unwrap_err();

    match err {
        ChecksError::Migration(message) => {
            assert!(message.contains(REFS_META_CHECKERS));
            assert!(message.contains("rerun the migration"));
        }
        other => panic!("expected Migration error, got {other:?}"),
    }
    assert_eq!(store.read_ref(REFS_META_CHECKERS).await.unwrap(), Some(canonical));
    assert_eq!(
        store.read_ref(LEGACY_REFS_META_CHECKERS).await.unwrap(),
        Some(legacy)
    );
    assert_eq!(store.read_ref(REFS_TMP_CHECKER_MIGRATION).await.unwrap(), None);
}

#[tokio::test]
async fn index_left_on_temporary_ref_stays_readable() {
    let store = Arc::new(MemoryRefStore::new());
    let tip = index_commit(&store, "test:a\n", vec![]).await;
    set_ref(&store, REFS_TMP_CHECKER_MIGRATION, &tip).await;

    assert_eq!(checkers_of_repo(&store).await, BTreeSet::from(["test:a".to_string()]));
}

#[tokio::test]
async fn write_during_interrupted_migration_keeps_history() {
    let store = Arc::new(MemoryRefStore::new());
    let tip = index_commit(&store, "test:a\n", vec![]).await;
    set_ref(&store, REFS_TMP_CHECKER_MIGRATION, &tip).await;

    let mut index = RepositoryIndex::load(store.clone(), committer()).await.unwrap();
    index
        .insert(&CheckerId::parse("test:b").unwrap(), "repo")
        .await
        .unwrap();
    let written = index.commit().await.unwrap().unwrap();
    assert_eq!(store.get_commit(&written).await.unwrap().parent(), Some(&tip));

    assert!(RefMigration::new(store.clone()).migrate().await.unwrap());
    assert_eq!(store.read_ref(REFS_META_CHECKERS).await.unwrap(), Some(written));
    assert_eq!(store.read_ref(REFS_TMP_CHECKER_MIGRATION).await.unwrap(), None);
    assert_eq!(
        checkers_of_repo(&store).await,
        BTreeSet::from(["test:a".to_string(), "test:b".to_string()])
    );
}

#[tokio::test]
async fn legacy_migration_does_not_use_temporary_ref() {
    let store = Arc::new(MemoryRefStore::new());
    let tip = index_commit(&store, "test:a\n", vec![]).await;
    set_ref(&store, LEGACY_REFS_META_CHECKERS, &tip).await;

    RefMigration::new(store.clone()).migrate().await.unwrap();

    assert!(store
        .list_refs("refs/tmp/")
        .await
        .unwrap()
        .is_empty());
    assert_eq!(store.read_ref(REFS_META_CHECKERS).await.unwrap(), Some(tip));
}
