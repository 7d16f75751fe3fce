//! Integration tests for treesync
//!
//! These tests drive the scanner, differ and applier together against real
//! temporary directory trees.

use proptest::prelude::*;
use rstest::rstest;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use treesync_config::ConfigBuilder;
use treesync_sync::{
    diff, explain, is_sync_required, scan_blocking, RecordingSink, Scanner, SyncEngine,
    SyncOptions, SyncRequest,
};
use treesync_tests::test_utils::{populate, snapshot_dir, TestTree};
use treesync_types::{ActionKind, ErrorKind, WorkerCount};

fn options(delete_missing: bool, workers: usize) -> SyncOptions {
    SyncOptions {
        delete_missing,
        workers: WorkerCount::clamped(workers),
        ..SyncOptions::default()
    }
}

async fn remaining_actions(source: &Path, target: &Path) -> Vec<ActionKind> {
    let scanner = Scanner::new();
    let source = scanner.scan(source).await.unwrap();
    let target = scanner.scan(target).await.unwrap();
    diff(&source, &target).iter().map(|a| a.kind()).collect()
}

#[tokio::test]
async fn test_full_sync_converges() {
    let source = TestTree::new().unwrap();
    let target = TestTree::new().unwrap();
    populate(&source, 30).unwrap();
    target.write("level0/sub0/file0000.txt", b"outdated").unwrap();
    target.write("orphan.txt", b"only in target").unwrap();

    let engine = SyncEngine::new(options(true, 4));
    let report = engine
        .sync(&SyncRequest::new(source.path(), target.path()))
        .await
        .unwrap()
        .expect("changes were required");

    assert_eq!(report.total, 31);
    assert_eq!(report.copied, 30);
    assert_eq!(report.deleted, 1);
    assert!(report.is_clean());
    assert_eq!(source.snapshot().unwrap(), target.snapshot().unwrap());
    assert!(remaining_actions(source.path(), target.path()).await.is_empty());

    let again = engine
        .sync(&SyncRequest::new(source.path(), target.path()))
        .await
        .unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn test_same_names_in_different_directories_are_independent() {
    let source = TestTree::new().unwrap();
    let target = TestTree::new().unwrap();
    source.write("alpha/config.ini", b"alpha").unwrap();
    source.write("beta/config.ini", b"beta").unwrap();
    target.write("alpha/config.ini", b"alpha").unwrap();
    target.set_mtime("alpha/config.ini", 1, 0).unwrap();
    source.set_mtime("alpha/config.ini", 1, 0).unwrap();

    let actions = diff(
        &scan_blocking(source.path()).unwrap(),
        &scan_blocking(target.path()).unwrap(),
    );
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind(), ActionKind::Add);
    assert_eq!(actions[0].name(), Path::new("beta").join("config.ini"));

    SyncEngine::new(options(false, 2))
        .sync(&SyncRequest::new(source.path(), target.path()))
        .await
        .unwrap();

    assert_eq!(target.read("alpha/config.ini").unwrap(), b"alpha");
    assert_eq!(target.read("beta/config.ini").unwrap(), b"beta");
}

#[rstest]
#[case(2)]
#[case(8)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_size_does_not_change_result(#[case] workers: usize) {
    let source = TestTree::new().unwrap();
    let target = TestTree::new().unwrap();
    populate(&source, 64).unwrap();

    let sink = Arc::new(RecordingSink::new());
    let engine = SyncEngine::with_sink(options(false, workers), sink.clone());
    let plan = engine
        .plan(&SyncRequest::new(source.path(), target.path()))
        .await
        .unwrap();
    let report = engine.execute(plan).await.unwrap();

    assert_eq!(report.copied, 64);
    assert_eq!(snapshot_dir(source.path()).unwrap(), snapshot_dir(target.path()).unwrap());

    let completions = sink.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].completed, 64);
    assert_eq!(completions[0].percent(), 100.0);
}

#[rstest]
#[case(false, true)]
#[case(true, false)]
#[tokio::test]
async fn test_delete_missing_policy(#[case] delete_missing: bool, #[case] survives: bool) {
    let source = TestTree::new().unwrap();
    let target = TestTree::new().unwrap();
    source.write("f.txt", b"abc").unwrap();
    target.write("g.txt", b"g").unwrap();

    let engine = SyncEngine::new(options(delete_missing, 2));
    let plan = engine
        .plan(&SyncRequest::new(source.path(), target.path()))
        .await
        .unwrap();
    assert!(plan.is_sync_required());
    let report = engine.execute(plan).await.unwrap();

    assert_eq!(target.exists("g.txt"), survives);
    assert_eq!(target.read("f.txt").unwrap(), b"abc");
    assert_eq!(report.deleted, u64::from(!survives));
    assert_eq!(report.skipped, u64::from(survives));
}

#[test]
fn test_only_missing_requires_sync_only_with_delete() {
    let source = TestTree::new().unwrap();
    let target = TestTree::new().unwrap();
    target.write("g.txt", b"g").unwrap();

    let actions = diff(
        &scan_blocking(source.path()).unwrap(),
        &scan_blocking(target.path()).unwrap(),
    );

    assert!(!is_sync_required(false, &actions));
    assert!(is_sync_required(true, &actions));
    assert_eq!(explain(&actions), "=== Differences ===\nMissing: g.txt\n");
}

#[cfg(unix)]
#[tokio::test]
async fn test_permission_and_mtime_changes_are_synced() {
    use std::os::unix::fs::PermissionsExt;

    let source = TestTree::new().unwrap();
    let target = TestTree::new().unwrap();
    source.write_with_mode("script.sh", b"#!/bin/sh\n", 0o755).unwrap();
    source.set_mtime("script.sh", 1_650_000_000, 987_654_321).unwrap();
    target.write_with_mode("script.sh", b"#!/bin/sh\n", 0o644).unwrap();
    target.set_mtime("script.sh", 1_650_000_000, 987_654_321).unwrap();

    let engine = SyncEngine::new(options(false, 2));
    let plan = engine
        .plan(&SyncRequest::new(source.path(), target.path()))
        .await
        .unwrap();
    assert_eq!(plan.actions.len(), 1);
    assert!(plan
        .explain()
        .contains("  - Permissions changed: -rw-r--r-- → -rwxr-xr-x"));

    engine.execute(plan).await.unwrap();

    let metadata = std::fs::metadata(target.join("script.sh")).unwrap();
    assert_eq!(metadata.permissions().mode() & 0o7777, 0o755);
    assert!(remaining_actions(source.path(), target.path()).await.is_empty());
}

#[tokio::test]
async fn test_missing_source_is_a_fatal_scan_error() {
    let target = TestTree::new().unwrap();

    let error = SyncEngine::new(SyncOptions::default())
        .plan(&SyncRequest::new(target.join("absent"), target.path()))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Scan);
    assert!(error.is_fatal());
}

#[tokio::test]
async fn test_configured_options_drive_the_engine() {
    let source = TestTree::new().unwrap();
    let target = TestTree::new().unwrap();
    let config_dir = TestTree::new().unwrap();
    source.write("keep.txt", b"keep").unwrap();
    target.write("stale.txt", b"stale").unwrap();
    let config_path = config_dir
        .write("treesync.toml", b"[sync]\ndelete_missing = true\nworkers = 3\n")
        .unwrap();

    let config = ConfigBuilder::new()
        .add_defaults()
        .add_required_file(&config_path)
        .build()
        .unwrap();
    let options = SyncOptions::from(&config.sync);
    assert_eq!(options.workers.get(), 3);

    let report = SyncEngine::new(options)
        .sync(&SyncRequest::new(source.path(), target.path()))
        .await
        .unwrap()
        .expect("changes were required");

    assert_eq!(report.deleted, 1);
    assert!(!target.exists("stale.txt"));
    assert!(target.exists("keep.txt"));
}

fn arb_tree() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(
        "(left|right)/[a-c]\\.txt|[a-d]\\.bin",
        prop::collection::vec(any::<u8>(), 0..64),
        0..8,
    )
}

fn materialize(files: &BTreeMap<String, Vec<u8>>) -> TestTree {
    let tree = TestTree::new().unwrap();
    for (name, content) in files {
        tree.write(name, content).unwrap();
    }
    tree
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_random_trees_converge(
        source_files in arb_tree(),
        target_files in arb_tree(),
        delete_missing in any::<bool>(),
    ) {
        let source = materialize(&source_files);
        let target = materialize(&target_files);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let report = runtime
            .block_on(
                SyncEngine::new(options(delete_missing, 2))
                    .sync(&SyncRequest::new(source.path(), target.path())),
            )
            .unwrap();
        if let Some(report) = report {
            prop_assert!(report.is_clean());
        }

        let source_snapshot = source.snapshot().unwrap();
        let target_snapshot = target.snapshot().unwrap();
        for (name, content) in &source_snapshot {
            prop_assert_eq!(target_snapshot.get(name), Some(content));
        }
        for (name, content) in &target_snapshot {
            if !source_snapshot.contains_key(name) {
                prop_assert!(!delete_missing);
                let original = target_files.get(name.to_str().unwrap());
                prop_assert_eq!(original, Some(content));
            }
        }

        let remaining = diff(
            &scan_blocking(source.path()).unwrap(),
            &scan_blocking(target.path()).unwrap(),
        );
        prop_assert!(remaining.iter().all(|action| action.kind() == ActionKind::Missing));
        prop_assert!(!is_sync_required(delete_missing, &remaining));
        let leftover: Vec<PathBuf> = remaining.iter().map(|a| a.name().to_path_buf()).collect();
        prop_assert_eq!(leftover.is_empty(), delete_missing || target_snapshot == source_snapshot);
    }
}
