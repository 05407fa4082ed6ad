//! Integration tests for transactions over both snapshot providers.

use snaptx_core::{CommitOutcome, CoreError, RollbackOutcome, TransactionState};
use snaptx_snapshot::SnapshotProvider;
use snaptx_testkit::{scenarios, ProviderKind, TestVolume};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn directory_commit_updates_live_file() {
    let volume = TestVolume::directory();
    volume.write_live("test.txt", "v0");

    let mut tx = volume.begin().unwrap();
    assert_eq!(tx.read_to_string(volume.path("test.txt")).unwrap(), "v0");
    tx.write(volume.path("test.txt"), "v1").unwrap();

    assert_eq!(tx.commit().unwrap(), CommitOutcome::Committed);
    assert_eq!(volume.read_live("test.txt").as_deref(), Some("v1"));
    assert_eq!(volume.working_areas(), 0);
}

#[test]
fn directory_conflict_rolls_back_whole_volume() {
    let volume = TestVolume::directory();
    volume.write_live("test.txt", "v0");

    let mut a = volume.begin().unwrap();
    a.write(volume.path("test.txt"), "A").unwrap();
    let mut b = volume.begin().unwrap();
    b.write(volume.path("test.txt"), "B").unwrap();

    assert!(a.commit().unwrap().is_committed());
    assert_eq!(volume.read_live("test.txt").as_deref(), Some("A"));

    match b.commit().unwrap() {
        CommitOutcome::Conflict { path, rollback } => {
            assert!(path.ends_with("test.txt"));
            assert_eq!(rollback, RollbackOutcome::Restored);
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    // B's snapshot predates A's commit, so the rollback undoes it too.
    assert_eq!(volume.read_live("test.txt").as_deref(), Some("v0"));
}

#[test]
fn directory_rollback_reverts_untracked_changes() {
    let volume = TestVolume::directory();
    volume.write_live("tracked.txt", "t0");

    let mut tx = volume.begin().unwrap();
    tx.write(volume.path("tracked.txt"), "t1").unwrap();
    volume.write_live("other.txt", "written outside");

    assert_eq!(tx.rollback().unwrap(), RollbackOutcome::Restored);
    assert_eq!(volume.read_live("tracked.txt").as_deref(), Some("t0"));
    assert_eq!(volume.read_live("other.txt"), None);
}

#[test]
fn directory_rollback_discards_newer_snapshots() {
    let volume = TestVolume::directory();
    volume.write_live("test.txt", "v0");

    let mut older = volume.begin().unwrap();
    let mut newer = volume.begin().unwrap();

    assert_eq!(older.rollback().unwrap(), RollbackOutcome::Restored);
    assert!(!volume.provider().snapshot_exists(newer.snapshot()).unwrap());
    assert_eq!(newer.rollback().unwrap(), RollbackOutcome::SnapshotMissing);
    assert_eq!(newer.state(), TransactionState::RolledBack);
}

#[test]
fn memory_conflict_keeps_winner() {
    let volume = TestVolume::in_memory();
    volume.write_live("test.txt", "v0");

    let mut a = volume.begin().unwrap();
    a.write(volume.path("test.txt"), "A").unwrap();
    let mut b = volume.begin().unwrap();
    b.write(volume.path("test.txt"), "B").unwrap();

    assert!(a.commit().unwrap().is_committed());
    assert!(b.commit().unwrap().is_conflict());
    assert_eq!(volume.read_live("test.txt").as_deref(), Some("A"));
    assert_eq!(
        volume.memory_provider().unwrap().rollbacks(),
        vec![b.snapshot().clone()]
    );
}

#[test]
fn racing_commits_exactly_one_wins() {
    let volume = Arc::new(TestVolume::in_memory());
    volume.write_live("shared.txt", "v0");
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["left", "right"]
        .into_iter()
        .map(|label| {
            let volume = Arc::clone(&volume);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut tx = volume.begin().unwrap();
                let current = tx.read_to_string(volume.path("shared.txt")).unwrap();
                tx.write(volume.path("shared.txt"), format!("{current}{label}\n"))
                    .unwrap();
                barrier.wait();
                (label, tx.commit().unwrap())
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .collect();
    let winners: Vec<_> = results
        .iter()
        .filter(|(_, outcome)| outcome.is_committed())
        .map(|(label, _)| *label)
        .collect();

    assert_eq!(winners.len(), 1);
    assert_eq!(
        volume.read_live("shared.txt"),
        Some(format!("v0{}\n", winners[0]))
    );
    assert_eq!(volume.working_areas(), 0);
}

fn disjoint_writers_overlap_and_commit(volume: TestVolume) {
    let volume = Arc::new(volume);
    volume.write_live("first.txt", "1");
    volume.write_live("second.txt", "2");
    let begun = Arc::new(Barrier::new(2));
    let written = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [("first.txt", "one"), ("second.txt", "two")]
        .into_iter()
        .map(|(name, contents)| {
            let volume = Arc::clone(&volume);
            let begun = Arc::clone(&begun);
            let written = Arc::clone(&written);
            thread::spawn(move || {
                let mut tx = volume.begin().unwrap();
                begun.wait();
                tx.write(volume.path(name), contents).unwrap();
                written.wait();
                tx.commit().unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().expect("Thread panicked").is_committed());
    }
    assert_eq!(volume.read_live("first.txt").as_deref(), Some("one"));
    assert_eq!(volume.read_live("second.txt").as_deref(), Some("two"));
    assert_eq!(volume.working_areas(), 0);
}

#[test]
fn memory_disjoint_concurrent_commits() {
    disjoint_writers_overlap_and_commit(TestVolume::in_memory());
}

#[test]
fn directory_disjoint_concurrent_commits() {
    disjoint_writers_overlap_and_commit(TestVolume::directory());
}

#[test]
fn rollback_provider_failure_still_ends_transaction() {
    let volume = TestVolume::in_memory();
    volume.write_live("test.txt", "v0");
    volume.memory_provider().unwrap().set_fail_rollback(true);

    let mut tx = volume.begin().unwrap();
    tx.write(volume.path("test.txt"), "x").unwrap();
    let outcome = tx.rollback().unwrap();

    assert!(outcome.is_provider_failure());
    assert_eq!(tx.state(), TransactionState::RolledBack);
    assert_eq!(volume.working_areas(), 0);
}

#[test]
fn finished_transactions_reject_operations() {
    let volume = TestVolume::in_memory();
    volume.write_live("test.txt", "v0");

    let mut tx = volume.begin().unwrap();
    tx.commit().unwrap();

    assert!(tx.commit().unwrap_err().is_invalid_state());
    assert!(tx.rollback().unwrap_err().is_invalid_state());
    assert!(matches!(
        tx.read(volume.path("test.txt")),
        Err(CoreError::InvalidState { .. })
    ));
}

#[test]
fn snapshot_destroyed_on_commit_when_configured() {
    let volume = TestVolume::with_config(ProviderKind::InMemory, |config| {
        config.destroy_snapshot_on_commit(true)
    });
    volume.write_live("test.txt", "v0");

    let mut tx = volume.begin().unwrap();
    tx.write(volume.path("test.txt"), "v1").unwrap();
    tx.commit().unwrap();

    assert!(volume.memory_provider().unwrap().snapshots().is_empty());
}

#[test]
fn scenarios_leave_no_working_areas() {
    for kind in [ProviderKind::InMemory, ProviderKind::Directory] {
        let volume = TestVolume::with_config(kind, |config| config);
        volume.write_live("test.txt", "v0\n");

        let report =
            scenarios::sequential_conflict(&volume, &volume.path("test.txt")).unwrap();

        assert!(report.first.committed);
        assert!(!report.second.committed);
        assert_eq!(volume.working_areas(), 0);
    }
}
