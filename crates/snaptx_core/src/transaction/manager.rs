//! Transaction manager.

use crate::config::Config;
use crate::error::CoreResult;
use crate::transaction::state::Transaction;
use crate::transaction::working_area::WorkingArea;
use crate::types::TransactionId;
use parking_lot::Mutex;
use snaptx_snapshot::SnapshotProvider;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Issues transactions bound to one snapshot provider.
///
/// The transaction manager provides:
/// - Unique transaction ids (atomic counter + wall clock)
/// - A volume snapshot per transaction, taken at begin
/// - A private working area per transaction
///
/// The manager is a plain service value: build one and share it by
/// reference or `Arc` between threads. Snapshot creation is never done
/// under a manager-wide lock, so concurrent `begin` calls only serialize
/// as much as the snapshot facility itself does.
///
/// ## Commit Gate
///
/// With [`Config::serialize_commits`] enabled, every transaction validates
/// and applies under a shared gate, so no other commit can slip between a
/// transaction's validation and its apply. Rollbacks happen after the gate
/// is released.
pub struct TransactionManager {
    /// Volume snapshots.
    provider: Arc<dyn SnapshotProvider>,
    /// Manager configuration.
    config: Config,
    /// Next transaction counter.
    next_txid: AtomicU64,
    /// Shared validate+apply gate.
    commit_gate: Arc<Mutex<()>>,
}

impl TransactionManager {
    /// Creates a new transaction manager.
    pub fn new(provider: Arc<dyn SnapshotProvider>, config: Config) -> Self {
        Self {
            provider,
            config,
            next_txid: AtomicU64::new(1),
            commit_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Creates a transaction manager with the default configuration.
    pub fn with_defaults(provider: Arc<dyn SnapshotProvider>) -> Self {
        Self::new(provider, Config::default())
    }

    /// Begins a new transaction.
    ///
    /// Takes a snapshot of the volume tagged with the new transaction id and
    /// creates the transaction's working area.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Snapshot`] if the snapshot cannot be
    /// created, or an I/O error if the working area cannot be created (the
    /// snapshot is then destroyed again).
    pub fn begin(&self) -> CoreResult<Transaction> {
        let id = TransactionId::new(
            self.next_txid.fetch_add(1, Ordering::SeqCst),
            now_millis(),
        );

        let snapshot = self.provider.create_snapshot(&id.to_string())?;

        let working_area = match WorkingArea::create(&self.config.working_root, id) {
            Ok(area) => area,
            Err(err) => {
                if let Err(destroy_err) = self.provider.destroy_snapshot(&snapshot) {
                    warn!(%id, %snapshot, error = %destroy_err, "failed to release snapshot");
                }
                return Err(err.into());
            }
        };

        info!(%id, %snapshot, working_area = %working_area.path().display(), "transaction started");

        let gate = self
            .config
            .serialize_commits
            .then(|| Arc::clone(&self.commit_gate));

        Ok(Transaction::new(
            id,
            snapshot,
            Arc::clone(&self.provider),
            working_area,
            gate,
            self.config.destroy_snapshot_on_commit,
        ))
    }

    /// Returns the number of transaction ids handed out so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next_txid.load(Ordering::SeqCst) - 1
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the snapshot provider.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn SnapshotProvider> {
        &self.provider
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("volume", &self.provider.volume())
            .field("config", &self.config)
            .field("issued", &self.issued())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::transaction::{CommitOutcome, TransactionState};
    use snaptx_snapshot::InMemorySnapshotProvider;
    use std::collections::HashSet;
    use std::fs;
    use std::thread;
    use tempfile::{tempdir, TempDir};

    fn create_manager() -> (TempDir, Arc<InMemorySnapshotProvider>, TransactionManager) {
        let dir = tempdir().unwrap();
        let provider = Arc::new(InMemorySnapshotProvider::new("tank/data"));
        let config = Config::new().working_root(dir.path().join("work"));
        let tm = TransactionManager::new(provider.clone(), config);
        (dir, provider, tm)
    }

    #[test]
    fn begin_creates_transaction() {
        let (_dir, provider, tm) = create_manager();
        let mut txn = tm.begin().unwrap();

        assert!(txn.is_active());
        assert_eq!(txn.id().counter(), 1);
        assert_eq!(tm.issued(), 1);
        assert_eq!(
            txn.snapshot().as_str(),
            format!("tank/data@tx_{}", txn.id())
        );
        assert_eq!(provider.snapshots(), vec![txn.snapshot().clone()]);
        assert!(txn
            .working_dir()
            .ends_with(format!("tx_{}", txn.id())));
        txn.rollback().unwrap();
    }

    #[test]
    fn begin_fails_when_snapshot_fails() {
        let (_dir, provider, tm) = create_manager();
        provider.set_fail_create(true);

        let err = tm.begin().unwrap_err();
        assert!(matches!(err, CoreError::Snapshot(_)));
    }

    #[test]
    fn begin_releases_snapshot_when_working_area_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();
        let provider = Arc::new(InMemorySnapshotProvider::default());
        let tm = TransactionManager::new(provider.clone(), Config::new().working_root(&blocker));

        let err = tm.begin().unwrap_err();

        assert!(matches!(err, CoreError::Io(_)));
        assert!(provider.snapshots().is_empty());
    }

    #[test]
    fn ids_are_sequential() {
        let (_dir, _provider, tm) = create_manager();
        let mut a = tm.begin().unwrap();
        let mut b = tm.begin().unwrap();

        assert_eq!(b.id().counter(), a.id().counter() + 1);
        a.rollback().unwrap();
        b.rollback().unwrap();
    }

    #[test]
    fn concurrent_begin_gives_unique_ids() {
        let (_dir, _provider, tm) = create_manager();
        let tm = Arc::new(tm);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tm = Arc::clone(&tm);
                thread::spawn(move || {
                    (0..25)
                        .map(|_| {
                            let mut txn = tm.begin().unwrap();
                            let counter = txn.id().counter();
                            txn.rollback().unwrap();
                            counter
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for counter in handle.join().unwrap() {
                assert!(seen.insert(counter), "duplicate id {counter}");
            }
        }
        assert_eq!(seen.len(), 200);
        assert_eq!(tm.issued(), 200);
    }

    #[test]
    fn scenario_no_conflict() {
        let (dir, _provider, tm) = create_manager();
        let path = dir.path().join("test.txt");
        fs::write(&path, "v0").unwrap();

        let mut txn = tm.begin().unwrap();
        assert_eq!(txn.read_to_string(&path).unwrap(), "v0");
        txn.write(&path, "v1").unwrap();

        assert_eq!(txn.commit().unwrap(), CommitOutcome::Committed);
        assert_eq!(fs::read_to_string(&path).unwrap(), "v1");
        assert!(!txn.working_dir().exists());
    }

    #[test]
    fn scenario_sequential_conflict() {
        let (dir, provider, tm) = create_manager();
        let path = dir.path().join("test.txt");
        fs::write(&path, "v0").unwrap();

        let mut a = tm.begin().unwrap();
        assert_eq!(a.read_to_string(&path).unwrap(), "v0");
        a.write(&path, "A").unwrap();

        let mut b = tm.begin().unwrap();
        assert_eq!(b.read_to_string(&path).unwrap(), "v0");
        b.write(&path, "B").unwrap();

        assert!(a.commit().unwrap().is_committed());
        assert_eq!(fs::read_to_string(&path).unwrap(), "A");

        assert!(b.commit().unwrap().is_conflict());
        assert_eq!(b.state(), TransactionState::RolledBack);
        // The in-memory provider restores nothing, so A's change survives.
        assert_eq!(fs::read_to_string(&path).unwrap(), "A");
        assert_eq!(provider.rollbacks(), vec![b.snapshot().clone()]);
    }

    #[test]
    fn scenario_delete() {
        let (dir, _provider, tm) = create_manager();
        let path = dir.path().join("test.txt");
        fs::write(&path, "v0").unwrap();

        let mut txn = tm.begin().unwrap();
        txn.read(&path).unwrap();
        txn.delete(&path).unwrap();

        assert!(txn.commit().unwrap().is_committed());
        assert!(!path.exists());
    }

    #[test]
    fn scenario_disjoint_files_both_commit() {
        let (dir, _provider, tm) = create_manager();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        fs::write(&first, "1").unwrap();
        fs::write(&second, "2").unwrap();

        let mut a = tm.begin().unwrap();
        let mut b = tm.begin().unwrap();
        b.write(&second, "b").unwrap();
        a.write(&first, "a").unwrap();

        assert!(b.commit().unwrap().is_committed());
        assert!(a.commit().unwrap().is_committed());
        assert_eq!(fs::read_to_string(&first).unwrap(), "a");
        assert_eq!(fs::read_to_string(&second).unwrap(), "b");
    }

    #[test]
    fn untouched_files_are_not_altered() {
        let (dir, _provider, tm) = create_manager();
        let touched = dir.path().join("touched.txt");
        let other = dir.path().join("other.txt");
        fs::write(&other, "keep").unwrap();
        let before = crate::Fingerprint::of_file(&other).unwrap();

        let mut txn = tm.begin().unwrap();
        txn.write(&touched, "x").unwrap();
        txn.commit().unwrap();

        let mut txn = tm.begin().unwrap();
        txn.write(&touched, "y").unwrap();
        txn.rollback().unwrap();

        assert_eq!(crate::Fingerprint::of_file(&other).unwrap(), before);
    }

    #[test]
    fn unserialized_commits_still_detect_conflicts() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(InMemorySnapshotProvider::default());
        let config = Config::new()
            .working_root(dir.path().join("work"))
            .serialize_commits(false);
        let tm = TransactionManager::new(provider, config);
        let path = dir.path().join("test.txt");
        fs::write(&path, "v0").unwrap();

        let mut a = tm.begin().unwrap();
        let mut b = tm.begin().unwrap();
        a.write(&path, "A").unwrap();
        b.write(&path, "B").unwrap();

        assert!(a.commit().unwrap().is_committed());
        assert!(b.commit().unwrap().is_conflict());
    }

    #[test]
    fn debug_output() {
        let (_dir, _provider, tm) = create_manager();
        let debug = format!("{tm:?}");
        assert!(debug.contains("tank/data"));
        assert!(debug.contains("issued"));
    }
}
