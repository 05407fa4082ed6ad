//! In-memory snapshot provider for testing.

use crate::error::{SnapshotError, SnapshotResult};
use crate::provider::{SnapshotProvider, SnapshotRef};
use parking_lot::RwLock;

/// Volume name used by [`InMemorySnapshotProvider::default`].
pub const MEMORY_VOLUME: &str = "memory/volume";

#[derive(Debug, Default)]
struct MemoryState {
    /// Live snapshots in creation order.
    snapshots: Vec<SnapshotRef>,
    /// Every snapshot that was actually rolled back to.
    rollbacks: Vec<SnapshotRef>,
    fail_create: bool,
    fail_rollback: bool,
}

/// A snapshot provider that only records what it is asked to do.
///
/// This provider never touches a real volume: rolling back leaves every
/// file untouched. It is suitable for:
/// - Testing the transaction state machine in isolation
/// - Injecting provider failures (`fail_create`, `fail_rollback`)
///
/// Rollback mirrors `zfs rollback -r`: snapshots newer than the target are
/// discarded.
///
/// # Example
///
/// ```rust
/// use snaptx_snapshot::{InMemorySnapshotProvider, SnapshotProvider};
///
/// let provider = InMemorySnapshotProvider::new("tank/data");
/// let snap = provider.create_snapshot("1-100").unwrap();
/// assert!(provider.snapshot_exists(&snap).unwrap());
/// provider.rollback_to_snapshot(&snap).unwrap();
/// assert_eq!(provider.rollbacks(), vec![snap]);
/// ```
#[derive(Debug)]
pub struct InMemorySnapshotProvider {
    volume: String,
    state: RwLock<MemoryState>,
}

impl Default for InMemorySnapshotProvider {
    fn default() -> Self {
        Self::new(MEMORY_VOLUME)
    }
}

impl InMemorySnapshotProvider {
    /// Creates a provider for the named volume.
    #[must_use]
    pub fn new(volume: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// Returns the live snapshots in creation order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<SnapshotRef> {
        self.state.read().snapshots.clone()
    }

    /// Returns every snapshot that was rolled back to, in order.
    #[must_use]
    pub fn rollbacks(&self) -> Vec<SnapshotRef> {
        self.state.read().rollbacks.clone()
    }

    /// Makes subsequent `create_snapshot` calls fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.state.write().fail_create = fail;
    }

    /// Makes subsequent `rollback_to_snapshot` calls on existing snapshots fail.
    pub fn set_fail_rollback(&self, fail: bool) {
        self.state.write().fail_rollback = fail;
    }

    /// Drops a snapshot without rolling back, as if it had expired.
    pub fn forget(&self, snapshot: &SnapshotRef) {
        self.state.write().snapshots.retain(|s| s != snapshot);
    }
}

impl SnapshotProvider for InMemorySnapshotProvider {
    fn volume(&self) -> &str {
        &self.volume
    }

    fn create_snapshot(&self, transaction_id: &str) -> SnapshotResult<SnapshotRef> {
        let mut state = self.state.write();
        if state.fail_create {
            return Err(SnapshotError::unavailable("snapshot creation disabled"));
        }

        let snapshot = SnapshotRef::for_transaction(&self.volume, transaction_id);
        if state.snapshots.contains(&snapshot) {
            return Err(SnapshotError::CommandFailed {
                command: format!("snapshot {snapshot}"),
                code: Some(1),
                output: format!("'{snapshot}': dataset already exists"),
            });
        }
        state.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    fn rollback_to_snapshot(&self, snapshot: &SnapshotRef) -> SnapshotResult<()> {
        let mut state = self.state.write();
        let Some(position) = state.snapshots.iter().position(|s| s == snapshot) else {
            return Ok(());
        };
        if state.fail_rollback {
            return Err(SnapshotError::CommandFailed {
                command: format!("rollback -r {snapshot}"),
                code: Some(1),
                output: "rollback disabled".to_string(),
            });
        }

        state.snapshots.truncate(position + 1);
        state.rollbacks.push(snapshot.clone());
        Ok(())
    }

    fn snapshot_exists(&self, snapshot: &SnapshotRef) -> SnapshotResult<bool> {
        Ok(self.state.read().snapshots.contains(snapshot))
    }

    fn destroy_snapshot(&self, snapshot: &SnapshotRef) -> SnapshotResult<()> {
        let mut state = self.state.write();
        let before = state.snapshots.len();
        state.snapshots.retain(|s| s != snapshot);
        if state.snapshots.len() == before {
            return Err(SnapshotError::NotFound(snapshot.to_string()));
        }
        Ok(())
    }
}
