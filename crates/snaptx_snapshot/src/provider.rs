//! Snapshot provider trait definition.

use crate::error::SnapshotResult;
use std::fmt;

/// Reference to a volume snapshot, of the form `<volume>@tx_<transaction id>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotRef(String);

impl SnapshotRef {
    /// Builds the reference for the snapshot taken at the start of a transaction.
    #[must_use]
    pub fn for_transaction(volume: &str, transaction_id: &str) -> Self {
        Self(format!("{volume}@tx_{transaction_id}"))
    }

    /// Wraps an existing snapshot reference.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the full reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the volume part (before `@`).
    #[must_use]
    pub fn volume(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(volume, _)| volume)
    }

    /// Returns the snapshot name (after `@`).
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(_, name)| name)
    }
}

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A volume-level snapshot facility.
///
/// Providers snapshot and restore the **whole** volume. Rolling back to a
/// snapshot discards every change made to the volume after it was taken,
/// including changes committed by other transactions.
///
/// # Invariants
///
/// - `create_snapshot` returns a reference unique per transaction id
/// - `rollback_to_snapshot` on a snapshot that no longer exists is not an error
/// - Providers must be `Send + Sync`; one provider is shared by all transactions
///
/// # Implementors
///
/// - [`super::ZfsSnapshotProvider`] - Shells out to `zfs`
/// - [`super::DirectorySnapshotProvider`] - Copies a directory tree
/// - [`super::InMemorySnapshotProvider`] - For testing
pub trait SnapshotProvider: Send + Sync {
    /// Returns the volume (dataset) this provider snapshots.
    fn volume(&self) -> &str;

    /// Creates a snapshot tagged with `transaction_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying facility fails to create the snapshot.
    fn create_snapshot(&self, transaction_id: &str) -> SnapshotResult<SnapshotRef>;

    /// Restores the entire volume to `snapshot`.
    ///
    /// A missing snapshot is treated as already rolled back and returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback command fails for any other reason.
    fn rollback_to_snapshot(&self, snapshot: &SnapshotRef) -> SnapshotResult<()>;

    /// Checks whether `snapshot` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the facility cannot be queried at all.
    fn snapshot_exists(&self, snapshot: &SnapshotRef) -> SnapshotResult<bool>;

    /// Destroys `snapshot`, releasing the space it holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be destroyed.
    fn destroy_snapshot(&self, snapshot: &SnapshotRef) -> SnapshotResult<()>;
}
