//! Transaction state.

use crate::error::{CoreError, CoreResult};
use crate::fingerprint::Fingerprint;
use crate::transaction::outcome::{CommitOutcome, RollbackOutcome};
use crate::transaction::working_area::WorkingArea;
use crate::types::TransactionId;
use parking_lot::Mutex;
use snaptx_snapshot::{SnapshotProvider, SnapshotRef};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Committed => f.write_str("committed"),
            Self::RolledBack => f.write_str("rolled back"),
        }
    }
}

/// A file touched by the transaction.
#[derive(Debug)]
struct TouchedFile {
    /// Absolute live path.
    live: PathBuf,
    /// Name of the staged copy in the working area.
    name: OsString,
    /// Live fingerprint at first touch. Never overwritten.
    baseline: Fingerprint,
    /// The staged copy was removed; commit deletes the live file.
    deleted: bool,
}

/// An optimistic transaction over live files.
///
/// All reads and writes go to staged copies in the transaction's private
/// working area; the live filesystem is only modified by a successful
/// [`commit`](Self::commit). Operations take `&mut self`: a transaction is
/// owned by one caller and needs no internal locking.
///
/// A transaction dropped while still active leaks its working area and its
/// snapshot.
pub struct Transaction {
    id: TransactionId,
    snapshot: SnapshotRef,
    provider: Arc<dyn SnapshotProvider>,
    /// Serializes validate+apply across transactions when set.
    commit_gate: Option<Arc<Mutex<()>>>,
    destroy_snapshot_on_commit: bool,
    working_area: WorkingArea,
    /// Touched files in first-touch order.
    touched: Vec<TouchedFile>,
    /// Logical name -> index into `touched`.
    by_name: HashMap<OsString, usize>,
    state: TransactionState,
}

impl Transaction {
    /// Creates a new active transaction.
    pub(crate) fn new(
        id: TransactionId,
        snapshot: SnapshotRef,
        provider: Arc<dyn SnapshotProvider>,
        working_area: WorkingArea,
        commit_gate: Option<Arc<Mutex<()>>>,
        destroy_snapshot_on_commit: bool,
    ) -> Self {
        Self {
            id,
            snapshot,
            provider,
            commit_gate,
            destroy_snapshot_on_commit,
            working_area,
            touched: Vec::new(),
            by_name: HashMap::new(),
            state: TransactionState::Active,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the snapshot taken when the transaction began.
    #[must_use]
    pub fn snapshot(&self) -> &SnapshotRef {
        &self.snapshot
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Returns the working area directory.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        self.working_area.path()
    }

    /// Returns the absolute live paths touched so far, in first-touch order.
    pub fn touched_paths(&self) -> impl Iterator<Item = &Path> {
        self.touched.iter().map(|t| t.live.as_path())
    }

    /// Returns the baseline fingerprint recorded for `path`, if touched.
    #[must_use]
    pub fn baseline(&self, path: impl AsRef<Path>) -> Option<&Fingerprint> {
        let live = std::path::absolute(path.as_ref()).ok()?;
        self.touched
            .iter()
            .find(|t| t.live == live)
            .map(|t| &t.baseline)
    }

    /// Reads the transaction's view of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Deleted`] if the file was deleted in this
    /// transaction, or an I/O error if it cannot be staged or read.
    pub fn read(&mut self, path: impl AsRef<Path>) -> CoreResult<Vec<u8>> {
        self.ensure_active()?;
        let index = self.touch(path.as_ref())?;
        let file = &self.touched[index];
        if file.deleted {
            return Err(CoreError::Deleted {
                path: file.live.clone(),
            });
        }
        Ok(fs::read(self.working_area.staged_path(&file.name))?)
    }

    /// Reads the transaction's view of `path` as UTF-8.
    ///
    /// # Errors
    ///
    /// As [`read`](Self::read), plus `InvalidData` for non-UTF-8 content.
    pub fn read_to_string(&mut self, path: impl AsRef<Path>) -> CoreResult<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map_err(|e| CoreError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Replaces the staged content of `path`.
    ///
    /// Writing a file deleted earlier in the transaction re-creates it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be staged or written.
    pub fn write(&mut self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> CoreResult<()> {
        self.ensure_active()?;
        let index = self.touch(path.as_ref())?;
        let file = &mut self.touched[index];
        fs::write(self.working_area.staged_path(&file.name), contents)?;
        file.deleted = false;
        Ok(())
    }

    /// Marks `path` for deletion at commit.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be staged or unstaged.
    pub fn delete(&mut self, path: impl AsRef<Path>) -> CoreResult<()> {
        self.ensure_active()?;
        let index = self.touch(path.as_ref())?;
        let file = &mut self.touched[index];
        match fs::remove_file(self.working_area.staged_path(&file.name)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err.into()),
            _ => {}
        }
        file.deleted = true;
        Ok(())
    }

    /// Validates every touched file and applies the staged changes.
    ///
    /// Returns [`CommitOutcome::Conflict`] if any touched live file changed
    /// since its first touch; the transaction is then already rolled back.
    ///
    /// Apply is not atomic across files: if copying one file fails, files
    /// applied before it stay applied, the error is returned and the
    /// transaction stays active.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if the transaction is not active,
    /// or an I/O error during validation or apply.
    pub fn commit(&mut self) -> CoreResult<CommitOutcome> {
        self.ensure_active()?;

        let gate = self.commit_gate.clone();
        let guard = gate.as_ref().map(|gate| gate.lock());

        if let Some(path) = self.find_conflict()? {
            drop(guard);
            warn!(id = %self.id, path = %path.display(), "conflict detected, rolling back");
            let rollback = self.rollback()?;
            return Ok(CommitOutcome::Conflict { path, rollback });
        }

        self.apply()?;
        drop(guard);
        self.state = TransactionState::Committed;
        info!(id = %self.id, files = self.touched.len(), "transaction committed");

        if self.destroy_snapshot_on_commit {
            if let Err(err) = self.provider.destroy_snapshot(&self.snapshot) {
                warn!(id = %self.id, snapshot = %self.snapshot, error = %err, "failed to destroy snapshot");
            }
        }
        self.working_area.remove()?;

        Ok(CommitOutcome::Committed)
    }

    /// Rolls the volume back to the transaction's snapshot.
    ///
    /// A missing snapshot is a no-op. A provider failure is logged and
    /// reported in the outcome; in every case the working area is removed
    /// and the transaction ends up [`TransactionState::RolledBack`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] if the transaction is not active,
    /// or an I/O error if the working area cannot be removed.
    pub fn rollback(&mut self) -> CoreResult<RollbackOutcome> {
        self.ensure_active()?;

        let outcome = match self.provider.snapshot_exists(&self.snapshot) {
            Ok(false) => {
                info!(id = %self.id, snapshot = %self.snapshot, "snapshot missing, rollback skipped");
                RollbackOutcome::SnapshotMissing
            }
            Ok(true) => match self.provider.rollback_to_snapshot(&self.snapshot) {
                Ok(()) => RollbackOutcome::Restored,
                Err(err) => {
                    error!(id = %self.id, snapshot = %self.snapshot, error = %err, "rollback failed");
                    RollbackOutcome::ProviderFailed {
                        message: err.to_string(),
                    }
                }
            },
            Err(err) => {
                error!(id = %self.id, snapshot = %self.snapshot, error = %err, "snapshot lookup failed");
                RollbackOutcome::ProviderFailed {
                    message: err.to_string(),
                }
            }
        };

        self.state = TransactionState::RolledBack;
        info!(id = %self.id, ?outcome, "transaction rolled back");
        self.working_area.remove()?;

        Ok(outcome)
    }

    /// Stages `path` on first touch and returns its index.
    fn touch(&mut self, path: &Path) -> CoreResult<usize> {
        let name = logical_name(path)?;
        let live = std::path::absolute(path)?;

        if let Some(&index) = self.by_name.get(&name) {
            let staged = &self.touched[index].live;
            if *staged != live {
                return Err(CoreError::NameCollision {
                    name: name.to_string_lossy().into_owned(),
                    staged: staged.clone(),
                    requested: live,
                });
            }
            return Ok(index);
        }

        // Baseline first: a write racing with the copy then shows up as a
        // conflict instead of being silently overwritten.
        let baseline = Fingerprint::of_file(&live)?;
        let staged = self.working_area.staged_path(&name);
        if baseline.is_absent() {
            File::create(&staged)?;
        } else {
            match fs::copy(&live, &staged) {
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    File::create(&staged)?;
                }
                Err(err) => return Err(err.into()),
            }
        }
        debug!(id = %self.id, path = %live.display(), absent = baseline.is_absent(), "file touched");

        let index = self.touched.len();
        self.touched.push(TouchedFile {
            live,
            name: name.clone(),
            baseline,
            deleted: false,
        });
        self.by_name.insert(name, index);
        Ok(index)
    }

    /// Returns the first touched file whose live fingerprint drifted.
    fn find_conflict(&self) -> CoreResult<Option<PathBuf>> {
        for file in &self.touched {
            let current = Fingerprint::of_file(&file.live)?;
            if current != file.baseline {
                return Ok(Some(file.live.clone()));
            }
        }
        Ok(None)
    }

    fn apply(&self) -> CoreResult<()> {
        for file in &self.touched {
            if file.deleted {
                match fs::remove_file(&file.live) {
                    Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err.into()),
                    _ => {}
                }
            } else {
                fs::copy(self.working_area.staged_path(&file.name), &file.live)?;
            }
        }
        Ok(())
    }

    /// Ensures the transaction is active.
    fn ensure_active(&self) -> CoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            state => Err(CoreError::invalid_state(self.id, state)),
        }
    }
}

/// The name a live file is staged under: its final path component.
fn logical_name(path: &Path) -> CoreResult<OsString> {
    path.file_name()
        .map(|name| name.to_os_string())
        .ok_or_else(|| CoreError::InvalidPath {
            path: path.to_path_buf(),
        })
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("snapshot", &self.snapshot)
            .field("state", &self.state)
            .field("working_area", &self.working_area.path())
            .field("touched", &self.touched.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.is_active() {
            warn!(
                id = %self.id,
                snapshot = %self.snapshot,
                working_area = %self.working_area.path().display(),
                "active transaction dropped; working area and snapshot leaked"
            );
        }
    }
}
