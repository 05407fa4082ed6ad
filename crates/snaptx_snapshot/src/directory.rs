//! Directory-copy snapshot provider.

use crate::error::{SnapshotError, SnapshotResult};
use crate::provider::{SnapshotProvider, SnapshotRef};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Volume label used when none is given.
pub const DEFAULT_DIRECTORY_VOLUME: &str = "local";

/// A snapshot provider that copies a directory tree.
///
/// Each snapshot is a full copy of the volume root stored under
/// `<store>/tx_<id>`. Rollback clears the volume root and copies the
/// snapshot back, then discards newer snapshots like `zfs rollback -r`.
/// This gives real, observable rollback semantics on any filesystem at the
/// cost of copying every file.
///
/// The snapshot store (and any path added with [`Self::exclude`]) is never
/// copied nor cleared, so it may live inside the volume root.
///
/// # Thread Safety
///
/// Create, rollback and destroy are serialized by an internal lock, the way
/// a volume tool serializes its own administrative commands.
///
/// # Example
///
/// ```no_run
/// use snaptx_snapshot::{DirectorySnapshotProvider, SnapshotProvider};
/// use std::path::Path;
///
/// let provider = DirectorySnapshotProvider::open(Path::new("data"), Path::new(".snapshots")).unwrap();
/// let snap = provider.create_snapshot("1-100").unwrap();
/// provider.rollback_to_snapshot(&snap).unwrap();
/// ```
#[derive(Debug)]
pub struct DirectorySnapshotProvider {
    volume: String,
    root: PathBuf,
    store: PathBuf,
    excluded: Vec<PathBuf>,
    /// Snapshots taken by this provider, oldest first.
    order: Mutex<Vec<SnapshotRef>>,
}

impl DirectorySnapshotProvider {
    /// Opens a provider for `root`, keeping snapshots under `store`.
    ///
    /// Both directories are created if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be created.
    pub fn open(root: &Path, store: &Path) -> SnapshotResult<Self> {
        fs::create_dir_all(root)?;
        fs::create_dir_all(store)?;

        Ok(Self {
            volume: DEFAULT_DIRECTORY_VOLUME.to_string(),
            root: std::path::absolute(root)?,
            store: std::path::absolute(store)?,
            excluded: Vec::new(),
            order: Mutex::new(Vec::new()),
        })
    }

    /// Sets the volume label used in snapshot references.
    #[must_use]
    pub fn with_volume_name(mut self, volume: impl Into<String>) -> Self {
        self.volume = volume.into();
        self
    }

    /// Excludes a path inside the volume root from snapshots and rollbacks.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be made absolute.
    pub fn exclude(mut self, path: &Path) -> SnapshotResult<Self> {
        self.excluded.push(std::path::absolute(path)?);
        Ok(self)
    }

    /// Returns the volume root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the snapshot store directory.
    #[must_use]
    pub fn store(&self) -> &Path {
        &self.store
    }

    fn snapshot_dir(&self, snapshot: &SnapshotRef) -> PathBuf {
        self.store.join(snapshot.name())
    }

    fn is_excluded(&self, path: &Path) -> bool {
        path == self.store || self.excluded.iter().any(|e| e == path)
    }

    fn copy_tree(&self, from: &Path, to: &Path) -> SnapshotResult<()> {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            let source = entry.path();
            if self.is_excluded(&source) {
                continue;
            }
            let target = to.join(entry.file_name());
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.copy_tree(&source, &target)?;
            } else if file_type.is_file() {
                fs::copy(&source, &target)?;
            } else if file_type.is_symlink() {
                copy_symlink(&source, &target)?;
            } else {
                debug!(path = %source.display(), "skipping special file");
            }
        }
        Ok(())
    }

    /// Returns true if `path` is a directory holding the store or an
    /// excluded path somewhere below it.
    fn contains_excluded(&self, path: &Path) -> bool {
        self.store.starts_with(path) || self.excluded.iter().any(|e| e.starts_with(path))
    }

    /// Removes everything under `dir` except excluded paths and the
    /// directories leading to them.
    fn clear_dir(&self, dir: &Path) -> SnapshotResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if self.is_excluded(&path) {
                continue;
            }
            if entry.file_type()?.is_dir() {
                if self.contains_excluded(&path) {
                    self.clear_dir(&path)?;
                } else {
                    fs::remove_dir_all(&path)?;
                }
            } else {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// Recreates the symlink `source` at `target`, pointing where it points.
#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> SnapshotResult<()> {
    let link = fs::read_link(source)?;
    if fs::symlink_metadata(target).is_ok() {
        fs::remove_file(target)?;
    }
    std::os::unix::fs::symlink(link, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, _target: &Path) -> SnapshotResult<()> {
    Err(SnapshotError::unavailable(format!(
        "cannot snapshot symlink {}",
        source.display()
    )))
}

impl SnapshotProvider for DirectorySnapshotProvider {
    fn volume(&self) -> &str {
        &self.volume
    }

    fn create_snapshot(&self, transaction_id: &str) -> SnapshotResult<SnapshotRef> {
        let snapshot = SnapshotRef::for_transaction(&self.volume, transaction_id);
        let dir = self.snapshot_dir(&snapshot);

        let mut order = self.order.lock();
        if dir.exists() {
            return Err(SnapshotError::unavailable(format!(
                "snapshot already exists: {snapshot}"
            )));
        }

        if let Err(err) = self.copy_tree(&self.root, &dir) {
            let _ = fs::remove_dir_all(&dir);
            return Err(err);
        }
        order.push(snapshot.clone());
        debug!(%snapshot, "directory snapshot created");

        Ok(snapshot)
    }

    fn rollback_to_snapshot(&self, snapshot: &SnapshotRef) -> SnapshotResult<()> {
        let dir = self.snapshot_dir(snapshot);

        let mut order = self.order.lock();
        if !dir.is_dir() {
            debug!(%snapshot, "snapshot missing, nothing to roll back");
            return Ok(());
        }

        self.clear_dir(&self.root)?;
        self.copy_tree(&dir, &self.root)?;

        if let Some(position) = order.iter().position(|s| s == snapshot) {
            for newer in order.split_off(position + 1) {
                fs::remove_dir_all(self.snapshot_dir(&newer))?;
            }
        }
        debug!(%snapshot, "directory rolled back");

        Ok(())
    }

    fn snapshot_exists(&self, snapshot: &SnapshotRef) -> SnapshotResult<bool> {
        Ok(self.snapshot_dir(snapshot).is_dir())
    }

    fn destroy_snapshot(&self, snapshot: &SnapshotRef) -> SnapshotResult<()> {
        let dir = self.snapshot_dir(snapshot);

        let mut order = self.order.lock();
        if !dir.is_dir() {
            return Err(SnapshotError::NotFound(snapshot.to_string()));
        }
        fs::remove_dir_all(&dir)?;
        order.retain(|s| s != snapshot);

        Ok(())
    }
}
