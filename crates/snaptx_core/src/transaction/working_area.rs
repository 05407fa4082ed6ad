//! Transaction-private staging directory.

use crate::types::TransactionId;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory `<root>/tx_<id>` holding one staged copy per logical name.
#[derive(Debug)]
pub(crate) struct WorkingArea {
    dir: PathBuf,
}

impl WorkingArea {
    /// Creates the working area for `id` under `root`.
    ///
    /// Fails with `AlreadyExists` if another transaction owns the directory.
    pub(crate) fn create(root: &Path, id: TransactionId) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let dir = Self::dir_for(root, id);
        fs::create_dir(&dir)?;
        Ok(Self { dir })
    }

    /// Returns the directory a transaction with `id` stages into.
    pub(crate) fn dir_for(root: &Path, id: TransactionId) -> PathBuf {
        root.join(format!("tx_{id}"))
    }

    pub(crate) fn path(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn staged_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.join(name)
    }

    /// Recursively deletes the working area. Already gone is fine.
    pub(crate) fn remove(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
