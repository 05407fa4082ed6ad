//! CLI command implementations.

pub mod demo;
pub mod ideas;
pub mod validate;

use clap::ValueEnum;
use snaptx_core::{Config, TransactionManager};
use snaptx_snapshot::{
    DirectorySnapshotProvider, SnapshotProvider, ZfsConfig, ZfsSnapshotProvider,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Directory under the volume holding snapshots and working areas of the
/// directory provider.
pub const STATE_DIR: &str = ".snaptx";

/// Snapshot facility to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// `zfs` snapshots of a dataset.
    Zfs,
    /// Full copies of the volume directory.
    Directory,
}

/// Errors raised by command logic itself.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A user-supplied name cannot be used as a file name.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The requested file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The transaction was refused at commit.
    #[error("conflict on {0}, transaction rolled back")]
    Conflict(String),
}

/// Where files live and how transactions over them are snapshotted.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Snapshot facility.
    pub provider: ProviderKind,
    /// ZFS dataset (zfs provider).
    pub dataset: String,
    /// Directory holding the files; the dataset mountpoint for zfs.
    pub volume: PathBuf,
    /// Snapshot store (directory provider).
    pub snapshot_dir: Option<PathBuf>,
    /// Working root for transaction working areas.
    pub work_dir: Option<PathBuf>,
    /// Run `zfs` through `sudo`.
    pub sudo: bool,
    /// Serialize validate+apply across transactions.
    pub serialize_commits: bool,
    /// Destroy a transaction's snapshot after it commits.
    pub destroy_snapshots: bool,
}

impl Environment {
    /// Returns `relative` resolved against the volume.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.volume.join(relative)
    }

    /// Builds a transaction manager for this environment.
    pub fn manager(&self) -> Result<TransactionManager, Box<dyn std::error::Error>> {
        let state_dir = self.path(STATE_DIR);

        let (provider, default_work): (Arc<dyn SnapshotProvider>, PathBuf) = match self.provider {
            ProviderKind::Zfs => {
                let config = ZfsConfig::new(&self.dataset)
                    .privilege_command(self.sudo.then(|| "sudo".to_string()));
                (
                    Arc::new(ZfsSnapshotProvider::new(config)),
                    std::env::temp_dir(),
                )
            }
            ProviderKind::Directory => {
                let store = self
                    .snapshot_dir
                    .clone()
                    .unwrap_or_else(|| state_dir.join("snapshots"));
                let provider = DirectorySnapshotProvider::open(&self.volume, &store)?
                    .exclude(&state_dir)?;
                (Arc::new(provider), state_dir.join("work"))
            }
        };

        let config = Config::new()
            .working_root(self.work_dir.clone().unwrap_or(default_work))
            .serialize_commits(self.serialize_commits)
            .destroy_snapshot_on_commit(self.destroy_snapshots);

        Ok(TransactionManager::new(provider, config))
    }
}
