//! Test fixtures and volume helpers.
//!
//! Provides temporary volumes with a transaction manager attached, so tests
//! can drive transactions against real files.

use snaptx_core::{Config, TransactionManager};
use snaptx_snapshot::{DirectorySnapshotProvider, InMemorySnapshotProvider, SnapshotProvider};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Which snapshot provider backs a [`TestVolume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Records snapshot calls; rollback leaves files untouched.
    InMemory,
    /// Copies the live directory; rollback really restores it.
    Directory,
}

/// A temporary volume with automatic cleanup.
///
/// Layout under the temporary directory:
///
/// ```text
/// <tmp>/
/// ├─ live/        # the volume: files transactions operate on
/// ├─ work/        # working areas (tx_<id>/)
/// └─ snapshots/   # directory provider only
/// ```
pub struct TestVolume {
    /// The transaction manager.
    pub manager: TransactionManager,
    kind: ProviderKind,
    memory: Option<Arc<InMemorySnapshotProvider>>,
    live: PathBuf,
    work: PathBuf,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestVolume {
    /// Creates a volume backed by the in-memory provider.
    pub fn in_memory() -> Self {
        Self::with_config(ProviderKind::InMemory, |config| config)
    }

    /// Creates a volume backed by the directory-copy provider.
    pub fn directory() -> Self {
        Self::with_config(ProviderKind::Directory, |config| config)
    }

    /// Creates a volume, letting the caller adjust the manager configuration.
    ///
    /// The working root is always set to the volume's `work/` directory.
    pub fn with_config(kind: ProviderKind, configure: impl FnOnce(Config) -> Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let live = temp_dir.path().join("live");
        let work = temp_dir.path().join("work");
        fs::create_dir_all(&live).expect("Failed to create live directory");

        let mut memory = None;
        let provider: Arc<dyn SnapshotProvider> = match kind {
            ProviderKind::InMemory => {
                let provider = Arc::new(InMemorySnapshotProvider::default());
                memory = Some(Arc::clone(&provider));
                provider
            }
            ProviderKind::Directory => Arc::new(
                DirectorySnapshotProvider::open(&live, &temp_dir.path().join("snapshots"))
                    .expect("Failed to open directory provider"),
            ),
        };

        let config = configure(Config::new()).working_root(&work);
        Self {
            manager: TransactionManager::new(provider, config),
            kind,
            memory,
            live,
            work,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the provider kind.
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Returns the in-memory provider, if this volume uses one.
    pub fn memory_provider(&self) -> Option<&Arc<InMemorySnapshotProvider>> {
        self.memory.as_ref()
    }

    /// Returns the live directory.
    pub fn live_dir(&self) -> &Path {
        &self.live
    }

    /// Returns the working root.
    pub fn work_dir(&self) -> &Path {
        &self.work
    }

    /// Returns the live path of `name`.
    pub fn path(&self, name: &str) -> PathBuf {
        self.live.join(name)
    }

    /// Writes a live file directly, bypassing transactions.
    pub fn write_live(&self, name: &str, contents: &str) {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(path, contents).expect("Failed to write live file");
    }

    /// Reads a live file directly, `None` if it does not exist.
    pub fn read_live(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.path(name)).ok()
    }

    /// Counts working areas still present under the working root.
    pub fn working_areas(&self) -> usize {
        fs::read_dir(&self.work)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.file_name().to_string_lossy().starts_with("tx_"))
                    .count()
            })
            .unwrap_or(0)
    }
}

impl std::ops::Deref for TestVolume {
    type Target = TransactionManager;

    fn deref(&self) -> &Self::Target {
        &self.manager
    }
}

/// Runs a test with a temporary in-memory-provider volume.
pub fn with_volume<F, R>(f: F) -> R
where
    F: FnOnce(&TestVolume) -> R,
{
    let volume = TestVolume::in_memory();
    f(&volume)
}

/// Runs a test with a temporary directory-provider volume.
pub fn with_directory_volume<F, R>(f: F) -> R
where
    F: FnOnce(&TestVolume) -> R,
{
    let volume = TestVolume::directory();
    f(&volume)
}
