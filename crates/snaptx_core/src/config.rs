//! Transaction manager configuration.

use std::path::PathBuf;

/// Configuration for a [`crate::TransactionManager`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory under which each transaction creates its working area
    /// (`<working_root>/tx_<id>`).
    pub working_root: PathBuf,

    /// Whether commits validate and apply under a manager-wide gate.
    ///
    /// When disabled, another transaction may apply between this
    /// transaction's validation and its apply.
    pub serialize_commits: bool,

    /// Whether to destroy a transaction's snapshot after it commits.
    pub destroy_snapshot_on_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_root: std::env::temp_dir(),
            serialize_commits: true,
            destroy_snapshot_on_commit: false,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory that holds working areas.
    #[must_use]
    pub fn working_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_root = path.into();
        self
    }

    /// Sets whether validate+apply is serialized across transactions.
    #[must_use]
    pub const fn serialize_commits(mut self, value: bool) -> Self {
        self.serialize_commits = value;
        self
    }

    /// Sets whether snapshots are destroyed after a successful commit.
    #[must_use]
    pub const fn destroy_snapshot_on_commit(mut self, value: bool) -> Self {
        self.destroy_snapshot_on_commit = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.working_root, std::env::temp_dir());
        assert!(config.serialize_commits);
        assert!(!config.destroy_snapshot_on_commit);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .working_root("/var/tmp/snaptx")
            .serialize_commits(false)
            .destroy_snapshot_on_commit(true);

        assert_eq!(config.working_root, PathBuf::from("/var/tmp/snaptx"));
        assert!(!config.serialize_commits);
        assert!(config.destroy_snapshot_on_commit);
    }
}
