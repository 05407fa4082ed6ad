//! ZFS snapshot provider backed by the `zfs` command.

use crate::error::{SnapshotError, SnapshotResult};
use crate::provider::{SnapshotProvider, SnapshotRef};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info};

/// Configuration for [`ZfsSnapshotProvider`].
#[derive(Debug, Clone)]
pub struct ZfsConfig {
    /// Dataset to snapshot, e.g. `tank/data`.
    pub dataset: String,

    /// Path or name of the `zfs` binary.
    pub binary: PathBuf,

    /// Command used to gain privileges (`sudo`, `doas`), or `None` to run
    /// `zfs` directly.
    pub privilege_command: Option<String>,
}

impl Default for ZfsConfig {
    fn default() -> Self {
        Self {
            dataset: "testpool/mydata".to_string(),
            binary: PathBuf::from("zfs"),
            privilege_command: Some("sudo".to_string()),
        }
    }
}

impl ZfsConfig {
    /// Creates a configuration for `dataset` with default binary and `sudo`.
    #[must_use]
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    /// Sets the `zfs` binary.
    #[must_use]
    pub fn binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the privilege command, or disables it with `None`.
    #[must_use]
    pub fn privilege_command(mut self, command: Option<String>) -> Self {
        self.privilege_command = command;
        self
    }
}

/// Output of one `zfs` invocation.
#[derive(Debug)]
struct CommandOutput {
    command: String,
    success: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        text.push_str(&self.stderr);
        text.trim_end().to_string()
    }

    fn into_error(self) -> SnapshotError {
        let output = self.combined();
        SnapshotError::CommandFailed {
            command: self.command,
            code: self.code,
            output,
        }
    }
}

/// Returns true if `zfs list` output names `snapshot` in one of its rows.
///
/// The reference must appear as a whole whitespace-separated field, so
/// `tank@tx_1-5` does not match a row for `tank@tx_1-50`.
#[must_use]
pub fn output_lists_snapshot(output: &str, snapshot: &str) -> bool {
    output
        .lines()
        .any(|line| line.split_whitespace().any(|field| field == snapshot))
}

/// Snapshot provider that shells out to `zfs`.
///
/// | Operation | Command |
/// |-----------|---------|
/// | create    | `zfs snapshot <ref>` |
/// | rollback  | `zfs rollback -r <ref>` |
/// | exists    | `zfs list -t snapshot <ref>` |
/// | destroy   | `zfs destroy <ref>` |
///
/// `rollback -r` destroys every snapshot newer than the target, including
/// those of transactions that are still active. Their own rollback later
/// finds the snapshot missing and becomes a no-op.
#[derive(Debug, Clone)]
pub struct ZfsSnapshotProvider {
    config: ZfsConfig,
}

impl ZfsSnapshotProvider {
    /// Creates a provider from a configuration.
    #[must_use]
    pub fn new(config: ZfsConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ZfsConfig {
        &self.config
    }

    fn run(&self, args: &[&str]) -> SnapshotResult<CommandOutput> {
        let mut cmd = match &self.config.privilege_command {
            Some(wrapper) => {
                let mut cmd = Command::new(wrapper);
                cmd.arg(&self.config.binary);
                cmd
            }
            None => Command::new(&self.config.binary),
        };
        cmd.args(args);

        let command = format!("{} {}", self.config.binary.display(), args.join(" "));
        debug!(%command, "running zfs");

        let output = cmd.output()?;
        let result = CommandOutput {
            command,
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        for line in result.combined().lines() {
            debug!(target: "snaptx_snapshot::zfs::output", "{line}");
        }

        Ok(result)
    }
}

impl SnapshotProvider for ZfsSnapshotProvider {
    fn volume(&self) -> &str {
        &self.config.dataset
    }

    fn create_snapshot(&self, transaction_id: &str) -> SnapshotResult<SnapshotRef> {
        let snapshot = SnapshotRef::for_transaction(&self.config.dataset, transaction_id);
        let output = self.run(&["snapshot", snapshot.as_str()])?;
        if !output.success {
            return Err(output.into_error());
        }
        info!(%snapshot, "snapshot created");
        Ok(snapshot)
    }

    fn rollback_to_snapshot(&self, snapshot: &SnapshotRef) -> SnapshotResult<()> {
        let output = self.run(&["rollback", "-r", snapshot.as_str()])?;
        if output.success {
            info!(%snapshot, "rolled back");
            return Ok(());
        }
        if !self.snapshot_exists(snapshot)? {
            info!(%snapshot, "snapshot does not exist, rollback skipped");
            return Ok(());
        }
        Err(output.into_error())
    }

    fn snapshot_exists(&self, snapshot: &SnapshotRef) -> SnapshotResult<bool> {
        let output = self.run(&["list", "-t", "snapshot", snapshot.as_str()])?;
        Ok(output.success && output_lists_snapshot(&output.stdout, snapshot.as_str()))
    }

    fn destroy_snapshot(&self, snapshot: &SnapshotRef) -> SnapshotResult<()> {
        let output = self.run(&["destroy", snapshot.as_str()])?;
        if output.success {
            debug!(%snapshot, "snapshot destroyed");
            return Ok(());
        }
        if !self.snapshot_exists(snapshot)? {
            return Err(SnapshotError::NotFound(snapshot.to_string()));
        }
        Err(output.into_error())
    }
}
