//! Error types for snapshot operations.

use std::io;
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur while creating, checking or restoring snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// An I/O error occurred (spawning a command, copying a tree).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The external snapshot command exited unsuccessfully.
    #[error("command `{command}` failed with exit code {code:?}: {output}")]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Combined stdout and stderr of the command.
        output: String,
    },

    /// The named snapshot does not exist.
    #[error("snapshot not found: {0}")]
    NotFound(String),

    /// The provider refused the operation.
    #[error("snapshot provider unavailable: {0}")]
    Unavailable(String),
}

impl SnapshotError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Returns true if this error means the snapshot is already gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
