//! Error types for snaptx core.

use crate::transaction::TransactionState;
use crate::types::TransactionId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in transaction operations.
///
/// A commit conflict is not an error: losing an optimistic race is an
/// expected outcome and is reported through
/// [`crate::CommitOutcome::Conflict`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// Snapshot provider error.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] snaptx_snapshot::SnapshotError),

    /// I/O error while staging, reading or applying files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Lifecycle operation on a transaction that is no longer active.
    #[error("transaction {id} is {state}, not active")]
    InvalidState {
        /// The transaction.
        id: TransactionId,
        /// Its current state.
        state: TransactionState,
    },

    /// The path has no file name to stage it under.
    #[error("path has no file name: {}", .path.display())]
    InvalidPath {
        /// The offending path.
        path: PathBuf,
    },

    /// Two different live files share one logical name in a transaction.
    #[error(
        "logical name {name:?} already staged for {}, cannot stage {}",
        .staged.display(),
        .requested.display()
    )]
    NameCollision {
        /// The logical (file) name.
        name: String,
        /// The live path already staged under that name.
        staged: PathBuf,
        /// The live path that was requested.
        requested: PathBuf,
    },

    /// Read of a file the transaction has already deleted.
    #[error("file deleted in this transaction: {}", .path.display())]
    Deleted {
        /// The live path.
        path: PathBuf,
    },
}

impl CoreError {
    /// Creates an invalid state error.
    pub fn invalid_state(id: TransactionId, state: TransactionState) -> Self {
        Self::InvalidState { id, state }
    }

    /// Returns true for [`CoreError::InvalidState`].
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}
