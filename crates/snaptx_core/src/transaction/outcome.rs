//! Results of commit and rollback.

use std::path::PathBuf;

/// What happened to the volume during a rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// The volume was restored to the transaction's snapshot.
    Restored,
    /// The snapshot no longer existed; nothing was restored.
    SnapshotMissing,
    /// The provider failed. The transaction was still rolled back.
    ProviderFailed {
        /// The provider error.
        message: String,
    },
}

impl RollbackOutcome {
    /// Returns true if the provider reported a failure.
    #[must_use]
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::ProviderFailed { .. })
    }
}

/// Result of [`crate::Transaction::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every staged change was applied to the live files.
    Committed,
    /// A touched file changed since it was first touched. Nothing was
    /// applied and the transaction was rolled back.
    Conflict {
        /// The first live file found to have drifted.
        path: PathBuf,
        /// What the automatic rollback did.
        rollback: RollbackOutcome,
    },
}

impl CommitOutcome {
    /// Returns true if the commit succeeded.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Returns true if the commit lost to a conflicting change.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
