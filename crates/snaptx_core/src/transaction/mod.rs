//! Optimistic file transactions.
//!
//! A transaction isolates its changes in a private working area:
//! - **Touch**: the first read, write or delete of a file copies the live
//!   file into the working area and records its baseline fingerprint
//! - **Validate**: commit re-fingerprints every touched live file; any
//!   difference from the baseline is a conflict
//! - **Apply**: staged copies replace the live files, deleted files are removed
//! - **Rollback**: on conflict (or on request) the volume is restored to the
//!   snapshot taken at begin
//!
//! No live file is locked while a transaction is open. Conflicts are only
//! discovered at commit time.

mod manager;
mod outcome;
mod state;
mod working_area;

pub use manager::TransactionManager;
pub use outcome::{CommitOutcome, RollbackOutcome};
pub use state::{Transaction, TransactionState};
