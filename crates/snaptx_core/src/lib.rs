//! # snaptx Core
//!
//! Optimistic concurrency control for ordinary files, backed by volume
//! snapshots.
//!
//! This crate provides:
//! - [`TransactionManager`] issuing uniquely identified transactions
//! - [`Transaction`] with copy-on-first-touch isolation of reads, writes and deletes
//! - [`Fingerprint`]-based conflict detection at commit time
//! - Snapshot rollback when a commit loses a race
//!
//! ## Example
//!
//! ```rust
//! use snaptx_core::{Config, TransactionManager};
//! use snaptx_snapshot::InMemorySnapshotProvider;
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("test.txt");
//! std::fs::write(&path, "v0").unwrap();
//!
//! let provider = Arc::new(InMemorySnapshotProvider::default());
//! let manager = TransactionManager::new(provider, Config::new().working_root(dir.path()));
//!
//! let mut tx = manager.begin().unwrap();
//! assert_eq!(tx.read_to_string(&path).unwrap(), "v0");
//! tx.write(&path, "v1").unwrap();
//! assert!(tx.commit().unwrap().is_committed());
//! assert_eq!(std::fs::read_to_string(&path).unwrap(), "v1");
//! ```
//!
//! ## Caveats
//!
//! - Snapshots are volume-wide. Rolling a transaction back restores the
//!   whole volume, which also undoes anything other transactions committed
//!   after this transaction began.
//! - Apply is not atomic across files. If copying one staged file fails,
//!   the files copied before it stay applied.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod fingerprint;
mod transaction;
mod types;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use fingerprint::{hash_bytes, hash_file, Fingerprint};
pub use transaction::{
    CommitOutcome, RollbackOutcome, Transaction, TransactionManager, TransactionState,
};
pub use types::TransactionId;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
