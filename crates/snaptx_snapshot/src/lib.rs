//! # snaptx Snapshot
//!
//! Volume snapshot providers for snaptx.
//!
//! This crate provides the lowest-level abstraction snaptx depends on: a
//! facility that can take a point-in-time snapshot of a whole volume and
//! later restore the volume to it. Providers know nothing about
//! transactions beyond the id used to name a snapshot.
//!
//! ## Design Principles
//!
//! - Snapshots are volume-wide; rollback discards *every* later change
//! - Rolling back to a snapshot that no longer exists is a no-op
//! - Providers must be `Send + Sync`; all transactions share one provider
//!
//! ## Available Providers
//!
//! - [`ZfsSnapshotProvider`] - Shells out to `zfs snapshot`/`rollback`/`list`
//! - [`DirectorySnapshotProvider`] - Copies a directory tree, for hosts without ZFS
//! - [`InMemorySnapshotProvider`] - Records calls only, for testing
//!
//! ## Example
//!
//! ```rust
//! use snaptx_snapshot::{InMemorySnapshotProvider, SnapshotProvider};
//!
//! let provider = InMemorySnapshotProvider::new("tank/data");
//! let snap = provider.create_snapshot("1-1700000000000").unwrap();
//! assert_eq!(snap.as_str(), "tank/data@tx_1-1700000000000");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod error;
mod memory;
mod provider;
mod zfs;

pub use directory::{DirectorySnapshotProvider, DEFAULT_DIRECTORY_VOLUME};
pub use error::{SnapshotError, SnapshotResult};
pub use memory::{InMemorySnapshotProvider, MEMORY_VOLUME};
pub use provider::{SnapshotProvider, SnapshotRef};
pub use zfs::{output_lists_snapshot, ZfsConfig, ZfsSnapshotProvider};
