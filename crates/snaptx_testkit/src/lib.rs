//! # snaptx Testkit
//!
//! Test utilities and drivers for snaptx.
//!
//! This crate provides:
//! - Temporary volumes wired to a transaction manager ([`TestVolume`])
//! - Two-transaction conflict demonstrations ([`scenarios`])
//! - A concurrent load generator with aggregate statistics ([`stress`])
//!
//! ## Usage
//!
//! ```rust
//! use snaptx_testkit::TestVolume;
//!
//! let volume = TestVolume::in_memory();
//! volume.write_live("test.txt", "v0");
//!
//! let mut tx = volume.begin().unwrap();
//! tx.write(volume.path("test.txt"), "v1").unwrap();
//! assert!(tx.commit().unwrap().is_committed());
//! assert_eq!(volume.read_live("test.txt").as_deref(), Some("v1"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod scenarios;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::scenarios::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use scenarios::{ScenarioReport, TransactionReport};
pub use stress::{run_validation, StressConfig, StressTestResult};
