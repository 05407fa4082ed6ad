//! Core type definitions for snaptx.

use std::fmt;

/// Unique identifier for a transaction.
///
/// Combines a process-wide monotonic counter with the wall-clock time (in
/// milliseconds) at which the transaction began. The counter alone is unique
/// within one manager; the timestamp keeps ids from separate runs apart so
/// their snapshot names and working areas do not collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId {
    counter: u64,
    started_at_ms: u64,
}

impl TransactionId {
    /// Creates a transaction ID.
    #[must_use]
    pub const fn new(counter: u64, started_at_ms: u64) -> Self {
        Self {
            counter,
            started_at_ms,
        }
    }

    /// Returns the counter component.
    #[must_use]
    pub const fn counter(self) -> u64 {
        self.counter
    }

    /// Returns the wall-clock component in milliseconds since the Unix epoch.
    #[must_use]
    pub const fn started_at_ms(self) -> u64 {
        self.started_at_ms
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.counter, self.started_at_ms)
    }
}
