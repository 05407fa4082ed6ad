//! Concurrent load generator.
//!
//! Runs many transactions against one shared file from a pool of worker
//! threads and reports how many committed and how many conflicted.

use rand::Rng;
use serde::Serialize;
use snaptx_core::{CoreResult, TransactionManager};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Content seeded into the shared file when it does not exist yet.
pub const INITIAL_CONTENT: &str = "Initial content\n";

/// Result of a validation run.
#[derive(Debug, Clone, Serialize)]
pub struct StressTestResult {
    /// Transactions attempted.
    pub total: usize,
    /// Transactions that committed.
    pub committed: usize,
    /// Transactions refused at commit and rolled back.
    pub conflicts: usize,
    /// Transactions that failed with an error.
    pub errors: usize,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
    /// Mean transaction duration in milliseconds, over all attempted
    /// transactions.
    pub average_transaction_ms: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(
        committed: usize,
        conflicts: usize,
        errors: usize,
        duration: Duration,
        transaction_time: Duration,
    ) -> Self {
        let total = committed + conflicts + errors;
        let average_transaction_ms = if total > 0 {
            transaction_time.as_secs_f64() * 1000.0 / total as f64
        } else {
            0.0
        };

        Self {
            total,
            committed,
            conflicts,
            errors,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            average_transaction_ms,
        }
    }

    /// Serializes the result as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total transactions: {}", self.total);
        println!("Committed: {}", self.committed);
        println!("Conflicts (rolled back): {}", self.conflicts);
        println!("Errors: {}", self.errors);
        println!("Duration: {} ms", self.duration_ms);
        println!("Average transaction time: {:.2} ms", self.average_transaction_ms);
    }
}

/// Configuration for a validation run.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of transactions to run.
    pub transactions: usize,
    /// Number of worker threads.
    pub threads: usize,
    /// Operations per transaction.
    pub operations_per_transaction: usize,
    /// Probability that an operation appends to the file instead of only
    /// reading it.
    pub write_probability: f64,
    /// Minimum pause after each operation.
    pub min_delay: Duration,
    /// Maximum pause after each operation.
    pub max_delay: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            transactions: 200,
            threads: 100,
            operations_per_transaction: 10,
            write_probability: 0.9,
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        }
    }
}

impl StressConfig {
    /// A small configuration without pauses, for tests.
    pub fn quick() -> Self {
        Self {
            transactions: 20,
            threads: 4,
            operations_per_transaction: 3,
            write_probability: 0.9,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn random_delay(&self, rng: &mut impl Rng) -> Duration {
        let min = u64::try_from(self.min_delay.as_millis()).unwrap_or(u64::MAX);
        let max = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rng.gen_range(min..=max))
    }
}

enum Finished {
    Committed,
    Conflict,
}

fn run_one(
    manager: &TransactionManager,
    file: &Path,
    config: &StressConfig,
) -> CoreResult<Finished> {
    let mut rng = rand::thread_rng();
    let mut tx = manager.begin()?;

    for _ in 0..config.operations_per_transaction {
        let current = tx.read_to_string(file)?;
        if rng.gen_bool(config.write_probability.clamp(0.0, 1.0)) {
            let line = format!("RandomText_{}\n", rng.gen_range(0..1000));
            tx.write(file, current + &line)?;
        }

        let delay = config.random_delay(&mut rng);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    let outcome = tx.commit()?;
    debug!(id = %tx.id(), committed = outcome.is_committed(), "validation transaction finished");
    Ok(if outcome.is_committed() {
        Finished::Committed
    } else {
        Finished::Conflict
    })
}

/// Runs `config.transactions` transactions against `file` from
/// `config.threads` workers.
///
/// The file is seeded with [`INITIAL_CONTENT`] if missing. Every
/// transaction reads the file and, with probability
/// `config.write_probability`, appends a `RandomText_<n>` line, once per
/// operation, pausing after each operation.
pub fn run_validation(
    manager: &TransactionManager,
    file: &Path,
    config: &StressConfig,
) -> std::io::Result<StressTestResult> {
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !file.exists() {
        std::fs::write(file, INITIAL_CONTENT)?;
    }

    let next = AtomicUsize::new(0);
    let committed = AtomicUsize::new(0);
    let conflicts = AtomicUsize::new(0);
    let errors = AtomicUsize::new(0);
    let transaction_nanos = AtomicU64::new(0);

    let start = Instant::now();
    thread::scope(|scope| {
        for _ in 0..config.threads.max(1) {
            scope.spawn(|| {
                while next.fetch_add(1, Ordering::SeqCst) < config.transactions {
                    let tx_start = Instant::now();
                    let result = run_one(manager, file, config);
                    let elapsed =
                        u64::try_from(tx_start.elapsed().as_nanos()).unwrap_or(u64::MAX);
                    transaction_nanos.fetch_add(elapsed, Ordering::Relaxed);

                    match result {
                        Ok(Finished::Committed) => committed.fetch_add(1, Ordering::Relaxed),
                        Ok(Finished::Conflict) => conflicts.fetch_add(1, Ordering::Relaxed),
                        Err(err) => {
                            warn!(error = %err, "validation transaction failed");
                            errors.fetch_add(1, Ordering::Relaxed)
                        }
                    };
                }
            });
        }
    });

    Ok(StressTestResult::new(
        committed.into_inner(),
        conflicts.into_inner(),
        errors.into_inner(),
        start.elapsed(),
        Duration::from_nanos(transaction_nanos.into_inner()),
    ))
}
