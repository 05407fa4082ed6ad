//! Two-transaction conflict demonstrations.
//!
//! Both scenarios start two transactions, A and B, that read and rewrite
//! the same file. A always commits first, so B's commit finds the file
//! changed since B first touched it and rolls back.

use serde::Serialize;
use snaptx_core::{CommitOutcome, CoreResult, Transaction, TransactionManager};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::info;

/// What one transaction of a scenario did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReport {
    /// Label used in output (`A` or `B`).
    pub label: String,
    /// Transaction id.
    pub id: String,
    /// Content the transaction read before writing.
    pub read: String,
    /// Content the transaction wrote.
    pub wrote: String,
    /// Whether the commit succeeded.
    pub committed: bool,
    /// Conflicting path, if the commit was refused.
    pub conflict: Option<String>,
}

/// Outcome of a scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Transaction A.
    pub first: TransactionReport,
    /// Transaction B.
    pub second: TransactionReport,
    /// Live content of the file after both transactions finished.
    pub final_content: Option<String>,
}

impl ScenarioReport {
    /// Prints a human-readable summary.
    pub fn print_summary(&self, name: &str) {
        println!("=== {name} ===");
        for tx in [&self.first, &self.second] {
            println!("Transaction {} ({})", tx.label, tx.id);
            println!("  read:  {:?}", tx.read);
            println!("  wrote: {:?}", tx.wrote);
            match &tx.conflict {
                None => println!("  committed"),
                Some(path) => println!("  conflict on {path}, rolled back"),
            }
        }
        match &self.final_content {
            Some(content) => println!("Final content: {content:?}"),
            None => println!("Final content: <missing>"),
        }
    }
}

fn change_for(label: &str) -> String {
    format!("{label}: change by transaction {label}.\n")
}

fn finish(
    label: &str,
    tx: &mut Transaction,
    read: String,
    wrote: String,
) -> CoreResult<TransactionReport> {
    let outcome = tx.commit()?;
    let conflict = match &outcome {
        CommitOutcome::Committed => None,
        CommitOutcome::Conflict { path, .. } => Some(path.display().to_string()),
    };
    info!(
        label,
        id = %tx.id(),
        committed = outcome.is_committed(),
        "scenario transaction finished"
    );
    Ok(TransactionReport {
        label: label.to_string(),
        id: tx.id().to_string(),
        read,
        wrote,
        committed: outcome.is_committed(),
        conflict,
    })
}

fn read_and_write(
    label: &str,
    tx: &mut Transaction,
    file: &Path,
) -> CoreResult<(String, String)> {
    let read = tx.read_to_string(file)?;
    let wrote = change_for(label);
    tx.write(file, &wrote)?;
    Ok((read, wrote))
}

/// Runs A and B interleaved on one thread.
///
/// Order: A begins, reads and writes; B begins, reads and writes; A
/// commits; B commits and conflicts.
pub fn sequential_conflict(
    manager: &TransactionManager,
    file: &Path,
) -> CoreResult<ScenarioReport> {
    let mut a = manager.begin()?;
    let (a_read, a_wrote) = read_and_write("A", &mut a, file)?;

    let mut b = manager.begin()?;
    let (b_read, b_wrote) = read_and_write("B", &mut b, file)?;

    let first = finish("A", &mut a, a_read, a_wrote)?;
    let second = finish("B", &mut b, b_read, b_wrote)?;

    Ok(ScenarioReport {
        first,
        second,
        final_content: std::fs::read_to_string(file).ok(),
    })
}

/// Runs A and B on two threads.
///
/// Each thread begins, reads, writes, sleeps for its delay and commits.
/// A sleeps for `delay_a`, B for `delay_b`; with `delay_a < delay_b`, A
/// commits first and B conflicts.
pub fn parallel_conflict(
    manager: &TransactionManager,
    file: &Path,
    delay_a: Duration,
    delay_b: Duration,
) -> CoreResult<ScenarioReport> {
    let run = |label: &'static str, delay: Duration| -> CoreResult<TransactionReport> {
        let mut tx = manager.begin()?;
        let (read, wrote) = read_and_write(label, &mut tx, file)?;
        thread::sleep(delay);
        finish(label, &mut tx, read, wrote)
    };

    let (first, second) = thread::scope(|scope| {
        let a = scope.spawn(|| run("A", delay_a));
        let b = scope.spawn(|| run("B", delay_b));
        (
            a.join().expect("Thread A panicked"),
            b.join().expect("Thread B panicked"),
        )
    });

    Ok(ScenarioReport {
        first: first?,
        second: second?,
        final_content: std::fs::read_to_string(file).ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestVolume;

    #[test]
    fn sequential_b_conflicts() {
        let volume = TestVolume::in_memory();
        volume.write_live("test.txt", "v0\n");

        let report = sequential_conflict(&volume, &volume.path("test.txt")).unwrap();

        assert!(report.first.committed);
        assert!(!report.second.committed);
        assert_eq!(report.first.read, "v0\n");
        assert_eq!(report.second.read, "v0\n");
        assert!(report.second.conflict.as_deref().unwrap().ends_with("test.txt"));
        assert_eq!(
            report.final_content.as_deref(),
            Some("A: change by transaction A.\n")
        );
    }

    #[test]
    fn parallel_shorter_delay_wins() {
        let volume = TestVolume::in_memory();
        volume.write_live("test.txt", "v0\n");

        let report = parallel_conflict(
            &volume,
            &volume.path("test.txt"),
            Duration::from_millis(200),
            Duration::from_millis(800),
        )
        .unwrap();

        assert!(report.first.committed);
        assert!(!report.second.committed);
        assert_eq!(report.final_content.as_deref(), Some(report.first.wrote.as_str()));
    }

    #[test]
    fn report_serializes() {
        let volume = TestVolume::in_memory();
        volume.write_live("test.txt", "v0\n");
        let report = sequential_conflict(&volume, &volume.path("test.txt")).unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["first"]["label"], "A");
        assert_eq!(json["second"]["committed"], false);
    }
}
