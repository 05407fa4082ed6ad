//! Conflict demonstrations.

use clap::ValueEnum;
use snaptx_core::TransactionManager;
use snaptx_testkit::scenarios;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initial content of the demonstration file.
pub const INITIAL_CONTENT: &str = "Initial content.\n";

/// Which demonstration to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoKind {
    /// A and B interleaved on one thread.
    Sequential,
    /// A and B on two threads.
    Parallel,
}

/// Runs the demo command.
pub fn run(
    manager: &TransactionManager,
    file: &Path,
    kind: DemoKind,
    delay_a: Duration,
    delay_b: Duration,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(file, INITIAL_CONTENT)?;
    info!(file = %file.display(), ?kind, "running demo");

    let report = match kind {
        DemoKind::Sequential => scenarios::sequential_conflict(manager, file)?,
        DemoKind::Parallel => scenarios::parallel_conflict(manager, file, delay_a, delay_b)?,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => report.print_summary(match kind {
            DemoKind::Sequential => "Sequential conflict",
            DemoKind::Parallel => "Parallel conflict",
        }),
    }

    Ok(())
}
