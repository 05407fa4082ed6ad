//! Load validation command.

use snaptx_core::TransactionManager;
use snaptx_testkit::{run_validation, StressConfig};
use std::path::Path;
use tracing::info;

/// Runs the validate command.
pub fn run(
    manager: &TransactionManager,
    file: &Path,
    config: &StressConfig,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        file = %file.display(),
        transactions = config.transactions,
        threads = config.threads,
        "starting validation"
    );

    let result = run_validation(manager, file, config)?;

    match format {
        "json" => println!("{}", result.to_json()?),
        _ => result.print_summary("Validation complete"),
    }

    Ok(())
}
