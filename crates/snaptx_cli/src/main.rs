//! snaptx CLI
//!
//! Command-line tools for snapshot-backed file transactions.
//!
//! # Commands
//!
//! - `ideas` - Idea board whose edits run in transactions
//! - `demo` - Two-transaction conflict demonstrations
//! - `validate` - Concurrent load run with commit/conflict statistics
//! - `version` - Version information

mod commands;

use clap::{Parser, Subcommand};
use commands::demo::DemoKind;
use commands::{Environment, ProviderKind};
use snaptx_testkit::StressConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Snapshot-backed optimistic file transactions.
#[derive(Parser)]
#[command(name = "snaptx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Snapshot facility
    #[arg(global = true, long, value_enum, default_value_t = ProviderKind::Directory)]
    provider: ProviderKind,

    /// ZFS dataset to snapshot (zfs provider)
    #[arg(global = true, long, default_value = "testpool/mydata")]
    dataset: String,

    /// Directory holding the files (the dataset mountpoint for zfs)
    #[arg(global = true, long, default_value = "data")]
    volume: PathBuf,

    /// Snapshot store (directory provider) [default: <volume>/.snaptx/snapshots]
    #[arg(global = true, long)]
    snapshot_dir: Option<PathBuf>,

    /// Working root for transaction working areas
    #[arg(global = true, long)]
    work_dir: Option<PathBuf>,

    /// Run zfs directly instead of through sudo
    #[arg(global = true, long)]
    no_sudo: bool,

    /// Let commits validate and apply without the shared commit gate
    #[arg(global = true, long)]
    no_serialize_commits: bool,

    /// Destroy each transaction's snapshot after it commits
    #[arg(global = true, long)]
    destroy_snapshots: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage ideas
    Ideas {
        #[command(subcommand)]
        command: IdeasCommand,
    },

    /// Run a two-transaction conflict demonstration
    Demo {
        /// Demonstration to run
        #[arg(value_enum)]
        kind: DemoKind,

        /// File the transactions edit, relative to the volume
        #[arg(short, long, default_value = "demo/test.txt")]
        file: PathBuf,

        /// Pause of transaction A before commit, in milliseconds (parallel)
        #[arg(long, default_value = "2000")]
        delay_a: u64,

        /// Pause of transaction B before commit, in milliseconds (parallel)
        #[arg(long, default_value = "3000")]
        delay_b: u64,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Run concurrent transactions against one file and report statistics
    Validate {
        /// File the transactions edit, relative to the volume
        #[arg(short, long, default_value = "validation/file1.txt")]
        file: PathBuf,

        /// Number of transactions
        #[arg(short, long, default_value = "200")]
        transactions: usize,

        /// Number of worker threads
        #[arg(long, default_value = "100")]
        threads: usize,

        /// Operations per transaction
        #[arg(long, default_value = "10")]
        operations: usize,

        /// Probability that an operation writes
        #[arg(long, default_value = "0.9")]
        write_probability: f64,

        /// Minimum pause after each operation, in milliseconds
        #[arg(long, default_value = "1000")]
        min_delay: u64,

        /// Maximum pause after each operation, in milliseconds
        #[arg(long, default_value = "5000")]
        max_delay: u64,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum IdeasCommand {
    /// Add a new idea
    Add {
        /// Idea title
        #[arg(short, long)]
        title: String,

        /// Idea text
        #[arg(short, long)]
        content: String,
    },

    /// List existing ideas
    List,

    /// Append a comment to an idea
    Comment {
        /// Idea file name, e.g. idea_My_Idea.txt
        #[arg(short, long)]
        file: String,

        /// Comment text
        #[arg(short, long)]
        comment: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let env = Environment {
        provider: cli.provider,
        dataset: cli.dataset,
        volume: cli.volume,
        snapshot_dir: cli.snapshot_dir,
        work_dir: cli.work_dir,
        sudo: !cli.no_sudo,
        serialize_commits: !cli.no_serialize_commits,
        destroy_snapshots: cli.destroy_snapshots,
    };

    match cli.command {
        Commands::Ideas { command } => {
            let ideas_dir = env.path(commands::ideas::IDEAS_DIR);
            match command {
                IdeasCommand::Add { title, content } => {
                    commands::ideas::run_add(&env.manager()?, &ideas_dir, &title, &content)?;
                }
                IdeasCommand::List => commands::ideas::run_list(&ideas_dir)?,
                IdeasCommand::Comment { file, comment } => {
                    commands::ideas::run_comment(&env.manager()?, &ideas_dir, &file, &comment)?;
                }
            }
        }
        Commands::Demo {
            kind,
            file,
            delay_a,
            delay_b,
            format,
        } => {
            commands::demo::run(
                &env.manager()?,
                &env.path(file),
                kind,
                Duration::from_millis(delay_a),
                Duration::from_millis(delay_b),
                &format,
            )?;
        }
        Commands::Validate {
            file,
            transactions,
            threads,
            operations,
            write_probability,
            min_delay,
            max_delay,
            format,
        } => {
            let config = StressConfig {
                transactions,
                threads,
                operations_per_transaction: operations,
                write_probability,
                min_delay: Duration::from_millis(min_delay),
                max_delay: Duration::from_millis(max_delay),
            };
            commands::validate::run(&env.manager()?, &env.path(file), &config, &format)?;
        }
        Commands::Version => {
            println!("snaptx CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("snaptx Core v{}", snaptx_core::VERSION);
        }
    }

    Ok(())
}
