//! CLI commands and argument parsing

use clap::{Parser, Subcommand};

/// Ships RDS database logs to CloudWatch Logs
///
/// Settings come from environment variables; `DB_INSTANCE_IDENTIFIER` is
/// required.
#[derive(Parser, Debug)]
#[command(name = "rds-log-shipper")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Ship new log lines and save the checkpoint
    Run,

    /// Print the stored checkpoint for the configured instance
    ShowCheckpoint,

    /// Print the resolved settings
    Config,
}
