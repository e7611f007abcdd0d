//! CLI module
//!
//! Command-line interface for one-shot shipping runs.
//!
//! # Commands
//!
//! - `run` - Ship new log lines and save the checkpoint (default)
//! - `show-checkpoint` - Print the stored checkpoint
//! - `config` - Print the resolved settings

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
