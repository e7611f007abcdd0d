//! Log source module
//!
//! Lists an instance's log files changed since a timestamp and fetches
//! marker-addressed portions of them.
//!
//! # Overview
//!
//! - `LogSource` - the capability the engine depends on
//! - `RdsLogSource` - RDS `DescribeDBLogFiles` / `DownloadDBLogFilePortion`
//! - `MemoryLogSource` - scriptable fake with byte-offset markers

mod memory;
mod rds;
mod types;

pub use memory::MemoryLogSource;
pub use rds::{parse_describe_log_files, parse_download_portion, DescribePage, RdsLogSource};
pub use types::{LogFileDescriptor, LogPortion, LogSource};
