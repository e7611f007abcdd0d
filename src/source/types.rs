//! Log source types

use crate::error::Result;
use crate::types::EpochMillis;
use async_trait::async_trait;

/// A remote log file as listed by the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileDescriptor {
    /// File name, unique per instance (may contain `/`)
    pub name: String,
    /// Last-written time
    pub last_written: EpochMillis,
}

impl LogFileDescriptor {
    pub fn new(name: impl Into<String>, last_written: EpochMillis) -> Self {
        Self {
            name: name.into(),
            last_written,
        }
    }
}

/// One fetched slice of a log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPortion {
    /// Text from the requested marker onward
    pub data: String,
    /// Cursor to resume from next time
    pub next_marker: String,
    /// Whether more data is available right now beyond `next_marker`
    pub additional_data_pending: bool,
}

/// Remote system exposing an instance's log files
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Files written at or after `since`, in listing order
    async fn list_changed_files(
        &self,
        instance: &str,
        since: EpochMillis,
    ) -> Result<Vec<LogFileDescriptor>>;

    /// Fetch the portion of `file` starting at `marker`
    async fn fetch_portion(&self, instance: &str, file: &str, marker: &str) -> Result<LogPortion>;
}
