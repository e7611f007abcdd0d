//! Log sink types

use crate::error::Result;
use crate::types::EpochMillis;
use async_trait::async_trait;

/// Per-event bookkeeping bytes counted against the append size limit
pub const EVENT_OVERHEAD_BYTES: usize = 26;

/// One event written to the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Event time in epoch milliseconds
    pub timestamp: EpochMillis,
    /// Raw log line
    pub message: String,
}

impl LogEvent {
    pub fn new(timestamp: EpochMillis, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }

    /// Size counted against the per-append byte limit
    pub fn encoded_size(&self) -> usize {
        self.message.len() + EVENT_OVERHEAD_BYTES
    }
}

/// Append-only destination for log events
///
/// Streams may require the token returned by the previous append to be
/// passed to the next one.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Create the group unless it already exists
    async fn ensure_group(&self, group: &str) -> Result<()>;

    /// Create the stream unless it exists; returns its current sequence token
    async fn ensure_stream(&self, group: &str, stream: &str) -> Result<Option<String>>;

    /// Append events in order; returns the token for the next append
    async fn append(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
        token: Option<&str>,
    ) -> Result<Option<String>>;
}
