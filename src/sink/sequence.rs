//! Sequence-token coordination
//!
//! Appends to one stream are strictly serial: each carries the token the
//! previous append returned. The first append of a run binds the cursor by
//! ensuring the group and stream exist.

use super::types::{LogEvent, LogSink};
use crate::error::Result;
use std::sync::Arc;
use tracing::debug;

/// Where the coordinator is in the token chain
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SequenceCursor {
    /// Group and stream not yet ensured in this run
    #[default]
    Unknown,
    /// Token to present on the next append (`None` for a fresh stream)
    Bound(Option<String>),
}

/// Serializes appends to one (group, stream) pair
pub struct SequenceCoordinator {
    sink: Arc<dyn LogSink>,
    group: String,
    stream: String,
    cursor: SequenceCursor,
}

impl SequenceCoordinator {
    pub fn new(sink: Arc<dyn LogSink>, group: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            sink,
            group: group.into(),
            stream: stream.into(),
            cursor: SequenceCursor::Unknown,
        }
    }

    pub fn cursor(&self) -> &SequenceCursor {
        &self.cursor
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Ensure the destination exists and bind the cursor, once per run
    pub async fn bind(&mut self) -> Result<Option<String>> {
        if let SequenceCursor::Bound(token) = &self.cursor {
            return Ok(token.clone());
        }

        self.sink.ensure_group(&self.group).await?;
        let token = self.sink.ensure_stream(&self.group, &self.stream).await?;
        debug!(
            group = %self.group,
            stream = %self.stream,
            has_token = token.is_some(),
            "Bound sequence cursor"
        );
        self.cursor = SequenceCursor::Bound(token.clone());
        Ok(token)
    }

    /// Append one batch, threading the sequence token
    ///
    /// An empty batch is a no-op. On failure the cursor is left as it was.
    pub async fn append(&mut self, events: &[LogEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let token = self.bind().await?;
        let next = self
            .sink
            .append(&self.group, &self.stream, events, token.as_deref())
            .await?;
        self.cursor = SequenceCursor::Bound(next);
        Ok(())
    }
}

impl std::fmt::Debug for SequenceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceCoordinator")
            .field("group", &self.group)
            .field("stream", &self.stream)
            .field("cursor", &self.cursor)
            .finish()
    }
}
