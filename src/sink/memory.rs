//! In-memory log sink
//!
//! Behaves like a token-checking stream store: every append must present
//! the token handed out by the previous one, otherwise it is rejected with
//! `InvalidSequenceTokenException`.

use super::types::{LogEvent, LogSink};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded append call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendCall {
    pub group: String,
    pub stream: String,
    pub events: Vec<LogEvent>,
    pub token: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    groups: BTreeSet<String>,
    /// (group, stream) -> token expected by the next append
    streams: BTreeMap<(String, String), Option<String>>,
    appends: Vec<AppendCall>,
    issued: usize,
    ensure_calls: usize,
    fail_at: Option<usize>,
    attempts: usize,
}

/// Recording log sink for tests
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSink {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Pre-create a stream whose next append expects `token`
    pub fn with_stream(self, group: &str, stream: &str, token: Option<&str>) -> Self {
        {
            let mut inner = self.lock();
            inner.groups.insert(group.to_string());
            inner.streams.insert(
                (group.to_string(), stream.to_string()),
                token.map(str::to_string),
            );
        }
        self
    }

    /// Fail the `n`th append attempt (1-based); earlier ones succeed
    pub fn fail_append_at(&self, n: usize) {
        self.lock().fail_at = Some(n);
    }

    /// Successful appends in order
    pub fn appends(&self) -> Vec<AppendCall> {
        self.lock().appends.clone()
    }

    /// All appended events in order
    pub fn events(&self) -> Vec<LogEvent> {
        self.lock()
            .appends
            .iter()
            .flat_map(|a| a.events.iter().cloned())
            .collect()
    }

    /// Messages of all appended events
    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.message).collect()
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.lock().groups.contains(group)
    }

    pub fn has_stream(&self, group: &str, stream: &str) -> bool {
        self.lock()
            .streams
            .contains_key(&(group.to_string(), stream.to_string()))
    }

    /// Number of `ensure_group` plus `ensure_stream` calls
    pub fn ensure_calls(&self) -> usize {
        self.lock().ensure_calls
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    async fn ensure_group(&self, group: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.ensure_calls += 1;
        inner.groups.insert(group.to_string());
        Ok(())
    }

    async fn ensure_stream(&self, group: &str, stream: &str) -> Result<Option<String>> {
        let mut inner = self.lock();
        inner.ensure_calls += 1;
        if !inner.groups.contains(group) {
            return Err(Error::aws(
                "logs",
                "ResourceNotFoundException",
                format!("log group {group} does not exist"),
            ));
        }
        Ok(inner
            .streams
            .entry((group.to_string(), stream.to_string()))
            .or_default()
            .clone())
    }

    async fn append(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
        token: Option<&str>,
    ) -> Result<Option<String>> {
        let mut inner = self.lock();
        inner.attempts += 1;
        if inner.fail_at == Some(inner.attempts) {
            return Err(Error::aws("logs", "ServiceUnavailableException", "injected failure"));
        }

        let key = (group.to_string(), stream.to_string());
        let Some(expected) = inner.streams.get(&key).cloned() else {
            return Err(Error::aws(
                "logs",
                "ResourceNotFoundException",
                format!("log stream {stream} does not exist"),
            ));
        };
        if expected.as_deref() != token {
            return Err(Error::aws(
                "logs",
                "InvalidSequenceTokenException",
                format!("expected sequence token {expected:?}, got {token:?}"),
            ));
        }

        inner.issued += 1;
        let next = format!("token-{}", inner.issued);
        inner.streams.insert(key, Some(next.clone()));
        inner.appends.push(AppendCall {
            group: group.to_string(),
            stream: stream.to_string(),
            events: events.to_vec(),
            token: token.map(str::to_string),
        });

        Ok(Some(next))
    }
}
