//! In-memory log source
//!
//! Markers are byte offsets encoded as decimal strings. Every call is
//! recorded so tests can assert on exactly what was listed and fetched.

use super::types::{LogFileDescriptor, LogPortion, LogSource};
use crate::error::{Error, Result};
use crate::types::EpochMillis;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    files: Vec<(LogFileDescriptor, String)>,
    list_calls: Vec<EpochMillis>,
    fetch_calls: Vec<(String, String)>,
    failing: HashSet<String>,
}

/// Scriptable log source for tests
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSource {
    inner: Arc<Mutex<Inner>>,
    /// Max bytes per portion; `None` returns everything at once
    portion_size: Option<usize>,
}

impl MemoryLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve files in slices of at most `bytes`
    #[must_use]
    pub fn with_portion_size(mut self, bytes: usize) -> Self {
        self.portion_size = Some(bytes.max(1));
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock only happens inside a failing test
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Append text to a file, creating it if needed
    pub fn append(&self, name: &str, text: &str, last_written: EpochMillis) {
        let mut inner = self.lock();
        if let Some((desc, content)) = inner.files.iter_mut().find(|(d, _)| d.name == name) {
            content.push_str(text);
            desc.last_written = last_written;
        } else {
            inner
                .files
                .push((LogFileDescriptor::new(name, last_written), text.to_string()));
        }
    }

    /// Make fetches of `name` fail
    pub fn fail_fetches_of(&self, name: &str) {
        self.lock().failing.insert(name.to_string());
    }

    /// `since` values passed to `list_changed_files`
    pub fn list_calls(&self) -> Vec<EpochMillis> {
        self.lock().list_calls.clone()
    }

    /// `(file, marker)` pairs passed to `fetch_portion`
    pub fn fetch_calls(&self) -> Vec<(String, String)> {
        self.lock().fetch_calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        let mut inner = self.lock();
        inner.list_calls.clear();
        inner.fetch_calls.clear();
    }
}

#[async_trait]
impl LogSource for MemoryLogSource {
    async fn list_changed_files(
        &self,
        _instance: &str,
        since: EpochMillis,
    ) -> Result<Vec<LogFileDescriptor>> {
        let mut inner = self.lock();
        inner.list_calls.push(since);
        Ok(inner
            .files
            .iter()
            .filter(|(desc, _)| desc.last_written >= since)
            .map(|(desc, _)| desc.clone())
            .collect())
    }

    async fn fetch_portion(&self, _instance: &str, file: &str, marker: &str) -> Result<LogPortion> {
        let mut inner = self.lock();
        inner
            .fetch_calls
            .push((file.to_string(), marker.to_string()));

        if inner.failing.contains(file) {
            return Err(Error::aws("rds", "InternalFailure", format!("fetch of {file} failed")));
        }

        let content = inner
            .files
            .iter()
            .find(|(desc, _)| desc.name == file)
            .map(|(_, content)| content.as_str())
            .ok_or_else(|| Error::aws("rds", "DBLogFileNotFoundFault", file.to_string()))?;

        let offset: usize = marker
            .parse()
            .map_err(|_| Error::aws("rds", "InvalidParameterValue", format!("bad marker {marker}")))?;
        let start = (offset.min(content.len())..=content.len())
            .find(|&i| content.is_char_boundary(i))
            .unwrap_or(content.len());
        let end = match self.portion_size {
            Some(size) => (start + size).min(content.len()),
            None => content.len(),
        };
        // Never split a UTF-8 sequence
        let end = (end..=content.len())
            .find(|&i| content.is_char_boundary(i))
            .unwrap_or(content.len());

        Ok(LogPortion {
            data: content[start..end].to_string(),
            next_marker: end.to_string(),
            additional_data_pending: end < content.len(),
        })
    }
}
