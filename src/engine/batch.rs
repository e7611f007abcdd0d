//! Append batching
//!
//! Lines of one file are grouped into as few append calls as the sink
//! limits allow. A batch never holds more than `max_events` events or
//! `max_bytes` encoded bytes, and never spans more than `max_span_millis`.
//! Events are stably sorted by timestamp when a batch is released.

use crate::config::MAX_EVENTS_PER_APPEND;
use crate::sink::LogEvent;
use crate::types::{EpochMillis, MILLIS_PER_DAY};

/// Byte limit of one `PutLogEvents` call
pub const MAX_BATCH_BYTES: usize = 1_048_576;

/// Widest timestamp range allowed inside one append
pub const MAX_BATCH_SPAN_MILLIS: EpochMillis = MILLIS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_events: usize,
    pub max_bytes: usize,
    pub max_span_millis: EpochMillis,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_events: MAX_EVENTS_PER_APPEND,
            max_bytes: MAX_BATCH_BYTES,
            max_span_millis: MAX_BATCH_SPAN_MILLIS,
        }
    }
}

/// Accumulates events and releases full batches
#[derive(Debug)]
pub struct EventBatcher {
    limits: BatchLimits,
    pending: Vec<LogEvent>,
    bytes: usize,
    earliest: EpochMillis,
    latest: EpochMillis,
}

impl EventBatcher {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            limits,
            pending: Vec::new(),
            bytes: 0,
            earliest: EpochMillis::MAX,
            latest: EpochMillis::MIN,
        }
    }

    /// Add an event, returning the previous batch if the event did not fit
    ///
    /// An event larger than `max_bytes` still gets a batch of its own.
    pub fn push(&mut self, event: LogEvent) -> Option<Vec<LogEvent>> {
        let released = if self.fits(&event) {
            None
        } else {
            self.finish()
        };

        self.bytes += event.encoded_size();
        self.earliest = self.earliest.min(event.timestamp);
        self.latest = self.latest.max(event.timestamp);
        self.pending.push(event);

        released
    }

    /// Release whatever is pending
    pub fn finish(&mut self) -> Option<Vec<LogEvent>> {
        if self.pending.is_empty() {
            return None;
        }

        let mut batch = std::mem::take(&mut self.pending);
        batch.sort_by_key(|e| e.timestamp);
        self.bytes = 0;
        self.earliest = EpochMillis::MAX;
        self.latest = EpochMillis::MIN;
        Some(batch)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn fits(&self, event: &LogEvent) -> bool {
        if self.pending.is_empty() {
            return true;
        }
        let earliest = self.earliest.min(event.timestamp);
        let latest = self.latest.max(event.timestamp);

        self.pending.len() < self.limits.max_events
            && self.bytes + event.encoded_size() <= self.limits.max_bytes
            && latest - earliest <= self.limits.max_span_millis
    }
}
