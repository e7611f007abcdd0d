//! Engine types
//!
//! Configuration and statistics for one ingestion run.

use super::batch::BatchLimits;
use crate::config::{MalformedLinePolicy, Settings, DEFAULT_INITIAL_DAYS, DEFAULT_LOG_GROUP};
use crate::types::EpochMillis;
use serde::Serialize;
use std::time::Duration;

/// Configuration for an ingestion run
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Monitored DB instance
    pub instance_identifier: String,
    /// Destination log group
    pub log_group: String,
    /// Destination log stream
    pub log_stream: String,
    /// Look-back window when no checkpoint exists
    pub initial_days: f64,
    /// Lines without a parseable timestamp
    pub malformed_line_policy: MalformedLinePolicy,
    /// Append batch limits
    pub batch_limits: BatchLimits,
    /// Deadline for the whole run
    pub run_timeout: Option<Duration>,
}

impl EngineConfig {
    /// Config for an instance with default destinations; the stream is the instance id
    #[must_use]
    pub fn new(instance_identifier: impl Into<String>) -> Self {
        let instance_identifier = instance_identifier.into();
        Self {
            log_stream: instance_identifier.clone(),
            instance_identifier,
            log_group: DEFAULT_LOG_GROUP.to_string(),
            initial_days: DEFAULT_INITIAL_DAYS,
            malformed_line_policy: MalformedLinePolicy::default(),
            batch_limits: BatchLimits::default(),
            run_timeout: None,
        }
    }

    /// Config derived from resolved settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            instance_identifier: settings.instance_identifier.clone(),
            log_group: settings.log_group.clone(),
            log_stream: settings.log_stream().to_string(),
            initial_days: settings.initial_days,
            malformed_line_policy: settings.malformed_line_policy,
            batch_limits: BatchLimits {
                max_events: settings.max_batch_events,
                ..BatchLimits::default()
            },
            run_timeout: settings.run_timeout,
        }
    }

    #[must_use]
    pub fn with_log_group(mut self, group: impl Into<String>) -> Self {
        self.log_group = group.into();
        self
    }

    #[must_use]
    pub fn with_initial_days(mut self, days: f64) -> Self {
        self.initial_days = days;
        self
    }

    #[must_use]
    pub fn with_malformed_line_policy(mut self, policy: MalformedLinePolicy) -> Self {
        self.malformed_line_policy = policy;
        self
    }

    #[must_use]
    pub fn with_max_batch_events(mut self, max: usize) -> Self {
        self.batch_limits.max_events = max.max(1);
        self
    }

    #[must_use]
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }
}

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Files returned by the listing
    pub files_listed: usize,
    /// Files excluded by extension
    pub files_skipped: usize,
    /// Files that yielded new data
    pub files_read: usize,
    /// Portions fetched across all files
    pub portions_fetched: usize,
    /// Events appended to the sink
    pub lines_emitted: usize,
    /// Lines dropped under the skip policy
    pub lines_skipped: usize,
    /// Append calls made
    pub append_calls: usize,
    /// Scan time persisted as the new lower bound
    pub last_read_timestamp: EpochMillis,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one append of `events` events
    pub fn add_append(&mut self, events: usize) {
        self.append_calls += 1;
        self.lines_emitted += events;
    }

    pub fn add_skipped_line(&mut self) {
        self.lines_skipped += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
