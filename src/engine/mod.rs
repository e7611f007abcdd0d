//! Ingestion engine module
//!
//! One run reads everything written to an instance's log files since the
//! last checkpoint, appends it to the sink and then saves the new
//! checkpoint.
//!
//! # Overview
//!
//! The engine module provides:
//! - `IngestionEngine` - runs one pass over changed files
//! - `EngineConfig` - destinations, policies and limits for a run
//! - `RunStats` - counters reported after a run
//! - line splitting, timestamp extraction and append batching
//!
//! The stored checkpoint only changes at the end of a run in which every
//! file succeeded. A failed or timed-out run leaves it untouched, so the
//! next run starts over from the same place.

mod batch;
mod lines;
mod types;

pub use batch::{BatchLimits, EventBatcher, MAX_BATCH_BYTES, MAX_BATCH_SPAN_MILLIS};
pub use lines::{
    is_binary_log_file, parse_line_timestamp, split_lines, timestamp_prefix, BINARY_EXTENSIONS,
};
pub use types::{EngineConfig, RunStats};

use crate::checkpoint::CheckpointManager;
use crate::config::MalformedLinePolicy;
use crate::error::{Error, Result};
use crate::sink::{LogEvent, LogSink, SequenceCoordinator};
use crate::source::LogSource;
use crate::types::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Ships new log lines from a source to a sink
pub struct IngestionEngine {
    source: Arc<dyn LogSource>,
    sink: Arc<dyn LogSink>,
    checkpoints: CheckpointManager,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl IngestionEngine {
    /// Create an engine using the system clock
    pub fn new(
        source: Arc<dyn LogSource>,
        sink: Arc<dyn LogSink>,
        checkpoints: CheckpointManager,
        config: EngineConfig,
    ) -> Self {
        Self {
            source,
            sink,
            checkpoints,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get the run configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the checkpoint manager
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Run one ingestion pass, honouring the configured deadline
    pub async fn run(&self) -> Result<RunStats> {
        match self.config.run_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_once())
                .await
                .map_err(|_| Error::Deadline {
                    seconds: limit.as_secs(),
                })?,
            None => self.run_once().await,
        }
    }

    async fn run_once(&self) -> Result<RunStats> {
        let start = Instant::now();
        let mut stats = RunStats::new();
        let instance = self.config.instance_identifier.as_str();

        // Captured before listing so anything written during the run is
        // listed again next time
        let scan_time = self.clock.now_millis();
        let mut checkpoint = self
            .checkpoints
            .load(scan_time, self.config.initial_days)
            .await?;

        info!(
            instance,
            since = checkpoint.last_read_timestamp,
            "Listing log files changed since last run"
        );
        let files = self
            .source
            .list_changed_files(instance, checkpoint.last_read_timestamp)
            .await?;
        stats.files_listed = files.len();

        let mut coordinator = SequenceCoordinator::new(
            Arc::clone(&self.sink),
            self.config.log_group.as_str(),
            self.config.log_stream.as_str(),
        );

        for file in &files {
            if is_binary_log_file(&file.name) {
                debug!(file = %file.name, "Skipping binary log file");
                stats.files_skipped += 1;
                continue;
            }

            let marker = checkpoint.marker_for(&file.name).to_string();
            if let Some(next) = self
                .ship_file(&mut coordinator, &file.name, marker, &mut stats)
                .await?
            {
                checkpoint.set_marker(file.name.as_str(), next);
            }
        }

        checkpoint.last_read_timestamp = scan_time;
        self.checkpoints.save(&checkpoint).await?;

        stats.last_read_timestamp = scan_time;
        stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            instance,
            files_listed = stats.files_listed,
            files_skipped = stats.files_skipped,
            files_read = stats.files_read,
            lines = stats.lines_emitted,
            lines_skipped = stats.lines_skipped,
            appends = stats.append_calls,
            duration_ms = stats.duration_ms,
            "Run complete"
        );

        Ok(stats)
    }

    /// Ship everything after `marker` in one file
    ///
    /// Returns the marker to store, or `None` when nothing new was read.
    async fn ship_file(
        &self,
        coordinator: &mut SequenceCoordinator,
        file: &str,
        mut marker: String,
        stats: &mut RunStats,
    ) -> Result<Option<String>> {
        let instance = self.config.instance_identifier.as_str();
        let mut batcher = EventBatcher::new(self.config.batch_limits);
        let mut advanced = false;
        // Tail of a line cut by a portion boundary
        let mut carry = String::new();

        loop {
            let portion = self.source.fetch_portion(instance, file, &marker).await?;
            stats.portions_fetched += 1;

            if portion.data.is_empty() {
                break;
            }

            let more = portion.additional_data_pending && portion.next_marker != marker;
            carry.push_str(&portion.data);
            let complete = if more {
                carry.rfind('\n').map_or(0, |pos| pos + 1)
            } else {
                carry.len()
            };
            let tail = carry.split_off(complete);
            self.ship_lines(coordinator, &mut batcher, file, &carry, stats)
                .await?;
            carry = tail;

            marker = portion.next_marker;
            advanced = true;

            if !more {
                break;
            }
        }

        if !carry.is_empty() {
            self.ship_lines(coordinator, &mut batcher, file, &carry, stats)
                .await?;
        }
        if let Some(batch) = batcher.finish() {
            append(coordinator, &batch, stats).await?;
        }

        if advanced {
            stats.files_read += 1;
            debug!(file, marker = %marker, "Finished file");
        }
        Ok(advanced.then_some(marker))
    }

    async fn ship_lines(
        &self,
        coordinator: &mut SequenceCoordinator,
        batcher: &mut EventBatcher,
        file: &str,
        text: &str,
        stats: &mut RunStats,
    ) -> Result<()> {
        for line in split_lines(text) {
            let Some(timestamp) = parse_line_timestamp(line) else {
                match self.config.malformed_line_policy {
                    MalformedLinePolicy::Fail => {
                        return Err(Error::malformed_line(file, line));
                    }
                    MalformedLinePolicy::Skip => {
                        warn!(file, line, "Skipping line without a timestamp");
                        stats.add_skipped_line();
                        continue;
                    }
                }
            };

            if let Some(batch) = batcher.push(LogEvent::new(timestamp, line)) {
                append(coordinator, &batch, stats).await?;
            }
        }
        Ok(())
    }
}

async fn append(
    coordinator: &mut SequenceCoordinator,
    batch: &[LogEvent],
    stats: &mut RunStats,
) -> Result<()> {
    coordinator.append(batch).await?;
    stats.add_append(batch.len());
    debug!(events = batch.len(), "Appended batch");
    Ok(())
}

impl std::fmt::Debug for IngestionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionEngine")
            .field("config", &self.config)
            .field("checkpoints", &self.checkpoints)
            .finish_non_exhaustive()
    }
}
