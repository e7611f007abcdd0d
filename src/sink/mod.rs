//! Log sink module
//!
//! Append-only destination for shipped log lines, grouped into a named
//! group and stream.
//!
//! # Overview
//!
//! The sink module provides:
//! - `LogSink` - ensure group/stream and append events
//! - `CloudWatchLogSink` - CloudWatch Logs implementation
//! - `MemoryLogSink` - token-checking fake for tests
//! - `SequenceCoordinator` - threads sequence tokens through serial appends

mod cloudwatch;
mod memory;
mod sequence;
mod types;

pub use cloudwatch::CloudWatchLogSink;
pub use memory::{AppendCall, MemoryLogSink};
pub use sequence::{SequenceCoordinator, SequenceCursor};
pub use types::{LogEvent, LogSink, EVENT_OVERHEAD_BYTES};
