//! Checkpoint module
//!
//! Tracks how far each remote log file has been read and when the
//! instance was last scanned. The checkpoint is loaded once at the start
//! of a run and written once at the end of a successful run.
//!
//! # Overview
//!
//! The checkpoint module provides:
//! - `Checkpoint` - last scan time plus per-file read markers
//! - `CheckpointStore` - durable blob get/put (object store or memory)
//! - `CheckpointManager` - load-with-defaults and overwrite-on-save

mod manager;
mod object;
mod store;
mod types;

pub use manager::CheckpointManager;
pub use object::ObjectCheckpointStore;
pub use store::{CheckpointStore, MemoryCheckpointStore};
pub use types::{initial_window_start, Checkpoint, START_MARKER};

#[cfg(test)]
mod manager_tests;
