//! Checkpoint manager
//!
//! Binds a store to the checkpoint key of one instance and handles the
//! load-with-defaults / overwrite-on-save cycle.

use super::store::CheckpointStore;
use super::types::Checkpoint;
use crate::error::Result;
use crate::types::EpochMillis;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

/// Loads and saves the checkpoint of one instance
#[derive(Clone)]
pub struct CheckpointManager {
    store: Arc<dyn CheckpointStore>,
    key: String,
}

impl CheckpointManager {
    /// Create a manager for a key
    pub fn new(store: Arc<dyn CheckpointStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Checkpoint key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Load the checkpoint, defaulting when absent or partly unreadable
    pub async fn load(&self, now: EpochMillis, initial_days: f64) -> Result<Checkpoint> {
        match self.store.get(&self.key).await? {
            Some(data) => {
                let checkpoint = Checkpoint::from_bytes_lenient(&data, now, initial_days);
                debug!(
                    key = %self.key,
                    last_read = checkpoint.last_read_timestamp,
                    files = checkpoint.read_markers.len(),
                    "Loaded checkpoint"
                );
                Ok(checkpoint)
            }
            None => {
                info!(
                    key = %self.key,
                    location = %self.store.location(),
                    initial_days,
                    "No checkpoint found, starting from the initial window"
                );
                Ok(Checkpoint::initial(now, initial_days))
            }
        }
    }

    /// Overwrite the stored checkpoint (last writer wins)
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let data = Bytes::from(checkpoint.to_bytes()?);
        self.store.put(&self.key, data).await?;
        debug!(
            key = %self.key,
            last_read = checkpoint.last_read_timestamp,
            files = checkpoint.read_markers.len(),
            "Saved checkpoint"
        );
        Ok(())
    }
}

impl std::fmt::Debug for CheckpointManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointManager")
            .field("key", &self.key)
            .field("location", &self.store.location())
            .finish()
    }
}
