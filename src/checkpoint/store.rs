//! Checkpoint blob storage
//!
//! The store knows nothing about checkpoints: it gets and puts opaque
//! bytes by key. A missing key is `Ok(None)`, not an error.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Durable key/blob storage
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Fetch a blob; `None` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Overwrite a blob unconditionally
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Human-readable location for logs
    fn location(&self) -> String;
}

/// In-process store, used for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    blobs: Arc<RwLock<HashMap<String, Bytes>>>,
    puts: Arc<AtomicUsize>,
    fail_puts: Arc<AtomicBool>,
}

impl MemoryCheckpointStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob
    pub async fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        self.blobs.write().await.insert(key.into(), data.into());
    }

    /// Number of successful `put` calls
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Make every following `put` fail
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::checkpoint(format!("write to '{key}' refused")));
        }
        self.blobs.write().await.insert(key.to_string(), data);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory://".to_string()
    }
}
