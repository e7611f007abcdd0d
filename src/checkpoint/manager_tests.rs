//! Tests for CheckpointManager

use super::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

const NOW: i64 = 1_700_000_000_000;
const KEY: &str = "db-1_rds_log_state";

fn manager(store: &MemoryCheckpointStore) -> CheckpointManager {
    CheckpointManager::new(Arc::new(store.clone()), KEY)
}

// ============================================================================
// Load Tests
// ============================================================================

#[tokio::test]
async fn test_load_missing_returns_initial_window() {
    let store = MemoryCheckpointStore::new();
    let checkpoint = manager(&store).load(NOW, 2.0).await.unwrap();

    assert_eq!(checkpoint.last_read_timestamp, NOW - 2 * 86_400_000);
    assert!(checkpoint.read_markers.is_empty());
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_load_existing() {
    let store = MemoryCheckpointStore::new();
    store
        .insert(KEY, r#"{"lastReadDate": 1000, "readState": {"A": "10"}}"#)
        .await;

    let checkpoint = manager(&store).load(NOW, 1.0).await.unwrap();
    assert_eq!(checkpoint, Checkpoint::new(1000).with_marker("A", "10"));
}

#[tokio::test]
async fn test_load_corrupt_blob_defaults() {
    let store = MemoryCheckpointStore::new();
    store.insert(KEY, "\u{0}\u{1}garbage").await;

    let checkpoint = manager(&store).load(NOW, 1.0).await.unwrap();
    assert_eq!(checkpoint, Checkpoint::initial(NOW, 1.0));
}

// ============================================================================
// Save Tests
// ============================================================================

#[tokio::test]
async fn test_save_overwrites() {
    let store = MemoryCheckpointStore::new();
    let manager = manager(&store);

    manager
        .save(&Checkpoint::new(1).with_marker("a", "1"))
        .await
        .unwrap();
    manager
        .save(&Checkpoint::new(2).with_marker("b", "2"))
        .await
        .unwrap();

    let raw = store.get(KEY).await.unwrap().unwrap();
    let value: Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(value, json!({"lastReadDate": 2, "readState": {"b": "2"}}));
    assert_eq!(store.put_count(), 2);
}

#[tokio::test]
async fn test_save_failure_propagates() {
    let store = MemoryCheckpointStore::new();
    store.fail_puts(true);

    let err = manager(&store).save(&Checkpoint::new(1)).await.unwrap_err();
    assert!(err.to_string().contains("refused"));
    assert!(store.get(KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_then_load_round_trip() {
    let store = MemoryCheckpointStore::new();
    let manager = manager(&store);
    let checkpoint = Checkpoint::new(123).with_marker("f.log", "7");

    manager.save(&checkpoint).await.unwrap();
    let loaded = manager.load(NOW, 1.0).await.unwrap();

    assert_eq!(loaded, checkpoint);
}

#[test]
fn test_manager_debug() {
    let store = MemoryCheckpointStore::new();
    let debug = format!("{:?}", manager(&store));
    assert!(debug.contains(KEY));
    assert!(debug.contains("memory://"));
}
