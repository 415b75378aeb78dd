//! In-memory storage integration tests.
//!
//! Run with: cargo test --test storage_memory
//!
//! No external dependencies required.

mod storage;

use std::time::Duration;

use driver_positions::storage::{MemoryPositionStore, TimeoutPositionStore};

#[tokio::test]
async fn test_memory_position_store() {
    println!("=== Memory PositionStore Tests ===");

    let store = MemoryPositionStore::new();
    run_position_store_tests!(&store, "test");

    assert_eq!(store.stored_count().await, 0, "tests should clean up after themselves");
    println!("=== All Memory PositionStore tests PASSED ===");
}

#[tokio::test]
async fn test_timeout_wrapped_position_store() {
    println!("=== Timeout-wrapped PositionStore Tests ===");

    let store = TimeoutPositionStore::new(MemoryPositionStore::new(), Duration::from_secs(5));
    run_position_store_tests!(&store, "test");

    println!("=== All Timeout-wrapped PositionStore tests PASSED ===");
}
