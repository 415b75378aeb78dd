use chrono::Utc;

use super::*;
use crate::model::DriverPositionInput;

fn position(route: &str, driver: &str, status: &str) -> DriverPosition {
    DriverPositionInput::new(route, driver, 10.0, 20.0)
        .with_status(status)
        .into_position(Utc::now())
}

#[tokio::test]
async fn test_partition_does_not_leak_into_prefix_routes() {
    let store = MemoryPositionStore::new();
    store.put(position("R1", "D1", "Active")).await.unwrap();
    store.put(position("R10", "D1", "Active")).await.unwrap();
    store.put(position("R2", "D1", "Active")).await.unwrap();

    let r1 = store.query_by_route("R1").await.unwrap();
    assert_eq!(r1.len(), 1);
    assert_eq!(r1[0].route_id, "R1");
}

#[tokio::test]
async fn test_filtered_query_applies_predicate() {
    let store = MemoryPositionStore::new();
    store.put(position("R1", "D1", "Active")).await.unwrap();
    store.put(position("R1", "D2", "Inactive")).await.unwrap();

    let active = store
        .query_by_route_filtered("R1", &FieldFilter::status("Active"))
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].driver_id, "D1");
}

#[tokio::test]
async fn test_fail_writes_counts_attempt_but_stores_nothing() {
    let store = MemoryPositionStore::new();
    store.set_fail_writes(true);

    let err = store.put(position("R1", "D1", "Active")).await.unwrap_err();
    assert!(err.is_unavailable());
    assert_eq!(store.put_calls(), 1);
    assert_eq!(store.stored_count().await, 0);
}

#[tokio::test]
async fn test_fail_reads() {
    let store = MemoryPositionStore::new();
    store.set_fail_reads(true);

    assert!(store.get("R1", "D1").await.is_err());
    assert!(store.query_by_route("R1").await.is_err());
    assert!(store.scan_all(10).await.is_err());
}

#[tokio::test]
async fn test_scan_all_respects_limit() {
    let store = MemoryPositionStore::new();
    for i in 0..5 {
        store
            .put(position("R1", &format!("D{i}"), "Active"))
            .await
            .unwrap();
    }

    assert_eq!(store.scan_all(3).await.unwrap().len(), 3);
    assert_eq!(store.scan_all(10).await.unwrap().len(), 5);
}
