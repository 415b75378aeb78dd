//! PositionStore interface tests.
//!
//! These tests verify the contract of the PositionStore trait.
//! Each storage implementation should run these tests.
//!
//! Every test takes a `prefix` that is prepended to the route ids it
//! touches, so runs against a shared table do not see each other's records.

use chrono::{SubsecRound, Utc};
use driver_positions::model::DriverPosition;
use driver_positions::storage::{FieldFilter, PositionStore};

fn position(route_id: &str, driver_id: &str, status: &str) -> DriverPosition {
    DriverPosition {
        route_id: route_id.to_string(),
        driver_id: driver_id.to_string(),
        longitude: -99.1332,
        latitude: 19.4326,
        speed: Some(42.5),
        heading: Some(180.0),
        status: status.to_string(),
        // Millisecond precision survives every backend's timestamp encoding
        timestamp: Utc::now().trunc_subsecs(3),
    }
}

fn route(prefix: &str, name: &str) -> String {
    format!("{prefix}_{name}")
}

async fn cleanup<S: PositionStore>(store: &S, route_id: &str) {
    for p in store.query_by_route(route_id).await.unwrap() {
        store.delete(&p.route_id, &p.driver_id).await.unwrap();
    }
}

// =============================================================================
// PositionStore::get tests
// =============================================================================

pub async fn test_get_nonexistent<S: PositionStore>(store: &S, prefix: &str) {
    let result = store
        .get(&route(prefix, "missing"), "nobody")
        .await
        .expect("get should succeed");
    assert!(result.is_none(), "nonexistent position should be None");
}

// =============================================================================
// PositionStore::put tests
// =============================================================================

pub async fn test_put_and_get<S: PositionStore>(store: &S, prefix: &str) {
    let route_id = route(prefix, "put_get");
    let stored = position(&route_id, "D1", "Active");

    let returned = store.put(stored.clone()).await.expect("put should succeed");
    assert_eq!(returned, stored, "put should return the stored record");

    let result = store
        .get(&route_id, "D1")
        .await
        .expect("get should succeed")
        .expect("position should exist");
    assert_eq!(result, stored, "should return every stored field");

    cleanup(store, &route_id).await;
}

pub async fn test_put_without_optional_fields<S: PositionStore>(store: &S, prefix: &str) {
    let route_id = route(prefix, "put_optional");
    let mut stored = position(&route_id, "D1", "Active");
    stored.speed = None;
    stored.heading = None;

    store.put(stored.clone()).await.unwrap();

    let result = store.get(&route_id, "D1").await.unwrap().unwrap();
    assert_eq!(result.speed, None);
    assert_eq!(result.heading, None);

    cleanup(store, &route_id).await;
}

pub async fn test_put_replaces<S: PositionStore>(store: &S, prefix: &str) {
    let route_id = route(prefix, "put_replace");

    store.put(position(&route_id, "D1", "Active")).await.unwrap();
    let mut replacement = position(&route_id, "D1", "Inactive");
    replacement.longitude = 10.0;
    replacement.speed = None;
    store.put(replacement.clone()).await.unwrap();

    let listed = store.query_by_route(&route_id).await.unwrap();
    assert_eq!(listed.len(), 1, "same key must hold a single record");
    assert_eq!(listed[0], replacement, "should return the replacement");

    cleanup(store, &route_id).await;
}

// =============================================================================
// Range query tests
// =============================================================================

pub async fn test_query_by_route_isolation<S: PositionStore>(store: &S, prefix: &str) {
    let route_a = route(prefix, "iso_a");
    let route_b = route(prefix, "iso_b");

    store.put(position(&route_a, "D1", "Active")).await.unwrap();
    store.put(position(&route_a, "D2", "Active")).await.unwrap();
    store.put(position(&route_b, "D1", "Active")).await.unwrap();

    let mut drivers: Vec<_> = store
        .query_by_route(&route_a)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.driver_id)
        .collect();
    drivers.sort();
    assert_eq!(drivers, vec!["D1", "D2"]);

    let b = store.query_by_route(&route_b).await.unwrap();
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].route_id, route_b);

    cleanup(store, &route_a).await;
    cleanup(store, &route_b).await;
}

pub async fn test_query_unknown_route_is_empty<S: PositionStore>(store: &S, prefix: &str) {
    let result = store
        .query_by_route(&route(prefix, "empty"))
        .await
        .expect("query should succeed");
    assert!(result.is_empty());
}

pub async fn test_query_filtered_by_status<S: PositionStore>(store: &S, prefix: &str) {
    let route_id = route(prefix, "filtered");

    store.put(position(&route_id, "D1", "Active")).await.unwrap();
    store.put(position(&route_id, "D2", "Inactive")).await.unwrap();
    store.put(position(&route_id, "D3", "Active")).await.unwrap();

    let mut active: Vec<_> = store
        .query_by_route_filtered(&route_id, &FieldFilter::status("Active"))
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.driver_id)
        .collect();
    active.sort();
    assert_eq!(active, vec!["D1", "D3"]);

    let none = store
        .query_by_route_filtered(&route_id, &FieldFilter::status("OnBreak"))
        .await
        .unwrap();
    assert!(none.is_empty());

    cleanup(store, &route_id).await;
}

// =============================================================================
// Scan tests
// =============================================================================

pub async fn test_scan_all_respects_limit<S: PositionStore>(store: &S, prefix: &str) {
    let route_id = route(prefix, "scan");
    for driver in ["D1", "D2", "D3"] {
        store.put(position(&route_id, driver, "Active")).await.unwrap();
    }

    let limited = store.scan_all(2).await.unwrap();
    assert_eq!(limited.len(), 2, "scan should stop at the limit");

    let all = store.scan_all(10_000).await.unwrap();
    let ours = all.iter().filter(|p| p.route_id == route_id).count();
    assert_eq!(ours, 3, "unbounded scan should include every record");

    cleanup(store, &route_id).await;
}

// =============================================================================
// PositionStore::delete tests
// =============================================================================

pub async fn test_delete_existing<S: PositionStore>(store: &S, prefix: &str) {
    let route_id = route(prefix, "delete");
    store.put(position(&route_id, "D1", "Active")).await.unwrap();
    store.put(position(&route_id, "D2", "Active")).await.unwrap();

    store.delete(&route_id, "D1").await.expect("delete should succeed");

    assert!(store.get(&route_id, "D1").await.unwrap().is_none());
    assert!(
        store.get(&route_id, "D2").await.unwrap().is_some(),
        "delete must only remove its own key"
    );

    cleanup(store, &route_id).await;
}

pub async fn test_delete_nonexistent<S: PositionStore>(store: &S, prefix: &str) {
    store
        .delete(&route(prefix, "delete_missing"), "nobody")
        .await
        .expect("deleting a missing key should succeed");
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all PositionStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_position_store_tests {
    ($store:expr, $prefix:expr) => {
        use $crate::storage::position_store_tests::*;

        // get tests
        test_get_nonexistent($store, $prefix).await;
        println!("  test_get_nonexistent: PASSED");

        // put tests
        test_put_and_get($store, $prefix).await;
        println!("  test_put_and_get: PASSED");

        test_put_without_optional_fields($store, $prefix).await;
        println!("  test_put_without_optional_fields: PASSED");

        test_put_replaces($store, $prefix).await;
        println!("  test_put_replaces: PASSED");

        // range query tests
        test_query_by_route_isolation($store, $prefix).await;
        println!("  test_query_by_route_isolation: PASSED");

        test_query_unknown_route_is_empty($store, $prefix).await;
        println!("  test_query_unknown_route_is_empty: PASSED");

        test_query_filtered_by_status($store, $prefix).await;
        println!("  test_query_filtered_by_status: PASSED");

        // scan tests
        test_scan_all_respects_limit($store, $prefix).await;
        println!("  test_scan_all_respects_limit: PASSED");

        // delete tests
        test_delete_existing($store, $prefix).await;
        println!("  test_delete_existing: PASSED");

        test_delete_nonexistent($store, $prefix).await;
        println!("  test_delete_nonexistent: PASSED");
    };
}
