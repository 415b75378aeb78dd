//! DynamoDB storage integration tests.
//!
//! Run with: cargo test --test storage_dynamo --features dynamo -- --ignored --nocapture
//!
//! Requires: DYNAMODB_ENDPOINT env var or DynamoDB Local on localhost:8000
//!
//! Note: Tests use unique route prefixes to avoid data conflicts between runs.

mod storage;

use driver_positions::storage::DynamoPositionStore;

fn dynamo_endpoint() -> String {
    std::env::var("DYNAMODB_ENDPOINT").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

fn test_prefix() -> String {
    format!(
        "test_{}",
        uuid::Uuid::new_v4().to_string().replace("-", "")[..8].to_string()
    )
}

#[tokio::test]
#[ignore = "requires running DynamoDB Local instance"]
async fn test_dynamo_position_store() {
    println!("=== DynamoDB PositionStore Tests ===");
    println!("Connecting to: {}", dynamo_endpoint());

    // DynamoDB Local accepts any credentials but the SDK still needs some
    if std::env::var("AWS_ACCESS_KEY_ID").is_err() {
        std::env::set_var("AWS_ACCESS_KEY_ID", "local");
        std::env::set_var("AWS_SECRET_ACCESS_KEY", "local");
    }

    let prefix = test_prefix();
    println!("Using test prefix: {}", prefix);

    let store = DynamoPositionStore::new(
        "DriverPositionTest",
        Some(&dynamo_endpoint()),
        Some("us-east-1"),
    )
    .await
    .expect("Failed to create DynamoDB client");

    store
        .ensure_table()
        .await
        .expect("Failed to create DynamoDB table");

    run_position_store_tests!(&store, &prefix);

    println!("=== All DynamoDB PositionStore tests PASSED ===");
}
