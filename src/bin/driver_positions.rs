//! driver-positions server
//!
//! Serves the position operations over HTTP on top of the configured store.
//!
//! ## Configuration
//! - `DRIVER_POSITIONS_CONFIG` - path to a YAML config file
//! - `DRIVER_POSITIONS__STORAGE__TYPE` - `memory` or `dynamo`
//! - `DRIVER_POSITIONS_LOG` - tracing filter (default `info`)

use std::sync::Arc;

use driver_positions::config::Config;
use driver_positions::handlers::gateway::OperationDispatcher;
use driver_positions::handlers::rest;
use driver_positions::handlers::stream::TopicRegistry;
use driver_positions::services::PositionService;
use driver_positions::storage::init_storage;
use driver_positions::utils::bootstrap::{init_tracing, parse_config_path, shutdown_signal};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = parse_config_path();
    let config = Config::load(config_path.as_deref())?;

    init_tracing(config.server.log_format);

    info!(
        storage_type = ?config.storage.storage_type,
        "Starting driver positions service"
    );

    let store = init_storage(&config.storage).await.map_err(|e| {
        error!("Failed to initialize storage: {}", e);
        e
    })?;

    let service = Arc::new(PositionService::new(store, config.storage.scan_limit));
    let topics = Arc::new(TopicRegistry::new(config.notifications.subscriber_buffer));
    let dispatcher = Arc::new(OperationDispatcher::new(service, topics.clone()));

    // Open position streams hold their connections until the registry
    // closes, so close it as soon as the signal arrives.
    let shutdown = async move {
        shutdown_signal().await;
        topics.close_all().await;
    };

    let addr = config.server.bind_address();
    rest::serve(dispatcher, &addr, shutdown)
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;

    info!("Driver positions service stopped");
    Ok(())
}
