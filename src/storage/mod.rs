//! Storage implementations.
//!
//! Positions live in a partition/range keyed store: `route_id` is the
//! partition key, `driver_id` the range key.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{StorageConfig, StorageType};

pub mod memory;
mod position_store;
pub mod timeout;

#[cfg(feature = "dynamo")]
pub mod dynamo;

pub use memory::MemoryPositionStore;
pub use position_store::{FieldFilter, PositionField, PositionStore};
pub use timeout::TimeoutPositionStore;

#[cfg(feature = "dynamo")]
pub use dynamo::DynamoPositionStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed item: {0}")]
    Malformed(String),
}

impl StorageError {
    /// Whether the backend could not be reached in time.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_) | StorageError::Timeout(_))
    }
}

/// Initialize storage based on configuration.
///
/// The returned store is wrapped in a [`TimeoutPositionStore`] so no call
/// blocks longer than `storage.request_timeout_ms`.
pub async fn init_storage(
    config: &StorageConfig,
) -> std::result::Result<Arc<dyn PositionStore>, Box<dyn std::error::Error>> {
    let timeout = config.request_timeout();
    info!(storage_type = ?config.storage_type, ?timeout, "Initializing position storage");

    match config.storage_type {
        StorageType::Memory => Ok(Arc::new(TimeoutPositionStore::new(
            MemoryPositionStore::new(),
            timeout,
        ))),
        #[cfg(feature = "dynamo")]
        StorageType::Dynamo => {
            let dynamo = &config.dynamo;
            let endpoint = dynamo.resolved_endpoint();
            let store = DynamoPositionStore::new(
                &dynamo.table_name,
                endpoint.as_deref(),
                dynamo.region.as_deref(),
            )
            .await?;
            if dynamo.create_table {
                store.ensure_table().await?;
            }
            Ok(Arc::new(TimeoutPositionStore::new(store, timeout)))
        }
        #[cfg(not(feature = "dynamo"))]
        StorageType::Dynamo => {
            tracing::error!("DynamoDB storage requested but 'dynamo' feature is not enabled");
            Err("DynamoDB feature not enabled".into())
        }
    }
}
