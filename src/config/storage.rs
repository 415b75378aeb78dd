//! Storage configuration types.

use std::time::Duration;

use serde::Deserialize;

use super::{AWS_ENDPOINT_URL_ENV_VAR, DYNAMODB_ENDPOINT_ENV_VAR};

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Memory,
    Dynamo,
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// Upper bound for a single store call, in milliseconds.
    pub request_timeout_ms: u64,
    /// Maximum number of records returned by a full listing.
    pub scan_limit: usize,
    /// DynamoDB-specific configuration.
    pub dynamo: DynamoConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Memory,
            request_timeout_ms: 5000,
            scan_limit: 1000,
            dynamo: DynamoConfig::default(),
        }
    }
}

impl StorageConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// DynamoDB-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DynamoConfig {
    /// Table holding the positions.
    pub table_name: String,
    /// Explicit endpoint (DynamoDB Local, LocalStack).
    pub endpoint_url: Option<String>,
    /// AWS region. Falls back to the SDK's region chain.
    pub region: Option<String>,
    /// Create the table on startup when it does not exist.
    pub create_table: bool,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            table_name: "DriverPosition".to_string(),
            endpoint_url: None,
            region: None,
            create_table: false,
        }
    }
}

impl DynamoConfig {
    /// Endpoint to connect to.
    ///
    /// Priority: `endpoint_url`, then `DYNAMODB_ENDPOINT`, then
    /// `AWS_ENDPOINT_URL`. Blank values are skipped. `None` means the SDK
    /// default for the region.
    pub fn resolved_endpoint(&self) -> Option<String> {
        let non_blank = |e: &String| !e.trim().is_empty();
        self.endpoint_url
            .clone()
            .filter(non_blank)
            .or_else(|| std::env::var(DYNAMODB_ENDPOINT_ENV_VAR).ok().filter(non_blank))
            .or_else(|| std::env::var(AWS_ENDPOINT_URL_ENV_VAR).ok().filter(non_blank))
    }
}
