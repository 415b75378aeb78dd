//! DynamoDB PositionStore implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client;
use tracing::{debug, info, warn};

use super::{item_to_position, position_to_item, DRIVER_ATTR, ROUTE_ATTR, STATUS_ATTR};
use crate::model::DriverPosition;
use crate::storage::{FieldFilter, PositionField, PositionStore, Result, StorageError};

type Item = HashMap<String, AttributeValue>;

/// How often `ensure_table` polls for the table to become active.
const TABLE_POLL_INTERVAL: Duration = Duration::from_millis(500);
const TABLE_POLL_ATTEMPTS: u32 = 60;

/// DynamoDB implementation of PositionStore.
pub struct DynamoPositionStore {
    client: Client,
    table_name: String,
}

impl DynamoPositionStore {
    /// Create a new DynamoDB position store.
    ///
    /// `endpoint_url` points the client at DynamoDB Local / LocalStack.
    pub async fn new(
        table_name: impl Into<String>,
        endpoint_url: Option<&str>,
        region: Option<&str>,
    ) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;

        let client = if let Some(endpoint) = endpoint_url {
            let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&config)
                .endpoint_url(endpoint)
                .build();
            Client::from_conf(dynamo_config)
        } else {
            Client::new(&config)
        };

        let table_name = table_name.into();
        info!(
            table = %table_name,
            endpoint = endpoint_url.unwrap_or("default"),
            "Connected to DynamoDB for driver positions"
        );

        Ok(Self { client, table_name })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create the table if it does not exist and wait until it is active.
    pub async fn ensure_table(&self) -> Result<()> {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => {
                info!(table = %self.table_name, "DriverPosition table found");
                return Ok(());
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if !service_error.is_resource_not_found_exception() {
                    return Err(unavailable("describe_table", service_error));
                }
            }
        }

        warn!(table = %self.table_name, "DriverPosition table not found, creating it");

        let key_attr = |name: &str| {
            AttributeDefinition::builder()
                .attribute_name(name)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(|e| StorageError::Malformed(e.to_string()))
        };
        let key_schema = |name: &str, key_type: KeyType| {
            KeySchemaElement::builder()
                .attribute_name(name)
                .key_type(key_type)
                .build()
                .map_err(|e| StorageError::Malformed(e.to_string()))
        };

        self.client
            .create_table()
            .table_name(&self.table_name)
            .attribute_definitions(key_attr(ROUTE_ATTR)?)
            .attribute_definitions(key_attr(DRIVER_ATTR)?)
            .key_schema(key_schema(ROUTE_ATTR, KeyType::Hash)?)
            .key_schema(key_schema(DRIVER_ATTR, KeyType::Range)?)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| unavailable("create_table", e))?;

        for _ in 0..TABLE_POLL_ATTEMPTS {
            let described = self
                .client
                .describe_table()
                .table_name(&self.table_name)
                .send()
                .await
                .map_err(|e| unavailable("describe_table", e))?;

            let status = described.table.and_then(|t| t.table_status);
            if status == Some(TableStatus::Active) {
                info!(table = %self.table_name, "DriverPosition table created");
                return Ok(());
            }
            tokio::time::sleep(TABLE_POLL_INTERVAL).await;
        }

        Err(StorageError::Unavailable(format!(
            "table {} did not become active",
            self.table_name
        )))
    }

    /// Run a partition query, following pagination until exhausted.
    async fn query_partition(
        &self,
        route_id: &str,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<DriverPosition>> {
        let mut positions = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", ROUTE_ATTR)
                .expression_attribute_values(":pk", AttributeValue::S(route_id.to_string()))
                .set_exclusive_start_key(start_key.take());

            if let Some(filter) = filter {
                request = request
                    .filter_expression("#f = :f")
                    .expression_attribute_names("#f", field_attr(filter.field))
                    .expression_attribute_values(":f", AttributeValue::S(filter.value.clone()));
            }

            let output = request
                .send()
                .await
                .map_err(|e| unavailable("query", e))?;

            for item in output.items.unwrap_or_default() {
                positions.push(item_to_position(&item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!(
            route_id = %route_id,
            filtered = filter.is_some(),
            count = positions.len(),
            "Queried route partition from DynamoDB"
        );
        Ok(positions)
    }
}

#[async_trait]
impl PositionStore for DynamoPositionStore {
    async fn get(&self, route_id: &str, driver_id: &str) -> Result<Option<DriverPosition>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ROUTE_ATTR, AttributeValue::S(route_id.to_string()))
            .key(DRIVER_ATTR, AttributeValue::S(driver_id.to_string()))
            .send()
            .await
            .map_err(|e| unavailable("get_item", e))?;

        match result.item {
            Some(item) if !item.is_empty() => {
                debug!(
                    route_id = %route_id,
                    driver_id = %driver_id,
                    "Retrieved position from DynamoDB"
                );
                item_to_position(&item).map(Some)
            }
            _ => Ok(None),
        }
    }

    async fn query_by_route(&self, route_id: &str) -> Result<Vec<DriverPosition>> {
        self.query_partition(route_id, None).await
    }

    async fn query_by_route_filtered(
        &self,
        route_id: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<DriverPosition>> {
        self.query_partition(route_id, Some(filter)).await
    }

    async fn scan_all(&self, limit: usize) -> Result<Vec<DriverPosition>> {
        let mut positions = Vec::new();
        let mut start_key: Option<Item> = None;

        while positions.len() < limit {
            let remaining = i32::try_from(limit - positions.len()).unwrap_or(i32::MAX);
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .limit(remaining)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| unavailable("scan", e))?;

            for item in output.items.unwrap_or_default() {
                positions.push(item_to_position(&item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        positions.truncate(limit);
        debug!(limit, count = positions.len(), "Scanned positions from DynamoDB");
        Ok(positions)
    }

    async fn put(&self, position: DriverPosition) -> Result<DriverPosition> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(position_to_item(&position)))
            .send()
            .await
            .map_err(|e| unavailable("put_item", e))?;

        debug!(
            route_id = %position.route_id,
            driver_id = %position.driver_id,
            "Stored position in DynamoDB"
        );
        Ok(position)
    }

    async fn delete(&self, route_id: &str, driver_id: &str) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(ROUTE_ATTR, AttributeValue::S(route_id.to_string()))
            .key(DRIVER_ATTR, AttributeValue::S(driver_id.to_string()))
            .send()
            .await
            .map_err(|e| unavailable("delete_item", e))?;

        debug!(
            route_id = %route_id,
            driver_id = %driver_id,
            "Deleted position from DynamoDB"
        );
        Ok(())
    }
}

fn field_attr(field: PositionField) -> &'static str {
    match field {
        PositionField::Status => STATUS_ATTR,
    }
}

fn unavailable<E>(operation: &str, error: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::Unavailable(format!(
        "DynamoDB {} failed: {}",
        operation,
        DisplayErrorContext(&error)
    ))
}
