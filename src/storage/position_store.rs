//! PositionStore trait definition.

use async_trait::async_trait;

use super::Result;
use crate::model::DriverPosition;

/// Attribute a range query can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionField {
    Status,
}

impl PositionField {
    /// Read the field from a record.
    pub fn value_of<'a>(&self, position: &'a DriverPosition) -> &'a str {
        match self {
            PositionField::Status => &position.status,
        }
    }
}

/// Equality predicate applied by the backend during a range query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: PositionField,
    pub value: String,
}

impl FieldFilter {
    pub fn status(value: impl Into<String>) -> Self {
        Self {
            field: PositionField::Status,
            value: value.into(),
        }
    }

    pub fn matches(&self, position: &DriverPosition) -> bool {
        self.field.value_of(position) == self.value
    }
}

/// Interface for driver position persistence.
///
/// # Key
///
/// Records are keyed by `(route_id, driver_id)`:
/// - `route_id`: partition key, all drivers of a route are one range query
/// - `driver_id`: range key, unique within the route
///
/// Result order of the multi-record reads is backend-defined.
///
/// # Implementations
///
/// - `MemoryPositionStore`: in-process map, standalone mode and tests
/// - `DynamoPositionStore`: DynamoDB table
/// - `TimeoutPositionStore`: bounds any other store's calls
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Point lookup. Returns `None` if no record exists for the key.
    async fn get(&self, route_id: &str, driver_id: &str) -> Result<Option<DriverPosition>>;

    /// All records in the `route_id` partition.
    async fn query_by_route(&self, route_id: &str) -> Result<Vec<DriverPosition>>;

    /// Records in the `route_id` partition matching `filter`, evaluated by the backend.
    async fn query_by_route_filtered(
        &self,
        route_id: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<DriverPosition>>;

    /// Full scan returning at most `limit` records.
    ///
    /// Reaching `limit` says nothing about whether more records exist.
    async fn scan_all(&self, limit: usize) -> Result<Vec<DriverPosition>>;

    /// Upsert: inserts the record or fully replaces the one under the same key.
    async fn put(&self, position: DriverPosition) -> Result<DriverPosition>;

    /// Remove the record. Succeeds when the key does not exist.
    async fn delete(&self, route_id: &str, driver_id: &str) -> Result<()>;
}
