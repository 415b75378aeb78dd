//! Driver position service.
//!
//! Domain rules on top of a [`PositionStore`]: key validation, write
//! timestamps, default status and the active-only listing.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::model::{validate_key, DriverPosition, DriverPositionInput, MutationResult, DEFAULT_STATUS};
use crate::storage::{FieldFilter, PositionStore, StorageError};

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced by the position service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Missing or blank key fields. Rejected before the store is touched.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend unreachable, timed out, or returned an unreadable record.
    #[error("{0}")]
    StoreUnavailable(String),
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        if e.is_unavailable() {
            return ServiceError::StoreUnavailable(e.to_string());
        }
        match e {
            StorageError::Malformed(detail) => ServiceError::StoreUnavailable(format!(
                "Store returned an unreadable record: {detail}"
            )),
            other => ServiceError::StoreUnavailable(other.to_string()),
        }
    }
}

/// Driver position service.
pub struct PositionService {
    store: Arc<dyn PositionStore>,
    scan_limit: usize,
}

impl PositionService {
    /// Create a service. `scan_limit` bounds [`PositionService::list_all`].
    pub fn new(store: Arc<dyn PositionStore>, scan_limit: usize) -> Self {
        Self { store, scan_limit }
    }

    /// Validate, stamp and upsert a position.
    ///
    /// Never returns an error: failures are reported in the result with
    /// `success == false`.
    pub async fn save(&self, input: DriverPositionInput) -> MutationResult {
        match self.persist(input).await {
            Ok(position) => MutationResult::saved(position),
            Err(e) => MutationResult::failed(e.to_string()),
        }
    }

    /// Validate, stamp and upsert a position, returning the persisted record.
    ///
    /// `timestamp` is always the current time; `status` defaults to `"Active"`.
    pub async fn persist(&self, input: DriverPositionInput) -> Result<DriverPosition> {
        if let Err(reason) = input.validate() {
            warn!(
                route_id = %input.route_id,
                driver_id = %input.driver_id,
                reason = %reason,
                "Rejected driver position"
            );
            return Err(ServiceError::InvalidInput(reason));
        }

        let position = input.into_position(Utc::now());
        let route_id = position.route_id.clone();
        let driver_id = position.driver_id.clone();

        info!(route_id = %route_id, driver_id = %driver_id, "Saving driver position");

        let saved = self.store.put(position).await.map_err(|e| {
            error!(route_id = %route_id, driver_id = %driver_id, error = %e, "Failed to save driver position");
            ServiceError::from(e)
        })?;

        info!(route_id = %route_id, driver_id = %driver_id, "Saved driver position");
        Ok(saved)
    }

    /// Delete a position. Succeeds whether or not the record existed.
    pub async fn remove(&self, route_id: &str, driver_id: &str) -> MutationResult {
        if let Err(reason) = validate_key(route_id, driver_id) {
            return MutationResult::failed(ServiceError::InvalidInput(reason).to_string());
        }

        info!(route_id = %route_id, driver_id = %driver_id, "Deleting driver position");

        match self.store.delete(route_id, driver_id).await {
            Ok(()) => {
                info!(route_id = %route_id, driver_id = %driver_id, "Deleted driver position");
                MutationResult::deleted(route_id, driver_id)
            }
            Err(e) => {
                error!(route_id = %route_id, driver_id = %driver_id, error = %e, "Failed to delete driver position");
                MutationResult::failed(ServiceError::from(e).to_string())
            }
        }
    }

    /// Point lookup. `Ok(None)` when the driver has no record on the route.
    pub async fn get(&self, route_id: &str, driver_id: &str) -> Result<Option<DriverPosition>> {
        let position = self.store.get(route_id, driver_id).await.map_err(|e| {
            error!(route_id = %route_id, driver_id = %driver_id, error = %e, "Failed to get driver position");
            ServiceError::from(e)
        })?;

        if position.is_none() {
            warn!(route_id = %route_id, driver_id = %driver_id, "Driver position not found");
        }
        Ok(position)
    }

    /// All positions on a route.
    pub async fn list_by_route(&self, route_id: &str) -> Result<Vec<DriverPosition>> {
        let positions = self.store.query_by_route(route_id).await.map_err(|e| {
            error!(route_id = %route_id, error = %e, "Failed to list driver positions");
            ServiceError::from(e)
        })?;

        info!(route_id = %route_id, count = positions.len(), "Listed driver positions for route");
        Ok(positions)
    }

    /// Positions on a route whose status is `"Active"`, filtered by the store.
    pub async fn list_active_by_route(&self, route_id: &str) -> Result<Vec<DriverPosition>> {
        let filter = FieldFilter::status(DEFAULT_STATUS);
        let positions = self
            .store
            .query_by_route_filtered(route_id, &filter)
            .await
            .map_err(|e| {
                error!(route_id = %route_id, error = %e, "Failed to list active driver positions");
                ServiceError::from(e)
            })?;

        info!(route_id = %route_id, count = positions.len(), "Listed active driver positions for route");
        Ok(positions)
    }

    /// Positions across all routes, at most `scan_limit` of them.
    pub async fn list_all(&self) -> Result<Vec<DriverPosition>> {
        let positions = self.store.scan_all(self.scan_limit).await.map_err(|e| {
            error!(error = %e, "Failed to list all driver positions");
            ServiceError::from(e)
        })?;

        if positions.len() >= self.scan_limit {
            warn!(limit = self.scan_limit, "Full listing reached scan limit, result may be incomplete");
        }
        info!(count = positions.len(), "Listed all driver positions");
        Ok(positions)
    }
}
