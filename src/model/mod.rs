//! Driver position record and the write-side types around it.
//!
//! A position is keyed by `(route_id, driver_id)`: the route is the
//! partition key, the driver the range key. At most one record exists per key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status assigned when a save does not carry one.
pub const DEFAULT_STATUS: &str = "Active";

/// Last-known state of a driver on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPosition {
    pub route_id: String,
    pub driver_id: String,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    pub status: String,
    /// Set by the service on every successful save.
    pub timestamp: DateTime<Utc>,
}

impl DriverPosition {
    /// Whether the record carries the default lifecycle status.
    pub fn is_active(&self) -> bool {
        self.status == DEFAULT_STATUS
    }
}

/// Caller-supplied data for a save.
///
/// There is no timestamp field: any `timestamp` sent by a client is dropped
/// during deserialization and the service stamps its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPositionInput {
    #[serde(default)]
    pub route_id: String,
    #[serde(default)]
    pub driver_id: String,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

impl DriverPositionInput {
    /// Input with just the required fields.
    pub fn new(
        route_id: impl Into<String>,
        driver_id: impl Into<String>,
        longitude: f64,
        latitude: f64,
    ) -> Self {
        Self {
            route_id: route_id.into(),
            driver_id: driver_id.into(),
            longitude,
            latitude,
            speed: None,
            heading: None,
            status: None,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Check the key fields.
    ///
    /// Returns a human-readable reason for the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        validate_key(&self.route_id, &self.driver_id)
    }

    /// Build the record to persist, stamped at `now`.
    ///
    /// A missing or blank status becomes [`DEFAULT_STATUS`].
    pub fn into_position(self, now: DateTime<Utc>) -> DriverPosition {
        let status = self
            .status
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());

        DriverPosition {
            route_id: self.route_id,
            driver_id: self.driver_id,
            longitude: self.longitude,
            latitude: self.latitude,
            speed: self.speed,
            heading: self.heading,
            status,
            timestamp: now,
        }
    }
}

/// Validate a `(route_id, driver_id)` key. Whitespace-only counts as empty.
pub fn validate_key(route_id: &str, driver_id: &str) -> Result<(), String> {
    if route_id.trim().is_empty() {
        return Err("routeId is required".to_string());
    }
    if driver_id.trim().is_empty() {
        return Err("driverId is required".to_string());
    }
    Ok(())
}

/// Outcome of a save or delete as reported to callers.
///
/// Callers must check `success` before trusting `driver_position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    pub success: bool,
    pub message: String,
    pub driver_position: Option<DriverPosition>,
}

impl MutationResult {
    pub fn saved(position: DriverPosition) -> Self {
        Self {
            success: true,
            message: format!(
                "Driver position saved for route {} driver {}",
                position.route_id, position.driver_id
            ),
            driver_position: Some(position),
        }
    }

    pub fn deleted(route_id: &str, driver_id: &str) -> Self {
        Self {
            success: true,
            message: format!(
                "Driver position deleted for route {} driver {}",
                route_id, driver_id
            ),
            driver_position: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            driver_position: None,
        }
    }
}
