//! Conversion between `DriverPosition` and DynamoDB items.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};

use super::{
    DRIVER_ATTR, HEADING_ATTR, LATITUDE_ATTR, LONGITUDE_ATTR, ROUTE_ATTR, SPEED_ATTR,
    STATUS_ATTR, TIMESTAMP_ATTR,
};
use crate::model::{DriverPosition, DEFAULT_STATUS};
use crate::storage::{Result, StorageError};

type Item = HashMap<String, AttributeValue>;

/// Encode a position as a full item (key attributes included).
///
/// The timestamp keeps its full sub-second precision.
pub fn position_to_item(position: &DriverPosition) -> Item {
    let mut item = HashMap::new();
    item.insert(
        ROUTE_ATTR.to_string(),
        AttributeValue::S(position.route_id.clone()),
    );
    item.insert(
        DRIVER_ATTR.to_string(),
        AttributeValue::S(position.driver_id.clone()),
    );
    item.insert(LONGITUDE_ATTR.to_string(), number(position.longitude));
    item.insert(LATITUDE_ATTR.to_string(), number(position.latitude));
    if let Some(speed) = position.speed {
        item.insert(SPEED_ATTR.to_string(), number(speed));
    }
    if let Some(heading) = position.heading {
        item.insert(HEADING_ATTR.to_string(), number(heading));
    }
    item.insert(
        STATUS_ATTR.to_string(),
        AttributeValue::S(position.status.clone()),
    );
    item.insert(
        TIMESTAMP_ATTR.to_string(),
        AttributeValue::S(
            position
                .timestamp
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ),
    );
    item
}

/// Decode an item read from the table.
///
/// Items written before `Status` existed decode as [`DEFAULT_STATUS`].
pub fn item_to_position(item: &Item) -> Result<DriverPosition> {
    let timestamp = required_string(item, TIMESTAMP_ATTR)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| StorageError::Malformed(format!("{}: {}", TIMESTAMP_ATTR, e)))?
        .with_timezone(&Utc);

    Ok(DriverPosition {
        route_id: required_string(item, ROUTE_ATTR)?,
        driver_id: required_string(item, DRIVER_ATTR)?,
        longitude: required_number(item, LONGITUDE_ATTR)?,
        latitude: required_number(item, LATITUDE_ATTR)?,
        speed: optional_number(item, SPEED_ATTR)?,
        heading: optional_number(item, HEADING_ATTR)?,
        status: optional_string(item, STATUS_ATTR).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        timestamp,
    })
}

fn number(value: f64) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

fn optional_string(item: &Item, name: &str) -> Option<String> {
    match item.get(name) {
        Some(AttributeValue::S(s)) => Some(s.clone()),
        _ => None,
    }
}

fn required_string(item: &Item, name: &str) -> Result<String> {
    optional_string(item, name)
        .ok_or_else(|| StorageError::Malformed(format!("missing string attribute {}", name)))
}

fn optional_number(item: &Item, name: &str) -> Result<Option<f64>> {
    match item.get(name) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(AttributeValue::N(n)) => n
            .parse::<f64>()
            .map(Some)
            .map_err(|e| StorageError::Malformed(format!("{}: {}", name, e))),
        Some(_) => Err(StorageError::Malformed(format!(
            "attribute {} is not a number",
            name
        ))),
    }
}

fn required_number(item: &Item, name: &str) -> Result<f64> {
    optional_number(item, name)?
        .ok_or_else(|| StorageError::Malformed(format!("missing number attribute {}", name)))
}
