//! DynamoDB storage implementation.
//!
//! Table schema (the `DriverPosition` table):
//! - `IdRuta`: route id, hash key (String)
//! - `IdDriver`: driver id, range key (String)
//! - `Longitude`, `Latitude`: coordinates (Number)
//! - `Speed`, `Heading`: optional (Number), omitted when unknown
//! - `Status`: lifecycle tag (String)
//! - `Timestamp`: RFC 3339 UTC instant (String)

mod item;
mod position_store;

pub use item::{item_to_position, position_to_item};
pub use position_store::DynamoPositionStore;

/// Hash key attribute.
pub const ROUTE_ATTR: &str = "IdRuta";
/// Range key attribute.
pub const DRIVER_ATTR: &str = "IdDriver";
pub const LONGITUDE_ATTR: &str = "Longitude";
pub const LATITUDE_ATTR: &str = "Latitude";
pub const SPEED_ATTR: &str = "Speed";
pub const HEADING_ATTR: &str = "Heading";
pub const STATUS_ATTR: &str = "Status";
pub const TIMESTAMP_ATTR: &str = "Timestamp";
