//! Domain services.

pub mod position;

pub use position::{PositionService, ServiceError};
