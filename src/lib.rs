//! Driver positions
//!
//! Stores the last-known position of each driver on a route, answers
//! lookups and listings, and pushes every accepted update to clients
//! watching that route.

pub mod config;
pub mod handlers;
pub mod model;
pub mod services;
pub mod storage;
pub mod utils;
