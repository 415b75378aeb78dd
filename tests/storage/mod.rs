//! Shared storage integration tests.
//!
//! Tests the PositionStore interface against all implementations.
//! Each implementation module imports these test functions and runs them.

pub mod position_store_tests;
