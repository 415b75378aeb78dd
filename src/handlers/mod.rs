//! Request handling: operation dispatch, change notifications and HTTP.

pub mod gateway;
pub mod stream;

#[cfg(feature = "http")]
pub mod rest;
