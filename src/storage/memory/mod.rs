//! In-memory PositionStore implementation.
//!
//! Backs standalone mode and doubles as a test spy: it counts writes and can
//! be told to fail reads or writes as if the backend were unreachable.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::model::DriverPosition;
use crate::storage::{FieldFilter, PositionStore, Result, StorageError};

/// Key type: (route_id, driver_id).
type PositionKey = (String, String);

/// In-memory position store ordered by (route, driver).
#[derive(Default)]
pub struct MemoryPositionStore {
    positions: RwLock<BTreeMap<PositionKey, DriverPosition>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with `StorageError::Unavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with `StorageError::Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `put` calls received, including failed ones.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls received, including failed ones.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub async fn stored_count(&self) -> usize {
        self.positions.read().await.len()
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "memory store reads disabled".to_string(),
            ));
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "memory store writes disabled".to_string(),
            ));
        }
        Ok(())
    }

    async fn partition<F>(&self, route_id: &str, keep: F) -> Vec<DriverPosition>
    where
        F: Fn(&DriverPosition) -> bool,
    {
        let store = self.positions.read().await;
        store
            .range((route_id.to_string(), String::new())..)
            .take_while(|((route, _), _)| route == route_id)
            .map(|(_, position)| position)
            .filter(|position| keep(position))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PositionStore for MemoryPositionStore {
    async fn get(&self, route_id: &str, driver_id: &str) -> Result<Option<DriverPosition>> {
        self.check_reads()?;
        let key = (route_id.to_string(), driver_id.to_string());
        Ok(self.positions.read().await.get(&key).cloned())
    }

    async fn query_by_route(&self, route_id: &str) -> Result<Vec<DriverPosition>> {
        self.check_reads()?;
        Ok(self.partition(route_id, |_| true).await)
    }

    async fn query_by_route_filtered(
        &self,
        route_id: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<DriverPosition>> {
        self.check_reads()?;
        Ok(self.partition(route_id, |p| filter.matches(p)).await)
    }

    async fn scan_all(&self, limit: usize) -> Result<Vec<DriverPosition>> {
        self.check_reads()?;
        let store = self.positions.read().await;
        Ok(store.values().take(limit).cloned().collect())
    }

    async fn put(&self, position: DriverPosition) -> Result<DriverPosition> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writes()?;

        let key = (position.route_id.clone(), position.driver_id.clone());
        let replaced = self
            .positions
            .write()
            .await
            .insert(key, position.clone())
            .is_some();

        debug!(
            route_id = %position.route_id,
            driver_id = %position.driver_id,
            replaced,
            "Stored position in memory"
        );
        Ok(position)
    }

    async fn delete(&self, route_id: &str, driver_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writes()?;

        let key = (route_id.to_string(), driver_id.to_string());
        self.positions.write().await.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
