//! Request timeout decorator for any PositionStore.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::error;

use crate::model::DriverPosition;
use crate::storage::{FieldFilter, PositionStore, Result, StorageError};

/// Bounds every call on the inner store.
///
/// A call that does not finish within `timeout` yields
/// `StorageError::Timeout`; the inner future is dropped.
pub struct TimeoutPositionStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimeoutPositionStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                error!(operation, timeout = ?self.timeout, "Store request timed out");
                Err(StorageError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl<S: PositionStore> PositionStore for TimeoutPositionStore<S> {
    async fn get(&self, route_id: &str, driver_id: &str) -> Result<Option<DriverPosition>> {
        self.bounded("get", self.inner.get(route_id, driver_id))
            .await
    }

    async fn query_by_route(&self, route_id: &str) -> Result<Vec<DriverPosition>> {
        self.bounded("query_by_route", self.inner.query_by_route(route_id))
            .await
    }

    async fn query_by_route_filtered(
        &self,
        route_id: &str,
        filter: &FieldFilter,
    ) -> Result<Vec<DriverPosition>> {
        self.bounded(
            "query_by_route_filtered",
            self.inner.query_by_route_filtered(route_id, filter),
        )
        .await
    }

    async fn scan_all(&self, limit: usize) -> Result<Vec<DriverPosition>> {
        self.bounded("scan_all", self.inner.scan_all(limit)).await
    }

    async fn put(&self, position: DriverPosition) -> Result<DriverPosition> {
        self.bounded("put", self.inner.put(position)).await
    }

    async fn delete(&self, route_id: &str, driver_id: &str) -> Result<()> {
        self.bounded("delete", self.inner.delete(route_id, driver_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::storage::MemoryPositionStore;

    /// Store whose calls never complete.
    #[derive(Default)]
    struct StalledStore {
        calls: AtomicUsize,
    }

    impl StalledStore {
        async fn stall<T>(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            futures::future::pending().await
        }
    }

    #[async_trait]
    impl PositionStore for StalledStore {
        async fn get(&self, _: &str, _: &str) -> Result<Option<DriverPosition>> {
            self.stall().await
        }
        async fn query_by_route(&self, _: &str) -> Result<Vec<DriverPosition>> {
            self.stall().await
        }
        async fn query_by_route_filtered(
            &self,
            _: &str,
            _: &FieldFilter,
        ) -> Result<Vec<DriverPosition>> {
            self.stall().await
        }
        async fn scan_all(&self, _: usize) -> Result<Vec<DriverPosition>> {
            self.stall().await
        }
        async fn put(&self, _: DriverPosition) -> Result<DriverPosition> {
            self.stall().await
        }
        async fn delete(&self, _: &str, _: &str) -> Result<()> {
            self.stall().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_store_times_out() {
        let store = TimeoutPositionStore::new(StalledStore::default(), Duration::from_millis(200));

        let err = store.get("R1", "D1").await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout(d) if d == Duration::from_millis(200)));
        assert!(err.is_unavailable());

        assert!(store.scan_all(5).await.is_err());
        assert!(store.delete("R1", "D1").await.is_err());
        assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fast_store_passes_through() {
        let store = TimeoutPositionStore::new(MemoryPositionStore::new(), Duration::from_secs(1));

        assert!(store.get("R1", "D1").await.unwrap().is_none());
        store.delete("R1", "D1").await.unwrap();
        assert_eq!(store.inner().delete_calls(), 1);
    }
}
