//! Per-route change notifications.
//!
//! A topic is a route id with its attached subscribers. Topics are created
//! on first subscribe and removed when their last subscriber detaches.
//! Nothing is buffered for future subscribers: an event published before a
//! subscriber attaches is never seen by it.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::DriverPosition;

/// Default per-subscriber queue depth.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

type Topics = Arc<RwLock<HashMap<String, Vec<Subscriber>>>>;

/// Subscriber registration.
struct Subscriber {
    id: Uuid,
    sender: mpsc::Sender<DriverPosition>,
}

/// Registry of per-route topics.
///
/// `publish` never waits on a subscriber: delivery uses `try_send`, so a
/// subscriber whose queue is full misses the event while every other
/// subscriber still receives it.
pub struct TopicRegistry {
    topics: Topics,
    buffer: usize,
    shutdown: watch::Sender<bool>,
}

impl TopicRegistry {
    /// Create a registry with the given per-subscriber queue depth.
    pub fn new(buffer: usize) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            buffer: buffer.max(1),
            shutdown,
        }
    }

    /// Attach a subscriber to `route_id`.
    ///
    /// The returned [`Subscription`] yields every position published for the
    /// route from now on. Dropping it detaches the subscriber.
    pub async fn subscribe(&self, route_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();

        // Held by the cleanup task to observe the receiver going away
        let cleanup_tx = tx.clone();

        let count = {
            let mut topics = self.topics.write().await;
            let subscribers = topics.entry(route_id.to_string()).or_default();
            subscribers.push(Subscriber { id, sender: tx });
            subscribers.len()
        };
        info!(route_id = %route_id, subscriber_id = %id, subscribers = count, "Subscriber attached");

        // Remove the subscriber as soon as its receiver is dropped, even if
        // nothing is ever published on the route again.
        let topics = Arc::clone(&self.topics);
        let cleanup_route = route_id.to_string();
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = cleanup_tx.closed() => {}
                _ = shutdown.changed() => {}
            }
            drop(cleanup_tx);
            detach(&topics, &cleanup_route, id).await;
        });

        Subscription {
            id,
            route_id: route_id.to_string(),
            stream: ReceiverStream::new(rx),
        }
    }

    /// Deliver `position` to every subscriber of `route_id`.
    ///
    /// Returns the number of subscribers the event was queued for.
    #[tracing::instrument(name = "topics.publish", skip_all, fields(route_id = %route_id))]
    pub async fn publish(&self, route_id: &str, position: &DriverPosition) -> usize {
        let mut topics = self.topics.write().await;
        let Some(subscribers) = topics.get_mut(route_id) else {
            debug!("No subscribers for route, event dropped");
            return 0;
        };

        let mut delivered = 0;
        subscribers.retain(|sub| match sub.sender.try_send(position.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(subscriber_id = %sub.id, "Subscriber queue full, event dropped for it");
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber_id = %sub.id, "Removing disconnected subscriber during delivery");
                false
            }
        });

        let remaining = subscribers.len();
        if remaining == 0 {
            topics.remove(route_id);
            debug!("No subscribers remaining, removed topic");
        }

        debug!(delivered, remaining, "Position delivered to subscribers");
        delivered
    }

    /// Number of subscribers currently attached to `route_id`.
    pub async fn subscriber_count(&self, route_id: &str) -> usize {
        self.topics
            .read()
            .await
            .get(route_id)
            .map(|subs| subs.iter().filter(|s| !s.sender.is_closed()).count())
            .unwrap_or(0)
    }

    /// Number of routes with at least one registered subscriber.
    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }

    /// Drop every topic. Open subscriptions end after draining what they hold.
    pub async fn close_all(&self) {
        self.shutdown.send_replace(true);
        let mut topics = self.topics.write().await;
        let count: usize = topics.values().map(Vec::len).sum();
        topics.clear();
        info!(subscribers = count, "Closed all subscriptions");
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

async fn detach(topics: &Topics, route_id: &str, id: Uuid) {
    let mut topics = topics.write().await;
    if let Some(subscribers) = topics.get_mut(route_id) {
        subscribers.retain(|s| s.id != id);
        if subscribers.is_empty() {
            topics.remove(route_id);
            debug!(route_id = %route_id, "Removed last subscriber, topic cleaned up");
        }
    }
    info!(route_id = %route_id, subscriber_id = %id, "Subscriber detached");
}

/// Live feed of position changes for one route.
pub struct Subscription {
    id: Uuid,
    route_id: String,
    stream: ReceiverStream<DriverPosition>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    /// Wait for the next position. `None` once the registry has closed.
    pub async fn recv(&mut self) -> Option<DriverPosition> {
        self.stream.next().await
    }
}

impl Stream for Subscription {
    type Item = DriverPosition;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}
