//! Availability bridge between a coordinator and its service
//!
//! ```text
//!   coordinator actor                          service
//! ┌────────────────────┐  unbounded mpsc<bool>  ┌────────────────────────┐
//! │ AvailabilityPublisher ──────────────────────▶ bridge task            │
//! │ (every write)      │   FIFO, unbounded      │  └▶ AvailabilityProperty│
//! └────────────────────┘                        │       watch + feed     │
//!                                               └────────────────────────┘
//! ```
//!
//! The publisher is owned by the coordinator and dropped exactly once, at
//! teardown, which ends the stream and the bridge task.
//!
//! The channel into the bridge and the latest-value `watch` never lose a
//! write. The change feed handed out by [`AvailabilityProperty::subscribe`]
//! is a bounded `broadcast`: a subscriber that falls more than the feed
//! capacity behind gets `RecvError::Lagged` and skips the oldest values.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};

/// Create a connected publisher / stream pair
pub fn availability_channel() -> (AvailabilityPublisher, AvailabilityStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        AvailabilityPublisher { tx },
        AvailabilityStream {
            inner: UnboundedReceiverStream::new(rx),
        },
    )
}

/// Producer side, owned by a coordinator
#[derive(Debug)]
pub struct AvailabilityPublisher {
    tx: mpsc::UnboundedSender<bool>,
}

impl AvailabilityPublisher {
    /// Push one availability write
    pub fn publish(&self, available: bool) {
        if self.tx.send(available).is_err() {
            tracing::debug!(available, "Availability consumer already gone");
        }
    }
}

/// Consumer side, read by exactly one bridge task
#[derive(Debug)]
pub struct AvailabilityStream {
    inner: UnboundedReceiverStream<bool>,
}

impl Stream for AvailabilityStream {
    type Item = bool;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<bool>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Externally observable availability
///
/// Holds the latest value for polling and watching, plus an ordered change
/// feed for observers that need every transition.
#[derive(Debug, Clone)]
pub struct AvailabilityProperty {
    latest: Arc<watch::Sender<bool>>,
    feed: broadcast::Sender<bool>,
}

impl AvailabilityProperty {
    /// Create new property, initially unavailable
    pub fn new(feed_capacity: usize) -> Self {
        let (latest, _) = watch::channel(false);
        let (feed, _) = broadcast::channel(feed_capacity.max(1));
        Self {
            latest: Arc::new(latest),
            feed,
        }
    }

    /// Current value
    pub fn get(&self) -> bool {
        *self.latest.borrow()
    }

    /// Receiver that always sees the latest value
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.latest.subscribe()
    }

    /// Ordered feed of every change published after this call
    ///
    /// Holds at most `feed_capacity` unread values per receiver; a slower
    /// receiver sees `RecvError::Lagged(n)` and resumes at the oldest value
    /// still buffered.
    pub fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.feed.subscribe()
    }

    fn set(&self, available: bool) {
        self.latest.send_replace(available);
        // No subscribers is fine
        let _ = self.feed.send(available);
    }
}

/// Spawn the long-lived task that mirrors `stream` onto `property`
pub fn spawn_bridge(
    runtime: &Handle,
    mut stream: AvailabilityStream,
    property: AvailabilityProperty,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        while let Some(available) = stream.next().await {
            property.set(available);
        }
        tracing::debug!("Availability stream closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bridge_preserves_order() {
        let (publisher, stream) = availability_channel();
        let property = AvailabilityProperty::new(16);
        let mut feed = property.subscribe();
        let task = spawn_bridge(&Handle::current(), stream, property.clone());

        for value in [true, false, true, true, false] {
            publisher.publish(value);
        }
        drop(publisher);
        task.await.unwrap();

        let mut seen = Vec::new();
        while let Ok(value) = feed.try_recv() {
            seen.push(value);
        }
        assert_eq!(seen, vec![true, false, true, true, false]);
        assert!(!property.get());
    }

    #[tokio::test]
    async fn test_bridge_ends_when_publisher_dropped() {
        let (publisher, stream) = availability_channel();
        let property = AvailabilityProperty::new(4);
        let task = spawn_bridge(&Handle::current(), stream, property.clone());

        publisher.publish(true);
        drop(publisher);

        task.await.unwrap();
        assert!(property.get());
    }

    #[tokio::test]
    async fn test_slow_feed_subscriber_lags_but_watch_does_not() {
        let (publisher, stream) = availability_channel();
        let property = AvailabilityProperty::new(2);
        let mut feed = property.subscribe();
        let task = spawn_bridge(&Handle::current(), stream, property.clone());

        for value in [true, false, true, false, true] {
            publisher.publish(value);
        }
        drop(publisher);
        task.await.unwrap();

        assert_eq!(
            feed.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(3))
        );
        assert_eq!(feed.try_recv(), Ok(false));
        assert_eq!(feed.try_recv(), Ok(true));
        assert!(property.get());
    }

    #[tokio::test]
    async fn test_watch_sees_latest() {
        let (publisher, stream) = availability_channel();
        let property = AvailabilityProperty::new(4);
        let mut watcher = property.watch();
        let _task = spawn_bridge(&Handle::current(), stream, property);

        publisher.publish(true);
        watcher.wait_for(|available| *available).await.unwrap();
        assert!(*watcher.borrow());
    }
}
