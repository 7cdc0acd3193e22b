//! Event Broadcaster
//!
//! Fans progress events out to the observers of a session. Delivery is
//! best effort: nothing is buffered for observers that are not attached,
//! and a slow observer only gets a bounded send attempt before the event is
//! dropped for it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::Stream;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::ProgressEvent;

use super::channels::{create_observer_channel, EventReceiver, EventSender};

/// Default bound on one send attempt to one observer
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(250);

/// Identifies one observer of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

struct Observer {
    id: ObserverId,
    tx: EventSender,
}

/// A live subscription returned by [`EventBroadcaster::subscribe`]
pub struct Subscription {
    /// Session being observed
    pub session_id: Uuid,
    /// Handle for [`EventBroadcaster::unsubscribe`]
    pub id: ObserverId,
    rx: EventReceiver,
}

impl Subscription {
    /// Receive the next event (`None` once the broadcaster drops this observer)
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Receive without waiting
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }

    /// Turn the subscription into a stream of events
    pub fn into_stream(self) -> impl Stream<Item = ProgressEvent> + Send {
        let mut rx = self.rx;
        async_stream::stream! {
            while let Some(event) = rx.recv().await {
                yield event;
            }
        }
    }

    /// Stream events up to and including the first terminal one
    pub fn until_terminal(self) -> impl Stream<Item = ProgressEvent> + Send {
        let mut rx = self.rx;
        async_stream::stream! {
            while let Some(event) = rx.recv().await {
                let terminal = event.is_terminal();
                yield event;
                if terminal {
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("session_id", &self.session_id)
            .field("id", &self.id)
            .finish()
    }
}

/// Per-session fan-out of progress events
pub struct EventBroadcaster {
    observers: RwLock<HashMap<Uuid, Vec<Observer>>>,
    send_timeout: Duration,
    next_id: AtomicU64,
}

impl EventBroadcaster {
    /// Create a broadcaster with the default send timeout
    pub fn new() -> Self {
        Self::with_send_timeout(DEFAULT_SEND_TIMEOUT)
    }

    /// Create a broadcaster with a custom per-observer send timeout
    pub fn with_send_timeout(send_timeout: Duration) -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            send_timeout,
            next_id: AtomicU64::new(1),
        }
    }

    fn next_observer_id(&self) -> ObserverId {
        ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Subscribe to a session's events with a fresh channel
    pub async fn subscribe(&self, session_id: Uuid) -> Subscription {
        let (tx, rx) = create_observer_channel();
        let id = self.next_observer_id();
        self.attach(session_id, id, tx).await;
        Subscription { session_id, id, rx }
    }

    /// Attach an existing sender under a caller-chosen id
    ///
    /// Idempotent: attaching an id that is already present returns `false`
    /// and leaves the existing observer in place.
    pub async fn attach(&self, session_id: Uuid, id: ObserverId, tx: EventSender) -> bool {
        let mut observers = self.observers.write().await;
        let list = observers.entry(session_id).or_default();
        if list.iter().any(|o| o.id == id) {
            return false;
        }
        list.push(Observer { id, tx });
        tracing::debug!(session_id = %session_id, observer = %id, "Observer attached");
        true
    }

    /// Reserve an id for use with [`attach`](Self::attach)
    pub fn observer_id(&self) -> ObserverId {
        self.next_observer_id()
    }

    /// Remove an observer; returns whether it was attached
    pub async fn unsubscribe(&self, session_id: &Uuid, id: ObserverId) -> bool {
        let mut observers = self.observers.write().await;
        let Some(list) = observers.get_mut(session_id) else {
            return false;
        };

        let before = list.len();
        list.retain(|o| o.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            observers.remove(session_id);
        }
        if removed {
            tracing::debug!(session_id = %session_id, observer = %id, "Observer detached");
        }
        removed
    }

    /// Drop every observer of a session, ending their streams
    pub async fn remove_session(&self, session_id: &Uuid) -> usize {
        self.observers
            .write()
            .await
            .remove(session_id)
            .map(|list| list.len())
            .unwrap_or(0)
    }

    /// Drop every observer of every session
    pub async fn clear(&self) {
        self.observers.write().await.clear();
    }

    /// Number of observers attached to a session
    pub async fn observer_count(&self, session_id: &Uuid) -> usize {
        self.observers
            .read()
            .await
            .get(session_id)
            .map(|list| list.len())
            .unwrap_or(0)
    }

    /// Deliver an event to every observer of a session
    ///
    /// Returns how many observers received it. With no observers this is a
    /// no-op. Observers whose receiver is gone are pruned; observers that do
    /// not accept the event within the send timeout miss it but stay attached.
    pub async fn publish(&self, session_id: &Uuid, event: ProgressEvent) -> usize {
        let targets: Vec<(ObserverId, EventSender)> = {
            let observers = self.observers.read().await;
            match observers.get(session_id) {
                Some(list) => list.iter().map(|o| (o.id, o.tx.clone())).collect(),
                None => return 0,
            }
        };

        tracing::trace!(session_id = %session_id, event = event.name(), observers = targets.len(), "Publishing event");

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, tx) in targets {
            match tx.send_timeout(event.clone(), self.send_timeout).await {
                Ok(()) => delivered += 1,
                Err(SendTimeoutError::Closed(_)) => closed.push(id),
                Err(SendTimeoutError::Timeout(_)) => {
                    tracing::warn!(
                        session_id = %session_id,
                        observer = %id,
                        event = event.name(),
                        "Observer too slow, event dropped"
                    );
                }
            }
        }

        for id in closed {
            self.unsubscribe(session_id, id).await;
        }

        delivered
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LoopPhase;
    use futures::StreamExt;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let broadcaster = EventBroadcaster::new();
        let id = Uuid::new_v4();

        assert_eq!(broadcaster.publish(&id, ProgressEvent::final_answer("x")).await, 0);
        assert_eq!(broadcaster.publish(&id, ProgressEvent::final_answer("x")).await, 0);
        assert_eq!(broadcaster.observer_count(&id).await, 0);
    }

    #[tokio::test]
    async fn test_fan_out_preserves_order() {
        let broadcaster = EventBroadcaster::new();
        let id = Uuid::new_v4();
        let mut first = broadcaster.subscribe(id).await;
        let mut second = broadcaster.subscribe(id).await;

        broadcaster.publish(&id, ProgressEvent::status(LoopPhase::Thinking)).await;
        broadcaster.publish(&id, ProgressEvent::final_answer("done")).await;

        for sub in [&mut first, &mut second] {
            assert_eq!(sub.recv().await, Some(ProgressEvent::status(LoopPhase::Thinking)));
            assert_eq!(sub.recv().await, Some(ProgressEvent::final_answer("done")));
        }
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let broadcaster = EventBroadcaster::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut sub_a = broadcaster.subscribe(a).await;

        broadcaster.publish(&b, ProgressEvent::error("other")).await;
        assert!(sub_a.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_attach_and_unsubscribe_are_idempotent() {
        let broadcaster = EventBroadcaster::new();
        let id = Uuid::new_v4();
        let observer = broadcaster.observer_id();
        let (tx, _rx) = mpsc::channel(4);

        assert!(broadcaster.attach(id, observer, tx.clone()).await);
        assert!(!broadcaster.attach(id, observer, tx).await);
        assert_eq!(broadcaster.observer_count(&id).await, 1);

        assert!(broadcaster.unsubscribe(&id, observer).await);
        assert!(!broadcaster.unsubscribe(&id, observer).await);
        assert_eq!(broadcaster.observer_count(&id).await, 0);
    }

    #[tokio::test]
    async fn test_closed_observers_are_pruned() {
        let broadcaster = EventBroadcaster::new();
        let id = Uuid::new_v4();
        let dropped = broadcaster.subscribe(id).await;
        let mut kept = broadcaster.subscribe(id).await;
        drop(dropped);

        let delivered = broadcaster.publish(&id, ProgressEvent::final_answer("x")).await;
        assert_eq!(delivered, 1);
        assert_eq!(broadcaster.observer_count(&id).await, 1);
        assert!(kept.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_slow_observer_does_not_block() {
        let broadcaster = EventBroadcaster::with_send_timeout(Duration::from_millis(10));
        let id = Uuid::new_v4();
        let observer = broadcaster.observer_id();
        let (tx, mut rx) = mpsc::channel(1);
        broadcaster.attach(id, observer, tx).await;

        assert_eq!(broadcaster.publish(&id, ProgressEvent::error("first")).await, 1);
        // Channel full: the second event is dropped after the timeout
        assert_eq!(broadcaster.publish(&id, ProgressEvent::error("second")).await, 0);
        assert_eq!(broadcaster.observer_count(&id).await, 1);
        assert_eq!(rx.recv().await, Some(ProgressEvent::error("first")));
    }

    #[tokio::test]
    async fn test_until_terminal_stream() {
        let broadcaster = EventBroadcaster::new();
        let id = Uuid::new_v4();
        let sub = broadcaster.subscribe(id).await;

        broadcaster.publish(&id, ProgressEvent::thought("hmm")).await;
        broadcaster.publish(&id, ProgressEvent::input_requested("Which?")).await;
        broadcaster.publish(&id, ProgressEvent::thought("ignored")).await;

        let events: Vec<ProgressEvent> = sub.until_terminal().collect().await;
        assert_eq!(
            events,
            vec![ProgressEvent::thought("hmm"), ProgressEvent::input_requested("Which?")]
        );
    }

    #[tokio::test]
    async fn test_remove_session_ends_streams() {
        let broadcaster = EventBroadcaster::new();
        let id = Uuid::new_v4();
        let mut sub = broadcaster.subscribe(id).await;

        assert_eq!(broadcaster.remove_session(&id).await, 1);
        assert!(sub.recv().await.is_none());
    }
}
