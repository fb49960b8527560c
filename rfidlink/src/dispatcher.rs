//! Single-subscriber event fan-out
//!
//! The dispatcher relays [`ReaderEvent`]s to at most one subscriber. A new
//! subscription replaces the previous one; events published while nobody
//! listens are dropped, never queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rfidlink_types::ReaderEvent;
use tokio::sync::mpsc;
use tracing::trace;

/// Receiver of dispatched events
///
/// Called with the subscriber lock held: implementations must not block
/// and must not call back into the dispatcher.
pub trait EventSink: Send + Sync {
    /// Hand over one event; returns `false` if the sink is gone
    fn deliver(&self, event: ReaderEvent) -> bool;
}

impl EventSink for mpsc::UnboundedSender<ReaderEvent> {
    fn deliver(&self, event: ReaderEvent) -> bool {
        self.send(event).is_ok()
    }
}

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// Last-subscriber-wins event dispatcher
#[derive(Default)]
pub struct EventDispatcher {
    sink: RwLock<Option<Arc<dyn EventSink>>>,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a sink, replacing any previous one
    ///
    /// Waits for deliveries in progress, so the old sink sees nothing
    /// published after this returns.
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        let previous = self.sink.write().replace(sink);

        if previous.is_some() {
            trace!("event subscriber replaced");
        }
    }

    /// Subscribe through an unbounded channel
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<ReaderEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(Arc::new(tx));
        rx
    }

    /// Remove the current sink
    pub fn unsubscribe(&self) {
        self.sink.write().take();
    }

    pub fn has_subscriber(&self) -> bool {
        self.sink.read().is_some()
    }

    /// Deliver an event to the current subscriber
    ///
    /// Returns `true` if a subscriber accepted it.
    pub fn publish(&self, event: ReaderEvent) -> bool {
        let sink = self.sink.read();

        let accepted = match sink.as_ref() {
            Some(sink) => {
                trace!("dispatching {}", event);
                sink.deliver(event)
            }
            None => {
                trace!("no subscriber, dropping {}", event);
                false
            }
        };

        let counter = if accepted { &self.delivered } else { &self.dropped };
        counter.fetch_add(1, Ordering::Relaxed);

        accepted
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_publish_without_subscriber() {
        let dispatcher = EventDispatcher::new();

        assert!(!dispatcher.publish(ReaderEvent::Disconnected));
        assert_eq!(dispatcher.stats(), DispatchStats { delivered: 0, dropped: 1 });
    }

    #[test]
    fn test_no_buffering_before_subscribe() {
        let dispatcher = EventDispatcher::new();
        dispatcher.publish(ReaderEvent::Trigger { pressed: true });

        let mut rx = dispatcher.subscribe_channel();
        dispatcher.publish(ReaderEvent::Trigger { pressed: false });

        assert_eq!(rx.try_recv().unwrap(), ReaderEvent::Trigger { pressed: false });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_last_subscriber_wins() {
        let dispatcher = EventDispatcher::new();

        let mut old = dispatcher.subscribe_channel();
        dispatcher.publish(ReaderEvent::Trigger { pressed: true });

        let mut new = dispatcher.subscribe_channel();
        dispatcher.publish(ReaderEvent::Disconnected);
        dispatcher.publish(ReaderEvent::Error { message: "boom".into() });

        assert_eq!(old.try_recv().unwrap(), ReaderEvent::Trigger { pressed: true });
        assert!(old.try_recv().is_err());

        assert_eq!(new.try_recv().unwrap(), ReaderEvent::Disconnected);
        assert_eq!(new.try_recv().unwrap(), ReaderEvent::Error { message: "boom".into() });
    }

    #[test]
    fn test_unsubscribe() {
        let dispatcher = EventDispatcher::new();
        let _rx = dispatcher.subscribe_channel();
        assert!(dispatcher.has_subscriber());

        dispatcher.unsubscribe();
        assert!(!dispatcher.has_subscriber());
        assert!(!dispatcher.publish(ReaderEvent::Disconnected));
    }

    #[test]
    fn test_closed_receiver_counts_as_dropped() {
        let dispatcher = EventDispatcher::new();
        drop(dispatcher.subscribe_channel());

        assert!(!dispatcher.publish(ReaderEvent::Disconnected));
        assert_eq!(dispatcher.stats().dropped, 1);
    }

    #[test]
    fn test_order_preserved() {
        let dispatcher = EventDispatcher::new();
        let mut rx = dispatcher.subscribe_channel();

        for pressed in [true, false, true] {
            dispatcher.publish(ReaderEvent::Trigger { pressed });
        }

        let received: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            received,
            vec![
                ReaderEvent::Trigger { pressed: true },
                ReaderEvent::Trigger { pressed: false },
                ReaderEvent::Trigger { pressed: true },
            ]
        );
    }
}
