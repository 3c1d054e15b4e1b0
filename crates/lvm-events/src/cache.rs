//! Deferred delivery

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::switch::{EventSwitch, Fireable};
use crate::types::EventData;

/// Buffers fired events until [`flush`](EventCache::flush) hands them to the
/// underlying [`EventSwitch`] in firing order.
pub struct EventCache {
    switch: Arc<EventSwitch>,
    pending: Mutex<Vec<(String, EventData)>>,
}

impl EventCache {
    /// Create a cache in front of `switch`
    pub fn new(switch: Arc<EventSwitch>) -> Self {
        Self {
            switch,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Number of buffered events
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Deliver every buffered event, returning how many were delivered
    pub fn flush(&self) -> usize {
        let events = std::mem::take(&mut *self.pending.lock());
        let count = events.len();
        for (topic, data) in events {
            self.switch.fire_event(&topic, data);
        }
        debug!(events = count, "flushed event cache");
        count
    }

    /// Flush on a tokio task. Must be called from within a runtime.
    pub fn flush_in_background(self: &Arc<Self>) -> JoinHandle<usize> {
        let cache = Arc::clone(self);
        tokio::spawn(async move { cache.flush() })
    }
}

impl Fireable for EventCache {
    fn fire_event(&self, topic: &str, data: EventData) {
        self.pending.lock().push((topic.to_string(), data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventDataTx;

    #[test]
    fn test_events_held_until_flush() {
        let switch = Arc::new(EventSwitch::new());
        let mut rx = switch.add_listener_for_event("t", "topic");
        let cache = EventCache::new(switch);

        cache.fire_event("topic", EventData::Tx(EventDataTx::default()));
        assert_eq!(cache.pending(), 1);
        assert!(rx.try_recv().is_err());

        assert_eq!(cache.flush(), 1);
        assert!(rx.try_recv().is_ok());
        assert_eq!(cache.pending(), 0);
        assert_eq!(cache.flush(), 0);
    }

    #[test]
    fn test_flush_preserves_order() {
        let switch = Arc::new(EventSwitch::new());
        let mut rx = switch.add_listener_for_event("t", "topic");
        let cache = EventCache::new(switch);
        for i in 0..3u8 {
            cache.fire_event(
                "topic",
                EventData::Tx(EventDataTx {
                    return_data: vec![i],
                    ..Default::default()
                }),
            );
        }
        cache.flush();
        for i in 0..3u8 {
            match rx.try_recv().unwrap() {
                EventData::Tx(tx) => assert_eq!(tx.return_data, vec![i]),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }
}
