//! Topic router

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::trace;

use crate::types::EventData;

/// Receiving half of a subscription
pub type EventReceiver = mpsc::UnboundedReceiver<EventData>;

/// Anything events can be fired into
pub trait Fireable: Send + Sync {
    /// Publish `data` under `topic`
    fn fire_event(&self, topic: &str, data: EventData);
}

struct Listener {
    id: String,
    tx: mpsc::UnboundedSender<EventData>,
}

/// Routes fired events to subscribed channels.
///
/// Delivery never blocks the producer. Subscriptions whose receiver has been
/// dropped are pruned on the next event for their topic.
#[derive(Default)]
pub struct EventSwitch {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
}

impl EventSwitch {
    /// Create a switch with no subscriptions
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener_id` to `topic`
    pub fn add_listener_for_event(&self, listener_id: &str, topic: &str) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(Listener {
                id: listener_id.to_string(),
                tx,
            });
        rx
    }

    /// Drop every subscription held by `listener_id`
    pub fn remove_listener(&self, listener_id: &str) {
        let mut listeners = self.listeners.write();
        for subs in listeners.values_mut() {
            subs.retain(|l| l.id != listener_id);
        }
        listeners.retain(|_, subs| !subs.is_empty());
    }

    /// Drop `listener_id`'s subscription to `topic`
    pub fn remove_listener_for_event(&self, topic: &str, listener_id: &str) {
        let mut listeners = self.listeners.write();
        if let Some(subs) = listeners.get_mut(topic) {
            subs.retain(|l| l.id != listener_id);
            if subs.is_empty() {
                listeners.remove(topic);
            }
        }
    }

    /// Number of live subscriptions to `topic`
    pub fn listener_count(&self, topic: &str) -> usize {
        self.listeners.read().get(topic).map(Vec::len).unwrap_or(0)
    }
}

impl Fireable for EventSwitch {
    fn fire_event(&self, topic: &str, data: EventData) {
        let mut listeners = self.listeners.write();
        let Some(subs) = listeners.get_mut(topic) else {
            return;
        };
        trace!(topic, listeners = subs.len(), "firing event");
        subs.retain(|l| l.tx.send(data.clone()).is_ok());
        if subs.is_empty() {
            listeners.remove(topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventDataTx;

    fn tx_event(exception: &str) -> EventData {
        EventData::Tx(EventDataTx {
            exception: exception.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_routes_by_topic() {
        let switch = EventSwitch::new();
        let mut a = switch.add_listener_for_event("l1", "A");
        let mut b = switch.add_listener_for_event("l2", "B");

        switch.fire_event("A", tx_event("a"));
        assert_eq!(a.try_recv().unwrap(), tx_event("a"));
        assert!(b.try_recv().is_err());
    }

    #[test]
    fn test_multiple_listeners_same_topic() {
        let switch = EventSwitch::new();
        let mut a = switch.add_listener_for_event("l1", "T");
        let mut b = switch.add_listener_for_event("l2", "T");
        switch.fire_event("T", tx_event(""));
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
    }

    #[test]
    fn test_remove_listener() {
        let switch = EventSwitch::new();
        let _a = switch.add_listener_for_event("l1", "A");
        let _b = switch.add_listener_for_event("l1", "B");
        let _c = switch.add_listener_for_event("l2", "B");
        switch.remove_listener("l1");
        assert_eq!(switch.listener_count("A"), 0);
        assert_eq!(switch.listener_count("B"), 1);

        switch.remove_listener_for_event("B", "l2");
        assert_eq!(switch.listener_count("B"), 0);
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let switch = EventSwitch::new();
        let rx = switch.add_listener_for_event("l1", "A");
        drop(rx);
        switch.fire_event("A", tx_event(""));
        assert_eq!(switch.listener_count("A"), 0);
    }

    #[test]
    fn test_fire_without_listeners_is_noop() {
        let switch = EventSwitch::new();
        switch.fire_event("nobody", tx_event(""));
        assert_eq!(switch.listener_count("nobody"), 0);
    }
}
