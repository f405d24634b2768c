//! Transport notifications.
//!
//! Every tick publishes, in order, one [`TransportEvent::Step`] per voice whose
//! current step is active, then one [`TransportEvent::StepChange`] with the new
//! cursor. `stop()` publishes [`TransportEvent::Stop`].
//!
//! Two kinds of subscriber:
//!
//! - [`TransportListener`]s are called synchronously on the control thread.
//!   The [`Engine`](super::Engine) is one; that is how steps become notes.
//! - Channel subscriptions ([`EventBus::subscribe`]) get a copy of every event
//!   through a bounded channel. A slow reader loses events rather than
//!   stalling the clock.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::debug;

use crate::sequencing::Step;

/// Events queued per channel subscriber before new ones are dropped.
pub const SUBSCRIPTION_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// Voice `voice` plays `step` on this tick.
    Step { voice: usize, step: Step },
    /// The cursor moved to `step`.
    StepChange { step: usize },
    /// The transport was stopped.
    Stop,
}

pub trait TransportListener {
    fn on_event(&mut self, event: &TransportEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Receiving end of a channel subscription.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub receiver: Receiver<TransportEvent>,
}

impl Subscription {
    /// Everything queued right now, without blocking.
    pub fn drain(&self) -> Vec<TransportEvent> {
        self.receiver.try_iter().collect()
    }
}

struct Subscriber {
    id: SubscriptionId,
    sender: Sender<TransportEvent>,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Subscription {
        self.subscribe_with_capacity(SUBSCRIPTION_CAPACITY)
    }

    /// A capacity of 0 is raised to 1.
    pub fn subscribe_with_capacity(&mut self, capacity: usize) -> Subscription {
        let capacity = capacity.max(1);
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, sender });
        debug!(id = id.0, capacity, "transport subscription added");
        Subscription { id, receiver }
    }

    /// Returns whether `id` was subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        before != self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Hand `event` to every channel subscriber without blocking.
    pub fn publish(&mut self, event: TransportEvent) {
        self.subscribers.retain(|sub| match sub.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(id = sub.id.0, ?event, "subscriber queue full, event dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!(id = sub.id.0, "subscriber gone");
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_see_events_in_order() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe();

        bus.publish(TransportEvent::StepChange { step: 1 });
        bus.publish(TransportEvent::Stop);

        assert_eq!(
            sub.drain(),
            vec![TransportEvent::StepChange { step: 1 }, TransportEvent::Stop]
        );
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let keep = bus.subscribe();
        let gone = bus.subscribe();

        assert!(bus.unsubscribe(gone.id));
        assert!(!bus.unsubscribe(gone.id));
        bus.publish(TransportEvent::Stop);

        assert_eq!(keep.drain(), vec![TransportEvent::Stop]);
        assert!(gone.drain().is_empty());
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe();
        drop(sub);
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(TransportEvent::Stop);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe_with_capacity(2);
        for step in 0..5 {
            bus.publish(TransportEvent::StepChange { step });
        }

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], TransportEvent::StepChange { step: 0 });
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_zero_capacity_still_receives() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe_with_capacity(0);
        bus.publish(TransportEvent::StepChange { step: 3 });
        bus.publish(TransportEvent::Stop);

        assert_eq!(sub.drain(), vec![TransportEvent::StepChange { step: 3 }]);
    }
}
