// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast of coordinator events across accounts.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::{CoordinatorEvent, EntryId};

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Carries the events of one or more coordinators.
///
/// Every coordinator owns a bus by default. Handing the same bus to the
/// coordinators of several accounts (see
/// [`UpdateCoordinator::with_event_bus`](crate::coordinator::UpdateCoordinator::with_event_bus))
/// lets one subscriber follow all of them, while
/// [`subscribe_entry`](Self::subscribe_entry) narrows a subscription back
/// down to a single account.
///
/// A subscriber that falls more than the capacity (256 by default) behind
/// loses the oldest events.
///
/// # Examples
///
/// ```
/// use eyeonwater::event::{CoordinatorEvent, EntryId, EventBus};
///
/// # #[tokio::main]
/// # async fn main() {
/// let bus = EventBus::new();
/// let kitchen = EntryId::new();
/// let mut events = bus.subscribe_entry(kitchen);
///
/// bus.publish(CoordinatorEvent::CycleStarted { entry_id: EntryId::new() });
/// bus.publish(CoordinatorEvent::CycleSucceeded { entry_id: kitchen, meters: 1 });
///
/// let event = events.recv().await.unwrap();
/// assert_eq!(event.entry_id(), kitchen);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoordinatorEvent>,
}

impl EventBus {
    /// Creates a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to the events of every account on this bus.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.sender.subscribe()
    }

    /// Subscribes to the events of a single account.
    #[must_use]
    pub fn subscribe_entry(&self, entry_id: EntryId) -> EntryEvents {
        EntryEvents {
            entry_id,
            receiver: self.sender.subscribe(),
        }
    }

    /// Returns the number of subscribers, filtered or not.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event. Without subscribers it is dropped.
    pub fn publish(&self, event: CoordinatorEvent) {
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!(subscribers = delivered, "Published coordinator event");
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Events of one account, received from a shared [`EventBus`].
///
/// Events of other accounts are skipped. Falling behind is logged and
/// skipped too, so [`recv`](Self::recv) only ends once every publisher is
/// gone.
#[derive(Debug)]
pub struct EntryEvents {
    entry_id: EntryId,
    receiver: broadcast::Receiver<CoordinatorEvent>,
}

impl EntryEvents {
    /// Returns the account these events belong to.
    #[must_use]
    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    /// Waits for the next event of the account.
    ///
    /// Returns `None` once the bus is closed.
    pub async fn recv(&mut self) -> Option<CoordinatorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.entry_id() == self.entry_id => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(entry = %self.entry_id, missed, "Event subscriber lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Waits until a cycle of the account ends and returns its final event,
    /// either [`CycleSucceeded`](CoordinatorEvent::CycleSucceeded) or
    /// [`CycleFailed`](CoordinatorEvent::CycleFailed).
    ///
    /// Returns `None` once the bus is closed.
    pub async fn next_cycle_end(&mut self) -> Option<CoordinatorEvent> {
        loop {
            let event = self.recv().await?;
            if event.is_cycle_end() {
                return Some(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(entry_id: EntryId) -> CoordinatorEvent {
        CoordinatorEvent::CycleStarted { entry_id }
    }

    fn succeeded(entry_id: EntryId) -> CoordinatorEvent {
        CoordinatorEvent::CycleSucceeded {
            entry_id,
            meters: 1,
        }
    }

    #[test]
    fn subscriber_count_includes_entry_subscriptions() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let all = bus.subscribe();
        let _one = bus.subscribe_entry(EntryId::new());
        assert_eq!(bus.subscriber_count(), 2);

        drop(all);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn entry_subscription_skips_other_accounts() {
        let bus = EventBus::new();
        let ours = EntryId::new();
        let theirs = EntryId::new();
        let mut events = bus.subscribe_entry(ours);
        let mut all = bus.subscribe();

        bus.publish(started(theirs));
        bus.publish(started(ours));
        bus.publish(succeeded(theirs));

        assert_eq!(events.recv().await, Some(started(ours)));
        assert_eq!(all.recv().await.unwrap(), started(theirs));
        assert_eq!(all.recv().await.unwrap(), started(ours));
    }

    #[tokio::test]
    async fn next_cycle_end_waits_past_progress_events() {
        let bus = EventBus::new();
        let ours = EntryId::new();
        let mut events = bus.subscribe_entry(ours);

        bus.publish(started(ours));
        bus.publish(CoordinatorEvent::MeterUpdated {
            entry_id: ours,
            meter_uuid: "1".to_string(),
        });
        bus.publish(succeeded(EntryId::new()));
        bus.publish(CoordinatorEvent::CycleFailed {
            entry_id: ours,
            error: "timeout".to_string(),
        });

        let end = events.next_cycle_end().await.unwrap();
        assert!(matches!(end, CoordinatorEvent::CycleFailed { .. }));
        assert_eq!(end.entry_id(), ours);
    }

    #[tokio::test]
    async fn lagging_subscription_resumes_with_newest_events() {
        let bus = EventBus::with_capacity(2);
        let ours = EntryId::new();
        let mut events = bus.subscribe_entry(ours);

        for _ in 0..4 {
            bus.publish(started(ours));
        }
        bus.publish(succeeded(ours));

        assert_eq!(events.recv().await, Some(started(ours)));
        assert_eq!(events.recv().await, Some(succeeded(ours)));
    }

    #[tokio::test]
    async fn closed_bus_ends_the_subscription() {
        let bus = EventBus::new();
        let mut events = bus.subscribe_entry(EntryId::new());

        bus.publish(started(EntryId::new()));
        drop(bus);

        assert_eq!(events.recv().await, None);
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        EventBus::with_capacity(4).publish(started(EntryId::new()));
    }
}
