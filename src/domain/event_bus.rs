//! Broadcast channel for device events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel shared by every
//! coordinator. WebSocket connections subscribe to it and filter by device.

use tokio::sync::broadcast;

use super::DeviceEvent;

/// Broadcast bus for [`DeviceEvent`]s.
///
/// When the ring buffer is full, the oldest events are dropped for lagging
/// receivers; the snapshot itself is always authoritative.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DeviceEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: DeviceEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
