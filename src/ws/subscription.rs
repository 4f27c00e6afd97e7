//! Per-connection subscription manager.
//!
//! Tracks which device IDs a WebSocket client is subscribed to and
//! provides server-side event filtering.

use std::collections::HashSet;

use crate::domain::DeviceId;

/// Manages the set of device subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed device IDs. If `subscribe_all` is true, this set is ignored.
    device_ids: HashSet<DeviceId>,
    /// Whether the client subscribes to all devices (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds device IDs to the subscription set; `wildcard` enables `"*"`.
    pub fn subscribe(&mut self, ids: &[DeviceId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.device_ids.extend(ids.iter().copied());
    }

    /// Removes device IDs from the subscription set; `wildcard` clears `"*"`.
    pub fn unsubscribe(&mut self, ids: &[DeviceId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for id in ids {
            self.device_ids.remove(id);
        }
    }

    /// Returns `true` if the given device ID matches the subscription filter.
    #[must_use]
    pub fn matches(&self, device_id: DeviceId) -> bool {
        self.subscribe_all || self.device_ids.contains(&device_id)
    }

    /// Returns the number of explicitly subscribed device IDs.
    #[must_use]
    pub fn count(&self) -> usize {
        self.device_ids.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub const fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}

/// Splits raw ids into parsed device IDs and a wildcard flag. Unparseable
/// ids are dropped.
#[must_use]
pub fn parse_device_ids(raw: &[String]) -> (Vec<DeviceId>, bool) {
    let wildcard = raw.iter().any(|s| s == "*");
    let ids = raw.iter().filter_map(|s| s.parse().ok()).collect();
    (ids, wildcard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matches_nothing() {
        let mgr = SubscriptionManager::new();
        assert!(!mgr.matches(DeviceId::new()));
    }

    #[test]
    fn subscribe_specific_device() {
        let mut mgr = SubscriptionManager::new();
        let id = DeviceId::new();
        mgr.subscribe(&[id], false);
        assert!(mgr.matches(id));
        assert!(!mgr.matches(DeviceId::new()));
    }

    #[test]
    fn wildcard_comes_and_goes() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[], true);
        assert!(mgr.matches(DeviceId::new()));
        mgr.unsubscribe(&[], true);
        assert!(!mgr.matches(DeviceId::new()));
    }

    #[test]
    fn unsubscribe_removes_device() {
        let mut mgr = SubscriptionManager::new();
        let id = DeviceId::new();
        mgr.subscribe(&[id], false);
        mgr.unsubscribe(&[id], false);
        assert!(!mgr.matches(id));
        assert_eq!(mgr.count(), 0);
    }

    #[test]
    fn parse_ids_drops_garbage() {
        let id = DeviceId::new();
        let raw = vec![id.to_string(), "*".to_string(), "nope".to_string()];
        let (ids, wildcard) = parse_device_ids(&raw);
        assert_eq!(ids, vec![id]);
        assert!(wildcard);
    }
}
