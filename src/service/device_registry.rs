//! Concurrent storage of per-device coordinators.
//!
//! [`DeviceRegistry`] maps each [`DeviceId`] to its [`Coordinator`]. The
//! outer map sits behind a [`tokio::sync::RwLock`]; each coordinator does
//! its own fine-grained locking, so work on different devices never
//! contends beyond the brief map lookup.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::coordinator::Coordinator;
use crate::domain::DeviceId;
use crate::error::BridgeError;

/// Central store for all configured devices.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceId, Arc<Coordinator>>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a coordinator under its device id.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidRequest`] if a device with the same id
    /// is already registered.
    pub async fn insert(&self, coordinator: Arc<Coordinator>) -> Result<DeviceId, BridgeError> {
        let device_id = coordinator.device_id();
        let mut map = self.devices.write().await;
        if map.contains_key(&device_id) {
            return Err(BridgeError::InvalidRequest(format!(
                "device {device_id} already exists"
            )));
        }
        map.insert(device_id, coordinator);
        Ok(device_id)
    }

    /// Returns the coordinator for `device_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceNotFound`] if no such device exists.
    pub async fn get(&self, device_id: DeviceId) -> Result<Arc<Coordinator>, BridgeError> {
        self.devices
            .read()
            .await
            .get(&device_id)
            .map(Arc::clone)
            .ok_or(BridgeError::DeviceNotFound(*device_id.as_uuid()))
    }

    /// Removes a device, returning its coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceNotFound`] if no such device exists.
    pub async fn remove(&self, device_id: DeviceId) -> Result<Arc<Coordinator>, BridgeError> {
        self.devices
            .write()
            .await
            .remove(&device_id)
            .ok_or(BridgeError::DeviceNotFound(*device_id.as_uuid()))
    }

    /// Returns every registered coordinator, ordered by device id.
    pub async fn list(&self) -> Vec<Arc<Coordinator>> {
        let map = self.devices.read().await;
        let mut coordinators: Vec<_> = map.values().map(Arc::clone).collect();
        coordinators.sort_by_key(|c| c.device_id());
        coordinators
    }

    /// Returns the number of registered devices.
    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Returns `true` if no device is registered.
    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}
