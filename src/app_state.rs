//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::DeviceService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Device service for all business logic.
    pub device_service: Arc<DeviceService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Builds state around `device_service`, sharing its event bus.
    #[must_use]
    pub fn new(device_service: Arc<DeviceService>) -> Self {
        let event_bus = device_service.event_bus().clone();
        Self {
            device_service,
            event_bus,
        }
    }
}
