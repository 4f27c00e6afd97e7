//! Device service: orchestrates device setup, webhooks, and commands.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::coordinator::{Coordinator, CoordinatorStatus, PatchOutcome};
use super::device_registry::DeviceRegistry;
use super::webhook_router::WebhookRouter;
use crate::client::{DeviceClient, ValveCommand};
use crate::domain::{AutoShutOffChange, DeviceId, EventBus, Field, Reading, Snapshot};
use crate::error::BridgeError;

/// Path under which devices deliver webhook events.
pub const WEBHOOK_PATH_PREFIX: &str = "/api/webhook";

/// Orchestration layer for all device operations.
///
/// Owns the [`DeviceRegistry`] and the shared [`EventBus`]. Handlers go
/// through this type rather than touching coordinators directly.
#[derive(Debug, Clone)]
pub struct DeviceService {
    registry: Arc<DeviceRegistry>,
    event_bus: EventBus,
    public_url: String,
    refresh_timeout: Duration,
}

impl DeviceService {
    /// Creates a new `DeviceService`.
    ///
    /// `public_url` is the externally reachable base URL devices push
    /// webhooks to. `refresh_timeout` bounds on-demand refreshes.
    #[must_use]
    pub fn new(
        registry: Arc<DeviceRegistry>,
        event_bus: EventBus,
        public_url: impl Into<String>,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            event_bus,
            public_url: public_url.into(),
            refresh_timeout,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub const fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns a reference to the inner [`DeviceRegistry`].
    #[must_use]
    pub const fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Timeout applied to on-demand and scheduled refreshes.
    #[must_use]
    pub const fn refresh_timeout(&self) -> Duration {
        self.refresh_timeout
    }

    /// Webhook URL a device with `device_id` should push to.
    #[must_use]
    pub fn webhook_url(&self, device_id: DeviceId) -> String {
        format!(
            "{}{WEBHOOK_PATH_PREFIX}/{device_id}",
            self.public_url.trim_end_matches('/')
        )
    }

    /// Sets up a device: registers a coordinator, performs the first
    /// refresh, and tells the device where to push events.
    ///
    /// A failed first refresh is logged and the device stays registered
    /// with no snapshot; the next scheduled refresh retries.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Device`] if the device rejects the webhook
    /// URL. The device is not left registered in that case.
    pub async fn setup_device(
        &self,
        name: &str,
        client: Arc<dyn DeviceClient>,
    ) -> Result<Arc<Coordinator>, BridgeError> {
        let device_id = DeviceId::new();
        let coordinator = Arc::new(Coordinator::new(
            device_id,
            name,
            client,
            self.event_bus.clone(),
        ));
        self.registry.insert(Arc::clone(&coordinator)).await?;
        info!(%device_id, name, "setting up device");

        if let Err(e) = coordinator.refresh_with_timeout(self.refresh_timeout).await {
            warn!(%device_id, error = %e, "first refresh failed; will retry on schedule");
        }

        let url = self.webhook_url(device_id);
        if let Err(e) = coordinator.client().set_webhook_url(&url).await {
            let _ = self.registry.remove(device_id).await;
            warn!(%device_id, error = %e, "webhook registration failed");
            return Err(e.into());
        }
        info!(%device_id, %url, "webhook registered");
        Ok(coordinator)
    }

    /// Removes a device.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceNotFound`] if the device does not exist.
    pub async fn remove_device(&self, device_id: DeviceId) -> Result<(), BridgeError> {
        let _coordinator = self.registry.remove(device_id).await?;
        info!(%device_id, "device removed");
        Ok(())
    }

    /// Returns the coordinator for `device_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceNotFound`] if the device does not exist.
    pub async fn coordinator(&self, device_id: DeviceId) -> Result<Arc<Coordinator>, BridgeError> {
        self.registry.get(device_id).await
    }

    /// Returns all coordinators.
    pub async fn list_devices(&self) -> Vec<Arc<Coordinator>> {
        self.registry.list().await
    }

    /// Routes a raw webhook body to the device registered under
    /// `webhook_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceNotFound`] for an unknown webhook id or
    /// [`BridgeError::MalformedEvent`] for a body that is not a valid event.
    pub async fn handle_webhook(
        &self,
        webhook_id: DeviceId,
        body: &[u8],
    ) -> Result<PatchOutcome, BridgeError> {
        let coordinator = self.registry.get(webhook_id).await?;
        let body: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
            warn!(device_id = %webhook_id, error = %e, "webhook body is not JSON");
            BridgeError::MalformedEvent(e.to_string())
        })?;
        WebhookRouter::new(coordinator).handle(body)
    }

    /// Point-in-time status of a device.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceNotFound`] if the device does not exist.
    pub async fn status(&self, device_id: DeviceId) -> Result<CoordinatorStatus, BridgeError> {
        Ok(self.registry.get(device_id).await?.status())
    }

    /// Every projected reading of a device, in [`Field::ALL`] order.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceNotFound`] if the device does not exist.
    pub async fn readings(&self, device_id: DeviceId) -> Result<Vec<(Field, Reading)>, BridgeError> {
        let coordinator = self.registry.get(device_id).await?;
        Ok(Field::ALL
            .iter()
            .map(|field| (*field, coordinator.reading(*field)))
            .collect())
    }

    /// Refreshes a device now.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceNotFound`] or
    /// [`BridgeError::UpdateFailed`].
    pub async fn refresh(&self, device_id: DeviceId) -> Result<Arc<Snapshot>, BridgeError> {
        let coordinator = self.registry.get(device_id).await?;
        coordinator.refresh_with_timeout(self.refresh_timeout).await
    }

    /// Opens or closes the valve of a device.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceNotFound`] or [`BridgeError::Device`].
    pub async fn set_valve(
        &self,
        device_id: DeviceId,
        command: ValveCommand,
    ) -> Result<PatchOutcome, BridgeError> {
        let coordinator = self.registry.get(device_id).await?;
        let outcome = match command {
            ValveCommand::Open => coordinator.open_valve().await?,
            ValveCommand::Close => coordinator.close_valve().await?,
        };
        info!(%device_id, ?command, "valve command sent");
        Ok(outcome)
    }

    /// Changes auto shut-off settings of a device.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DeviceNotFound`],
    /// [`BridgeError::InvalidRequest`] or [`BridgeError::Device`].
    pub async fn set_auto_shut_off(
        &self,
        device_id: DeviceId,
        change: AutoShutOffChange,
    ) -> Result<PatchOutcome, BridgeError> {
        let coordinator = self.registry.get(device_id).await?;
        let outcome = coordinator.set_auto_shut_off(change).await?;
        info!(%device_id, "auto shut-off updated");
        Ok(outcome)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::mock::{Endpoint, MockDeviceClient};
    use crate::domain::{DeviceEvent, ValveState};

    fn service() -> DeviceService {
        DeviceService::new(
            Arc::new(DeviceRegistry::new()),
            EventBus::new(16),
            "http://hass.local:8123/",
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn setup_refreshes_and_registers_webhook() {
        let service = service();
        let mut events = service.event_bus().subscribe();
        let client = Arc::new(MockDeviceClient::new());

        let Ok(coordinator) = service
            .setup_device("Sonic", Arc::clone(&client) as Arc<dyn DeviceClient>)
            .await
        else {
            panic!("setup should succeed");
        };

        let device_id = coordinator.device_id();
        assert!(coordinator.last_update_success());
        assert_eq!(
            client.calls(),
            vec![format!("webhook:http://hass.local:8123/api/webhook/{device_id}")]
        );
        assert!(matches!(
            events.try_recv(),
            Ok(DeviceEvent::SnapshotRefreshed { .. })
        ));
        assert_eq!(service.list_devices().await.len(), 1);
    }

    #[tokio::test]
    async fn setup_survives_unreachable_first_refresh() {
        let service = service();
        let client = Arc::new(MockDeviceClient::new());
        client.fail(Endpoint::Telemetry);

        let Ok(coordinator) = service
            .setup_device("Sonic", Arc::clone(&client) as Arc<dyn DeviceClient>)
            .await
        else {
            panic!("setup should succeed");
        };
        assert!(coordinator.data().is_none());
        assert!(!coordinator.last_update_success());
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn webhook_routes_to_device() {
        let service = service();
        let client: Arc<dyn DeviceClient> = Arc::new(MockDeviceClient::new());
        let Ok(coordinator) = service.setup_device("Sonic", client).await else {
            panic!("setup should succeed");
        };
        let device_id = coordinator.device_id();

        let body = json!({"type": "valve", "data": {"state": "closing"}}).to_string();
        let outcome = service.handle_webhook(device_id, body.as_bytes()).await;
        assert!(matches!(outcome, Ok(PatchOutcome::Applied { .. })));
        assert_eq!(
            coordinator.reading(Field::Valve),
            Reading::Valve(ValveState::Closing)
        );

        let unknown = service.handle_webhook(DeviceId::new(), body.as_bytes()).await;
        assert!(matches!(unknown, Err(BridgeError::DeviceNotFound(_))));

        let garbage = service.handle_webhook(device_id, b"not json").await;
        assert!(matches!(garbage, Err(BridgeError::MalformedEvent(_))));
    }

    #[tokio::test]
    async fn readings_cover_every_field() {
        let service = service();
        let client: Arc<dyn DeviceClient> = Arc::new(MockDeviceClient::new());
        let Ok(coordinator) = service.setup_device("Sonic", client).await else {
            panic!("setup should succeed");
        };

        let Ok(readings) = service.readings(coordinator.device_id()).await else {
            panic!("device exists");
        };
        assert_eq!(readings.len(), Field::ALL.len());
        assert!(
            readings
                .iter()
                .any(|(field, reading)| *field == Field::FlowRate && *reading == Reading::Float(1.2))
        );
    }

    #[tokio::test]
    async fn remove_device_forgets_it() {
        let service = service();
        let client: Arc<dyn DeviceClient> = Arc::new(MockDeviceClient::new());
        let Ok(coordinator) = service.setup_device("Sonic", client).await else {
            panic!("setup should succeed");
        };
        let device_id = coordinator.device_id();

        assert!(service.remove_device(device_id).await.is_ok());
        assert!(matches!(
            service.refresh(device_id).await,
            Err(BridgeError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn webhook_url_joins_cleanly() {
        let service = service();
        let id = DeviceId::new();
        assert_eq!(
            service.webhook_url(id),
            format!("http://hass.local:8123/api/webhook/{id}")
        );
    }
}
