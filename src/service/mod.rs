//! Service layer: per-device coordination and orchestration.
//!
//! [`Coordinator`] owns one device's snapshot, [`WebhookRouter`] applies
//! pushed events to it, [`DeviceRegistry`] holds every coordinator, and
//! [`DeviceService`] ties setup, commands, and webhooks together.
//! [`spawn_refresh_loop`] keeps snapshots fresh in the background.

pub mod coordinator;
pub mod device_registry;
pub mod device_service;
pub mod scheduler;
pub mod webhook_router;

pub use coordinator::{Coordinator, CoordinatorStatus, PatchOutcome};
pub use device_registry::DeviceRegistry;
pub use device_service::DeviceService;
pub use scheduler::spawn_refresh_loop;
pub use webhook_router::WebhookRouter;
