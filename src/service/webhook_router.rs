//! Dispatches device push events onto a coordinator's snapshot.

use std::sync::Arc;

use tracing::{debug, warn};

use super::coordinator::{Coordinator, PatchOutcome};
use crate::domain::{PatchSource, WebhookEvent};
use crate::error::BridgeError;

/// Routes webhook bodies for one device to its [`Coordinator`].
#[derive(Debug, Clone)]
pub struct WebhookRouter {
    coordinator: Arc<Coordinator>,
}

impl WebhookRouter {
    /// Creates a router bound to `coordinator`.
    #[must_use]
    pub const fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    /// The coordinator events are applied to.
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Parses `body` and applies the patch it implies.
    ///
    /// Unknown event types are ignored. A malformed body leaves the
    /// snapshot untouched and notifies nobody.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedEvent`] if `body` is not a valid
    /// event envelope or its payload is missing required fields.
    pub fn handle(&self, body: serde_json::Value) -> Result<PatchOutcome, BridgeError> {
        let device_id = self.coordinator.device_id();
        let event = WebhookEvent::parse(body).inspect_err(|e| {
            warn!(%device_id, error = %e, "dropping malformed webhook event");
        })?;
        let event_type = event.event_type().to_string();

        let Some(patch) = event.into_patch() else {
            debug!(%device_id, event_type, "ignoring unhandled webhook event type");
            return Ok(PatchOutcome::Ignored);
        };

        let outcome = self.coordinator.apply_patch(patch, PatchSource::Webhook);
        debug!(%device_id, event_type, ?outcome, "webhook event applied");
        Ok(outcome)
    }
}
