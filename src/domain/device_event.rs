//! Domain events reflecting snapshot changes.
//!
//! Every refresh outcome and every applied patch emits a [`DeviceEvent`]
//! through the [`super::EventBus`]. Events are broadcast to WebSocket
//! subscribers; in-process subscribers use the coordinator's callbacks.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::DeviceId;
use super::field::Field;

/// Where a patch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchSource {
    /// Pushed by the device through its webhook.
    Webhook,
    /// Optimistic update after a control command.
    Command,
}

/// Domain event emitted after every snapshot change or failed refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// A refresh cycle replaced the snapshot.
    SnapshotRefreshed {
        /// Device identifier.
        device_id: DeviceId,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A refresh cycle failed; the previous snapshot is still current.
    RefreshFailed {
        /// Device identifier.
        device_id: DeviceId,
        /// Human-readable failure reason.
        reason: String,
        /// Failure timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A patch changed the listed fields.
    FieldsPatched {
        /// Device identifier.
        device_id: DeviceId,
        /// Patch origin.
        source: PatchSource,
        /// Fields whose projected value changed.
        fields: Vec<Field>,
        /// Patch timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl DeviceEvent {
    /// Returns the device ID associated with this event.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        match self {
            Self::SnapshotRefreshed { device_id, .. }
            | Self::RefreshFailed { device_id, .. }
            | Self::FieldsPatched { device_id, .. } => *device_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::SnapshotRefreshed { .. } => "snapshot_refreshed",
            Self::RefreshFailed { .. } => "refresh_failed",
            Self::FieldsPatched { .. } => "fields_patched",
        }
    }
}
