//! Device read DTOs: list, detail, readings, refresh.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Reading, Snapshot};
use crate::service::Coordinator;

/// Device summary for list responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceSummaryDto {
    /// Device identifier, also the webhook id.
    pub device_id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Whether the most recent refresh succeeded.
    pub last_update_success: bool,
    /// Time of the last successful refresh.
    pub last_update_at: Option<DateTime<Utc>>,
    /// Firmware version from the last snapshot, if any.
    pub firmware_version: Option<String>,
}

impl From<&Coordinator> for DeviceSummaryDto {
    fn from(coordinator: &Coordinator) -> Self {
        let status = coordinator.status();
        Self {
            device_id: *coordinator.device_id().as_uuid(),
            name: coordinator.name().to_string(),
            last_update_success: status.last_update_success,
            last_update_at: status.last_update_at,
            firmware_version: status
                .data
                .as_deref()
                .and_then(|s| s.state.as_ref())
                .map(|state| state.firmware_version.clone()),
        }
    }
}

/// Response body for `GET /devices`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceListResponse {
    /// Device summaries, ordered by id.
    pub data: Vec<DeviceSummaryDto>,
}

/// Response body for `GET /devices/:id`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceDetailResponse {
    /// Device identifier.
    pub device_id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Whether the most recent refresh succeeded.
    pub last_update_success: bool,
    /// Time of the last successful refresh.
    pub last_update_at: Option<DateTime<Utc>>,
    /// Current snapshot; `null` before the first successful refresh.
    #[schema(value_type = Object)]
    pub snapshot: Option<Snapshot>,
}

impl From<&Coordinator> for DeviceDetailResponse {
    fn from(coordinator: &Coordinator) -> Self {
        let status = coordinator.status();
        Self {
            device_id: *coordinator.device_id().as_uuid(),
            name: coordinator.name().to_string(),
            last_update_success: status.last_update_success,
            last_update_at: status.last_update_at,
            snapshot: status.data.as_deref().cloned(),
        }
    }
}

/// Response body for `GET /devices/:id/readings`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingsResponse {
    /// Device identifier.
    pub device_id: uuid::Uuid,
    /// Projected value per field name; `null` when unknown.
    #[schema(value_type = Object)]
    pub readings: BTreeMap<&'static str, Reading>,
}

/// Response body for `POST /devices/:id/refresh`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    /// Device identifier.
    pub device_id: uuid::Uuid,
    /// Always `true`; failures are reported as errors.
    pub last_update_success: bool,
    /// Time of this refresh.
    pub last_update_at: Option<DateTime<Utc>>,
}
