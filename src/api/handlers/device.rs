//! Device read handlers: list, detail, readings, refresh.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    DeviceDetailResponse, DeviceListResponse, DeviceSummaryDto, ReadingsResponse, RefreshResponse,
};
use crate::app_state::AppState;
use crate::domain::DeviceId;
use crate::error::{BridgeError, ErrorResponse};

/// `GET /devices` — List configured devices.
#[utoipa::path(
    get,
    path = "/api/v1/devices",
    tag = "Devices",
    summary = "List devices",
    description = "Returns every configured device with its refresh status.",
    responses(
        (status = 200, description = "Device list", body = DeviceListResponse),
    )
)]
pub async fn list_devices(State(state): State<AppState>) -> impl IntoResponse {
    let data = state
        .device_service
        .list_devices()
        .await
        .iter()
        .map(|c| DeviceSummaryDto::from(c.as_ref()))
        .collect();
    Json(DeviceListResponse { data })
}

/// `GET /devices/:id` — Get the current snapshot of a device.
///
/// # Errors
///
/// Returns [`BridgeError::DeviceNotFound`] if the device does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}",
    tag = "Devices",
    summary = "Get device snapshot",
    description = "Returns the raw snapshot as last merged or patched, plus refresh status.",
    params(
        ("id" = uuid::Uuid, Path, description = "Device UUID"),
    ),
    responses(
        (status = 200, description = "Device detail", body = DeviceDetailResponse),
        (status = 404, description = "Device not found", body = ErrorResponse),
    )
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BridgeError> {
    let coordinator = state
        .device_service
        .coordinator(DeviceId::from_uuid(id))
        .await?;
    Ok(Json(DeviceDetailResponse::from(coordinator.as_ref())))
}

/// `GET /devices/:id/readings` — Get every projected reading.
///
/// # Errors
///
/// Returns [`BridgeError::DeviceNotFound`] if the device does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/devices/{id}/readings",
    tag = "Devices",
    summary = "Get device readings",
    description = "Returns each displayable field in display units. Absent or error-tagged values are null.",
    params(
        ("id" = uuid::Uuid, Path, description = "Device UUID"),
    ),
    responses(
        (status = 200, description = "Readings by field", body = ReadingsResponse),
        (status = 404, description = "Device not found", body = ErrorResponse),
    )
)]
pub async fn get_readings(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BridgeError> {
    let readings = state
        .device_service
        .readings(DeviceId::from_uuid(id))
        .await?
        .into_iter()
        .map(|(field, reading)| (field.as_str(), reading))
        .collect();
    Ok(Json(ReadingsResponse {
        device_id: id,
        readings,
    }))
}

/// `POST /devices/:id/refresh` — Poll the device now.
///
/// # Errors
///
/// Returns [`BridgeError::DeviceNotFound`] or [`BridgeError::UpdateFailed`].
#[utoipa::path(
    post,
    path = "/api/v1/devices/{id}/refresh",
    tag = "Devices",
    summary = "Refresh device",
    description = "Runs one refresh cycle. On failure the previous snapshot is kept.",
    params(
        ("id" = uuid::Uuid, Path, description = "Device UUID"),
    ),
    responses(
        (status = 200, description = "Snapshot refreshed", body = RefreshResponse),
        (status = 404, description = "Device not found", body = ErrorResponse),
        (status = 503, description = "Device unavailable", body = ErrorResponse),
    )
)]
pub async fn refresh_device(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BridgeError> {
    let device_id = DeviceId::from_uuid(id);
    state.device_service.refresh(device_id).await?;
    let status = state.device_service.status(device_id).await?;
    Ok(Json(RefreshResponse {
        device_id: id,
        last_update_success: status.last_update_success,
        last_update_at: status.last_update_at,
    }))
}

/// Device read routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/devices", get(list_devices))
        .route("/devices/{id}", get(get_device))
        .route("/devices/{id}/readings", get(get_readings))
        .route("/devices/{id}/refresh", post(refresh_device))
}
