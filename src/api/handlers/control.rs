//! Device control handlers: valve and auto shut-off.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{patch, post};
use axum::{Json, Router};

use crate::api::dto::{AutoShutOffRequest, PatchOutcomeDto, ValveRequest};
use crate::app_state::AppState;
use crate::domain::DeviceId;
use crate::error::{BridgeError, ErrorResponse};

/// `POST /devices/:id/valve` — Open or close the valve.
///
/// # Errors
///
/// Returns [`BridgeError::DeviceNotFound`] or [`BridgeError::Device`].
#[utoipa::path(
    post,
    path = "/api/v1/devices/{id}/valve",
    tag = "Control",
    summary = "Move the valve",
    description = "Sends the command to the device, then reports the valve as opening or closing until the device confirms.",
    params(
        ("id" = uuid::Uuid, Path, description = "Device UUID"),
    ),
    request_body = ValveRequest,
    responses(
        (status = 200, description = "Command accepted", body = PatchOutcomeDto),
        (status = 404, description = "Device not found", body = ErrorResponse),
        (status = 502, description = "Device rejected the command", body = ErrorResponse),
    )
)]
pub async fn set_valve(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<ValveRequest>,
) -> Result<impl IntoResponse, BridgeError> {
    let outcome = state
        .device_service
        .set_valve(DeviceId::from_uuid(id), req.action.into())
        .await?;
    Ok(Json(PatchOutcomeDto::from(outcome)))
}

/// `PATCH /devices/:id/auto-shut-off` — Change auto shut-off settings.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidRequest`] for an empty or out-of-range
/// change, [`BridgeError::DeviceNotFound`] or [`BridgeError::Device`].
#[utoipa::path(
    patch,
    path = "/api/v1/devices/{id}/auto-shut-off",
    tag = "Control",
    summary = "Update auto shut-off",
    description = "Changes any of the armed flag, volume threshold (50 to 1000 L) and duration threshold (5 to 500 min).",
    params(
        ("id" = uuid::Uuid, Path, description = "Device UUID"),
    ),
    request_body = AutoShutOffRequest,
    responses(
        (status = 200, description = "Settings updated", body = PatchOutcomeDto),
        (status = 400, description = "Invalid change", body = ErrorResponse),
        (status = 404, description = "Device not found", body = ErrorResponse),
        (status = 502, description = "Device rejected the change", body = ErrorResponse),
    )
)]
pub async fn set_auto_shut_off(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<AutoShutOffRequest>,
) -> Result<impl IntoResponse, BridgeError> {
    let outcome = state
        .device_service
        .set_auto_shut_off(DeviceId::from_uuid(id), req.into())
        .await?;
    Ok(Json(PatchOutcomeDto::from(outcome)))
}

/// Device control routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/devices/{id}/valve", post(set_valve))
        .route("/devices/{id}/auto-shut-off", patch(set_auto_shut_off))
}
