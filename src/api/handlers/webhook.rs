//! Webhook receiver for device push events.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use tracing::debug;

use crate::api::dto::PatchOutcomeDto;
use crate::app_state::AppState;
use crate::domain::DeviceId;
use crate::error::{BridgeError, ErrorResponse};

/// `POST /api/webhook/:webhook_id` — Receive a device push event.
///
/// # Errors
///
/// Returns [`BridgeError::UnknownWebhook`] or
/// [`BridgeError::DeviceNotFound`] for an unknown id, and
/// [`BridgeError::MalformedEvent`] for an invalid body.
#[utoipa::path(
    post,
    path = "/api/webhook/{webhook_id}",
    tag = "Webhook",
    summary = "Receive device event",
    description = "Accepts a `{type, data}` event pushed by the device and patches the matching fields. Unknown event types are ignored.",
    params(
        ("webhook_id" = String, Path, description = "Webhook id registered with the device"),
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Event applied or ignored", body = PatchOutcomeDto),
        (status = 400, description = "Malformed event", body = ErrorResponse),
        (status = 404, description = "Unknown webhook id", body = ErrorResponse),
    )
)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(webhook_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, BridgeError> {
    let device_id: DeviceId = webhook_id
        .parse()
        .map_err(|_| BridgeError::UnknownWebhook(webhook_id))?;
    debug!(%device_id, bytes = body.len(), "webhook received");
    let outcome = state
        .device_service
        .handle_webhook(device_id, &body)
        .await?;
    Ok(Json(PatchOutcomeDto::from(outcome)))
}

/// Webhook routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/webhook/{webhook_id}", post(receive_webhook))
}
