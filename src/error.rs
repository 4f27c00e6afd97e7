//! Bridge error types with HTTP status code mapping.
//!
//! [`BridgeError`] is the central error type. Each variant maps to a
//! specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::client::DeviceClientError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "malformed webhook event: telemetry: missing field `flow`"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                   |
/// |-----------|-----------------|-------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request               |
/// | 2000–2999 | Not Found       | 404 Not Found                 |
/// | 3000–3999 | Server / Device | 500 / 502 / 503               |
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// No device is registered under the given id.
    #[error("device not found: {0}")]
    DeviceNotFound(uuid::Uuid),

    /// No device is registered under the given webhook id.
    #[error("unknown webhook: {0}")]
    UnknownWebhook(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Webhook body did not match its declared type.
    #[error("malformed webhook event: {0}")]
    MalformedEvent(String),

    /// A refresh cycle failed; the previous snapshot is still current.
    /// Retryable.
    #[error("update failed: {0}")]
    UpdateFailed(String),

    /// A device command failed.
    #[error("device error: {0}")]
    Device(#[from] DeviceClientError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MalformedEvent(_) => 1002,
            Self::DeviceNotFound(_) => 2001,
            Self::UnknownWebhook(_) => 2002,
            Self::Internal(_) => 3000,
            Self::UpdateFailed(_) => 3001,
            Self::Device(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::MalformedEvent(_) => StatusCode::BAD_REQUEST,
            Self::DeviceNotFound(_) | Self::UnknownWebhook(_) => StatusCode::NOT_FOUND,
            Self::UpdateFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Device(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` if retrying later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UpdateFailed(_) | Self::Device(_))
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
