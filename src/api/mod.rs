//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Device endpoints are mounted under `/api/v1`; the webhook receiver
//! lives at `/api/webhook/{webhook_id}`.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
///
/// With the `swagger-ui` feature the interactive docs are served at
/// `/swagger-ui` and the raw document at `/api-docs/openapi.json`.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::webhook::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::client::DeviceClient;
    use crate::client::mock::MockDeviceClient;
    use crate::domain::EventBus;
    use crate::service::{DeviceRegistry, DeviceService};

    struct Harness {
        app: Router,
        client: Arc<MockDeviceClient>,
        device_id: uuid::Uuid,
    }

    async fn harness() -> Harness {
        let service = Arc::new(DeviceService::new(
            Arc::new(DeviceRegistry::new()),
            EventBus::new(16),
            "http://localhost:3000",
            Duration::from_secs(1),
        ));
        let client = Arc::new(MockDeviceClient::new());
        let Ok(coordinator) = service
            .setup_device("Sonic", Arc::clone(&client) as Arc<dyn DeviceClient>)
            .await
        else {
            panic!("setup should succeed");
        };
        let device_id = *coordinator.device_id().as_uuid();
        let app = build_router().with_state(AppState::new(service));
        Harness {
            app,
            client,
            device_id,
        }
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        let Ok(request) = request else {
            panic!("valid request");
        };
        let Ok(response) = app.clone().oneshot(request).await else {
            panic!("router is infallible");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("readable body");
        };
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_devices() {
        let h = harness().await;
        let (status, body) = send(&h.app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["devices"], 1);
        assert_eq!(body["devices_updated"], 1);
    }

    #[tokio::test]
    async fn device_detail_and_unknown_device() {
        let h = harness().await;
        let uri = format!("/api/v1/devices/{}", h.device_id);
        let (status, body) = send(&h.app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["last_update_success"], true);
        assert_eq!(body["snapshot"]["state"]["valveState"], "open");
        assert_eq!(body["snapshot"]["telemetry"]["flow"], 1200.0);

        let uri = format!("/api/v1/devices/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&h.app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], 2001);
    }

    #[tokio::test]
    async fn telemetry_webhook_updates_readings() {
        let h = harness().await;
        let hook = format!("/api/webhook/{}", h.device_id);
        let event = json!({
            "type": "telemetry",
            "data": {"flow": 0, "pressure": 1015, "temperature": 20, "errors": ["temperature"]}
        });

        let (status, body) = send(&h.app, Method::POST, &hook, Some(event.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "applied");

        let (status, body) = send(&h.app, Method::POST, &hook, Some(event)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "unchanged");

        let uri = format!("/api/v1/devices/{}/readings", h.device_id);
        let (_, body) = send(&h.app, Method::GET, &uri, None).await;
        let readings = &body["readings"];
        assert_eq!(readings["water_flowing"], false);
        assert_eq!(readings["flow_rate"], 0.0);
        assert_eq!(readings["pressure"], 1015.0);
        assert_eq!(readings["temperature"], Value::Null);
    }

    #[tokio::test]
    async fn webhook_rejects_bad_bodies_and_ids() {
        let h = harness().await;
        let hook = format!("/api/webhook/{}", h.device_id);

        let (status, body) = send(
            &h.app,
            Method::POST,
            &hook,
            Some(json!({"type": "valve", "data": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 1002);

        let (status, body) = send(
            &h.app,
            Method::POST,
            &hook,
            Some(json!({"type": "something_new", "data": {"x": 1}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "ignored");

        let (status, _) = send(
            &h.app,
            Method::POST,
            "/api/webhook/not-a-device",
            Some(json!({"type": "valve", "data": {"state": "open"}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn valve_command_reaches_device() {
        let h = harness().await;
        let uri = format!("/api/v1/devices/{}/valve", h.device_id);
        let (status, body) =
            send(&h.app, Method::POST, &uri, Some(json!({"action": "close"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], json!(["valve"]));
        assert!(h.client.calls().contains(&"valve:Close".to_string()));
    }

    #[tokio::test]
    async fn auto_shut_off_bounds_are_enforced() {
        let h = harness().await;
        let uri = format!("/api/v1/devices/{}/auto-shut-off", h.device_id);

        let (status, body) = send(
            &h.app,
            Method::PATCH,
            &uri,
            Some(json!({"duration_threshold": 501})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 1001);

        let (status, body) = send(
            &h.app,
            Method::PATCH,
            &uri,
            Some(json!({"volume_threshold": 500.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], json!(["auto_shut_off_volume"]));
    }

    #[tokio::test]
    async fn refresh_failure_is_service_unavailable() {
        let h = harness().await;
        h.client.fail(crate::client::mock::Endpoint::State);
        let uri = format!("/api/v1/devices/{}/refresh", h.device_id);
        let (status, body) = send(&h.app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], 3001);
    }
}
