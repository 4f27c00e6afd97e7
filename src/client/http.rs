//! `reqwest` implementation of [`DeviceClient`] for the Sonic local API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{DeviceClient, DeviceClientError, ValveCommand};
use crate::domain::{
    AutoShutOffChange, AutoShutOffReport, AutoShutOffState, DeviceState, NetworkingData,
    TelemetryData,
};

const STATE_PATH: &str = "/api/sonic/";
const TELEMETRY_PATH: &str = "/api/sonic/telemetry";
const NETWORKING_PATH: &str = "/api/sonic/networking";
const AUTO_SHUT_OFF_PATH: &str = "/api/sonic/auto-shut-off";
const AUTO_SHUT_OFF_REPORT_PATH: &str = "/api/sonic/auto-shut-off/report";
const VALVE_PATH: &str = "/api/sonic/valve";
const WEBHOOK_PATH: &str = "/api/sonic/webhook";

#[derive(Serialize)]
struct ValveBody {
    valve: ValveCommand,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AutoShutOffBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_threshold: Option<u32>,
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    url: &'a str,
}

/// HTTP client for one Sonic device.
#[derive(Debug, Clone)]
pub struct HttpDeviceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpDeviceClient {
    /// Creates a client for the device at `address`.
    ///
    /// `address` may be a bare host (`192.168.1.20`) or a full URL
    /// (`http://192.168.1.20:8080`). `timeout` bounds every request.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceClientError::InvalidAddress`] if the address cannot be
    /// parsed, or [`DeviceClientError::Transport`] if the HTTP client cannot
    /// be built.
    pub fn new(address: &str, timeout: Duration) -> Result<Self, DeviceClientError> {
        let address = address.trim();
        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };
        let base_url = Url::parse(&with_scheme)
            .map_err(|e| DeviceClientError::InvalidAddress(format!("{address}: {e}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    /// The device base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeviceClientError> {
        debug!(path, "GET device");
        let resp = self.http.get(self.url(path)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DeviceClientError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| DeviceClientError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<(), DeviceClientError> {
        debug!(%method, path, "send to device");
        let resp = self
            .http
            .request(method, self.url(path))
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeviceClientError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            })
        }
    }
}

#[async_trait]
impl DeviceClient for HttpDeviceClient {
    async fn get_state(&self) -> Result<DeviceState, DeviceClientError> {
        self.get_json(STATE_PATH).await
    }

    async fn get_telemetry(&self) -> Result<TelemetryData, DeviceClientError> {
        self.get_json(TELEMETRY_PATH).await
    }

    async fn get_networking(&self) -> Result<NetworkingData, DeviceClientError> {
        self.get_json(NETWORKING_PATH).await
    }

    async fn get_auto_shut_off(&self) -> Result<AutoShutOffState, DeviceClientError> {
        self.get_json(AUTO_SHUT_OFF_PATH).await
    }

    async fn get_auto_shut_off_report(&self) -> Result<AutoShutOffReport, DeviceClientError> {
        self.get_json(AUTO_SHUT_OFF_REPORT_PATH).await
    }

    async fn set_valve_state(&self, command: ValveCommand) -> Result<(), DeviceClientError> {
        self.send_json(Method::PUT, VALVE_PATH, &ValveBody { valve: command })
            .await
    }

    async fn patch_auto_shut_off(
        &self,
        change: &AutoShutOffChange,
    ) -> Result<(), DeviceClientError> {
        let body = AutoShutOffBody {
            enabled: change.enabled,
            volume_threshold: change.volume_threshold,
            duration_threshold: change.duration_threshold,
        };
        self.send_json(Method::PATCH, AUTO_SHUT_OFF_PATH, &body).await
    }

    async fn set_webhook_url(&self, url: &str) -> Result<(), DeviceClientError> {
        self.send_json(Method::PUT, WEBHOOK_PATH, &WebhookBody { url })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::domain::ValveState;

    async fn client_for(server: &MockServer) -> HttpDeviceClient {
        let Ok(client) = HttpDeviceClient::new(&server.uri(), Duration::from_secs(2)) else {
            panic!("mock server uri is valid");
        };
        client
    }

    #[test]
    fn bare_host_gets_http_scheme() {
        let Ok(client) = HttpDeviceClient::new("192.168.1.20", Duration::from_secs(1)) else {
            panic!("bare host accepted");
        };
        assert_eq!(client.base_url().scheme(), "http");
        assert_eq!(client.url(VALVE_PATH), "http://192.168.1.20/api/sonic/valve");
    }

    #[test]
    fn garbage_address_is_rejected() {
        assert!(matches!(
            HttpDeviceClient::new("http://", Duration::from_secs(1)),
            Err(DeviceClientError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn decodes_device_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "valveState": "open",
                "waterFlowIndicator": false,
                "mqttStatus": true,
                "wifiStatus": true,
                "powerSupply": "battery",
                "firmwareVersion": "1.0.0",
                "uptime": 100,
                "waterMeter": {"volume": 1.2, "duration": 100}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let Ok(state) = client.get_state().await else {
            panic!("state fetch should succeed");
        };
        assert_eq!(state.valve_state, ValveState::Open);
        assert_eq!(state.firmware_version, "1.0.0");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TELEMETRY_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let Err(DeviceClientError::Status { status, path }) = client.get_telemetry().await else {
            panic!("expected status error");
        };
        assert_eq!(status, 503);
        assert_eq!(path, TELEMETRY_PATH);
    }

    #[tokio::test]
    async fn wrong_shape_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(NETWORKING_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ip": 1})))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(
            client.get_networking().await,
            Err(DeviceClientError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn patch_sends_only_provided_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(AUTO_SHUT_OFF_PATH))
            .and(body_json(serde_json::json!({"volumeThreshold": 120.0})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let change = AutoShutOffChange {
            volume_threshold: Some(120.0),
            ..AutoShutOffChange::default()
        };
        assert!(client.patch_auto_shut_off(&change).await.is_ok());
    }

    #[tokio::test]
    async fn valve_and_webhook_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(VALVE_PATH))
            .and(body_json(serde_json::json!({"valve": "close"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(WEBHOOK_PATH))
            .and(body_json(
                serde_json::json!({"url": "http://hass.local/api/webhook/abc"}),
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.set_valve_state(ValveCommand::Close).await.is_ok());
        assert!(
            client
                .set_webhook_url("http://hass.local/api/webhook/abc")
                .await
                .is_ok()
        );
    }
}
