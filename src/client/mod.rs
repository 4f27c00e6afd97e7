//! Device client capability.
//!
//! [`DeviceClient`] is the only way the coordinator talks to a Sonic
//! device. [`HttpDeviceClient`] implements it against the device's local
//! REST API; tests substitute an in-memory double.

pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{
    AutoShutOffChange, AutoShutOffReport, AutoShutOffState, DeviceState, NetworkingData,
    TelemetryData,
};

pub use http::HttpDeviceClient;

/// Failure talking to a device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceClientError {
    /// Connection, TLS, or timeout failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The device answered with a non-success status.
    #[error("device returned {status} for {path}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request path.
        path: String,
    },

    /// The response body did not match the expected record.
    #[error("invalid response from {path}: {message}")]
    Decode {
        /// Request path.
        path: String,
        /// Decoder message.
        message: String,
    },

    /// The configured device address is not a usable URL.
    #[error("invalid device address: {0}")]
    InvalidAddress(String),
}

/// Valve command accepted by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValveCommand {
    /// Open the valve.
    Open,
    /// Close the valve.
    Close,
}

/// Async capability exposed by a Sonic device.
///
/// Implementations must be cheap to share behind an `Arc`; the coordinator
/// issues the five read calls concurrently.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Valve, link, power and meter state.
    async fn get_state(&self) -> Result<DeviceState, DeviceClientError>;

    /// Flow, pressure and temperature readings.
    async fn get_telemetry(&self) -> Result<TelemetryData, DeviceClientError>;

    /// Wi-Fi and MQTT link details.
    async fn get_networking(&self) -> Result<NetworkingData, DeviceClientError>;

    /// Auto shut-off configuration.
    async fn get_auto_shut_off(&self) -> Result<AutoShutOffState, DeviceClientError>;

    /// Last auto shut-off trigger.
    async fn get_auto_shut_off_report(&self) -> Result<AutoShutOffReport, DeviceClientError>;

    /// Moves the valve.
    async fn set_valve_state(&self, command: ValveCommand) -> Result<(), DeviceClientError>;

    /// Changes the provided auto shut-off settings.
    async fn patch_auto_shut_off(&self, change: &AutoShutOffChange)
    -> Result<(), DeviceClientError>;

    /// Registers the URL the device pushes webhook events to.
    async fn set_webhook_url(&self, url: &str) -> Result<(), DeviceClientError>;
}
