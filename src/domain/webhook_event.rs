//! Push notifications delivered by the device.
//!
//! The device POSTs `{"type": "...", "data": {...}}`. [`WebhookEvent::parse`]
//! validates the payload of every recognized type up front so that a
//! malformed event is rejected before anything is patched.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::patch::SnapshotPatch;
use super::records::{AutoShutOffReport, TelemetryErrors, ValveState};
use crate::error::BridgeError;

/// `type` tag of telemetry pushes.
pub const TELEMETRY_TYPE: &str = "telemetry";
/// `type` tag of valve movements.
pub const VALVE_TYPE: &str = "valve";
/// `type` tag of Wi-Fi changes.
pub const WIFI_CHANGED_TYPE: &str = "wifi_changed";
/// `type` tag of power supply changes.
pub const POWER_SUPPLY_CHANGED_TYPE: &str = "power_supply_changed";
/// `type` tag of auto shut-off reports.
pub const ASO_REPORT_TYPE: &str = "aso_report";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Payload of a `telemetry` push.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelemetryEvent {
    /// Raw flow value.
    pub flow: f64,
    /// Pressure in mbar.
    pub pressure: f64,
    /// Temperature in °C.
    pub temperature: f64,
    /// Metrics flagged as invalid.
    #[serde(default)]
    pub errors: Option<TelemetryErrors>,
}

/// Payload of a `valve` push.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValveEvent {
    /// New valve position.
    pub state: ValveState,
}

/// Payload of a `wifi_changed` push.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WifiChangedEvent {
    /// IPv4 address.
    pub ip: String,
    /// Default gateway.
    pub gateway: String,
    /// Subnet mask.
    pub subnet: String,
    /// SSID.
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i32,
}

/// Payload of a `power_supply_changed` push.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PowerSupplyChangedEvent {
    /// New power supply mode.
    pub supply: String,
}

/// A parsed push notification.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// Telemetry readings.
    Telemetry(TelemetryEvent),
    /// Valve position.
    Valve(ValveEvent),
    /// Wi-Fi association details.
    WifiChanged(WifiChangedEvent),
    /// Power supply mode.
    PowerSupplyChanged(PowerSupplyChangedEvent),
    /// Auto shut-off trigger.
    AsoReport(AutoShutOffReport),
    /// Any other `type`; carries the tag for logging.
    Unknown(String),
}

fn payload<T: DeserializeOwned>(event_type: &str, data: serde_json::Value) -> Result<T, BridgeError> {
    serde_json::from_value(data)
        .map_err(|e| BridgeError::MalformedEvent(format!("{event_type}: {e}")))
}

impl WebhookEvent {
    /// Parses a webhook body.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedEvent`] if the envelope has no
    /// `type`, or the `data` of a recognized type is missing required
    /// fields. Unknown types parse successfully as [`WebhookEvent::Unknown`].
    pub fn parse(body: serde_json::Value) -> Result<Self, BridgeError> {
        let envelope: Envelope = serde_json::from_value(body)
            .map_err(|e| BridgeError::MalformedEvent(e.to_string()))?;
        let Envelope { event_type, data } = envelope;

        let event = match event_type.as_str() {
            TELEMETRY_TYPE => Self::Telemetry(payload(&event_type, data)?),
            VALVE_TYPE => Self::Valve(payload(&event_type, data)?),
            WIFI_CHANGED_TYPE => Self::WifiChanged(payload(&event_type, data)?),
            POWER_SUPPLY_CHANGED_TYPE => Self::PowerSupplyChanged(payload(&event_type, data)?),
            ASO_REPORT_TYPE => Self::AsoReport(payload(&event_type, data)?),
            _ => Self::Unknown(event_type),
        };
        Ok(event)
    }

    /// Returns the `type` tag of the event.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::Telemetry(_) => TELEMETRY_TYPE,
            Self::Valve(_) => VALVE_TYPE,
            Self::WifiChanged(_) => WIFI_CHANGED_TYPE,
            Self::PowerSupplyChanged(_) => POWER_SUPPLY_CHANGED_TYPE,
            Self::AsoReport(_) => ASO_REPORT_TYPE,
            Self::Unknown(tag) => tag,
        }
    }

    /// Converts the event into the snapshot patch it implies.
    ///
    /// Returns `None` for unknown types.
    #[must_use]
    pub fn into_patch(self) -> Option<SnapshotPatch> {
        let patch = match self {
            Self::Telemetry(t) => SnapshotPatch::Telemetry {
                flow: t.flow,
                pressure: t.pressure,
                temperature: t.temperature,
                errors: t.errors.unwrap_or_default(),
            },
            Self::Valve(v) => SnapshotPatch::Valve(v.state),
            Self::WifiChanged(w) => SnapshotPatch::Wifi {
                ip: w.ip,
                gateway: w.gateway,
                subnet: w.subnet,
                ssid: w.ssid,
                rssi: w.rssi,
            },
            Self::PowerSupplyChanged(p) => SnapshotPatch::PowerSupply(p.supply),
            Self::AsoReport(report) => SnapshotPatch::AutoShutOffReport(report),
            Self::Unknown(_) => return None,
        };
        Some(patch)
    }
}
