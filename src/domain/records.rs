//! Sub-records returned by the Sonic local API.
//!
//! Each record mirrors one device endpoint and is stored verbatim in the
//! [`super::Snapshot`]. Field names follow the device's camelCase JSON.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Valve position as reported by the device.
///
/// Any state string the device invents later maps to [`ValveState::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValveState {
    /// Valve fully open.
    Open,
    /// Valve motor is opening.
    Opening,
    /// Valve fully closed.
    Closed,
    /// Valve motor is closing.
    Closing,
    /// Unrecognized or not yet reported.
    #[serde(other)]
    Unknown,
}

impl ValveState {
    /// Returns the wire representation of the state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Opening => "opening",
            Self::Closed => "closed",
            Self::Closing => "closing",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ValveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative water meter totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterMeter {
    /// Total volume in millilitres.
    pub volume: f64,
    /// Total flow duration in milliseconds.
    pub duration: u64,
}

/// Result of `GET /api/sonic/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    /// Current valve position.
    pub valve_state: ValveState,
    /// Whether water is currently flowing.
    pub water_flow_indicator: bool,
    /// MQTT link up.
    pub mqtt_status: bool,
    /// Wi-Fi link up.
    pub wifi_status: bool,
    /// Power supply mode (e.g. `"battery"`, `"external"`).
    pub power_supply: String,
    /// Firmware version string.
    pub firmware_version: String,
    /// Device uptime in milliseconds.
    pub uptime: u64,
    /// Water meter totals, absent on devices that never metered.
    #[serde(default)]
    pub water_meter: Option<WaterMeter>,
}

/// One of the telemetry measurements that the device can flag as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryMetric {
    /// Flow rate.
    Flow,
    /// Water pressure.
    Pressure,
    /// Water temperature.
    Temperature,
}

impl TelemetryMetric {
    /// Error tag used by the device for this metric.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Pressure => "pressure",
            Self::Temperature => "temperature",
        }
    }
}

/// Set of error tags reported alongside telemetry.
///
/// A tagged metric must be treated as absent regardless of the raw value
/// delivered next to it. Unrecognized tags are kept so the set round-trips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryErrors(BTreeSet<String>);

impl TelemetryErrors {
    /// Creates an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an error set from known metrics.
    #[must_use]
    pub fn from_metrics(metrics: &[TelemetryMetric]) -> Self {
        Self(metrics.iter().map(|m| m.tag().to_string()).collect())
    }

    /// Returns `true` if the device flagged `metric` as invalid.
    #[must_use]
    pub fn is_erroring(&self, metric: TelemetryMetric) -> bool {
        self.0.contains(metric.tag())
    }

    /// Returns `true` if no tags are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over raw tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Result of `GET /api/sonic/telemetry`.
///
/// Values are raw device units. `flow` is millilitres per minute; use
/// [`super::flow_rate_lpm`] to convert for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryData {
    /// Raw flow rate.
    pub flow: f64,
    /// Pressure in mbar.
    pub pressure: f64,
    /// Water temperature in °C.
    #[serde(rename = "temperature")]
    pub water_temperature: f64,
    /// Metrics the device currently reports as invalid.
    #[serde(default)]
    pub errors: TelemetryErrors,
}

/// Result of `GET /api/sonic/networking`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkingData {
    /// IPv4 address.
    pub ip: String,
    /// Default gateway.
    pub gateway: String,
    /// Subnet mask.
    pub subnet: String,
    /// Connected SSID.
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i32,
    /// Wi-Fi connection uptime in milliseconds.
    pub wifi_uptime: u64,
    /// MQTT connection uptime in milliseconds.
    pub mqtt_uptime: u64,
    /// Wi-Fi association state.
    #[serde(default)]
    pub wifi_connected: bool,
    /// MQTT session state.
    #[serde(default)]
    pub mqtt_connected: bool,
}

/// Result of `GET /api/sonic/auto-shut-off`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoShutOffState {
    /// Whether automatic shut-off is armed.
    pub enabled: bool,
    /// Volume threshold in litres.
    pub volume_threshold: f64,
    /// Duration threshold in minutes.
    pub duration_threshold: u32,
}

/// What tripped an automatic shut-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoShutOffEventType {
    /// Volume threshold exceeded.
    VolumeThreshold,
    /// Duration threshold exceeded.
    DurationThreshold,
    /// Unrecognized trigger.
    #[serde(other)]
    Unknown,
}

/// Result of `GET /api/sonic/auto-shut-off/report`, also pushed by the
/// `aso_report` webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoShutOffReport {
    /// Trigger type.
    #[serde(rename = "type")]
    pub event_type: AutoShutOffEventType,
    /// When the valve was shut, epoch seconds.
    pub timestamp: i64,
    /// Volume that flowed before shut-off.
    pub volume: f64,
    /// Duration of the flow before shut-off.
    pub duration: u64,
}
