//! Logical fields and pure projections from a [`Snapshot`].
//!
//! A [`Field`] names one displayable value. [`project`] extracts that value
//! as a typed [`Reading`], applying the telemetry error tags and unit
//! conversion. Both polled and pushed data are read through here, so the
//! display boundary is the only place flow is converted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Snapshot;
use super::records::{AutoShutOffEventType, AutoShutOffReport, TelemetryMetric, ValveState};

/// Raw flow units per litre per minute.
pub const FLOW_UNITS_PER_LPM: f64 = 1000.0;

/// Converts a raw device flow value to litres per minute.
#[must_use]
pub fn flow_rate_lpm(raw: f64) -> f64 {
    raw / FLOW_UNITS_PER_LPM
}

/// Identifier of one value a subscriber can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Valve position.
    Valve,
    /// Water currently flowing.
    WaterFlowing,
    /// Flow rate in L/min.
    FlowRate,
    /// Pressure in mbar.
    Pressure,
    /// Water temperature in °C.
    Temperature,
    /// IP address.
    Ip,
    /// Default gateway.
    Gateway,
    /// Subnet mask.
    Subnet,
    /// Wi-Fi SSID.
    Ssid,
    /// Wi-Fi signal strength in dBm.
    Rssi,
    /// Wi-Fi uptime in ms.
    WifiUptime,
    /// MQTT uptime in ms.
    MqttUptime,
    /// Device uptime in ms.
    Uptime,
    /// Power supply mode.
    PowerSupply,
    /// Metered volume in ml.
    WaterMeterVolume,
    /// Metered duration in ms.
    WaterMeterDuration,
    /// Wi-Fi link flag.
    WifiConnected,
    /// MQTT link flag.
    MqttConnected,
    /// Auto shut-off armed.
    AutoShutOffEnabled,
    /// Auto shut-off volume threshold in L.
    AutoShutOffVolume,
    /// Auto shut-off duration threshold in minutes.
    AutoShutOffDuration,
    /// Time of the last auto shut-off trigger.
    ShutOffEvent,
    /// Firmware version.
    FirmwareVersion,
}

impl Field {
    /// Every field, in display order.
    pub const ALL: [Self; 23] = [
        Self::Valve,
        Self::WaterFlowing,
        Self::FlowRate,
        Self::Pressure,
        Self::Temperature,
        Self::Ip,
        Self::Gateway,
        Self::Subnet,
        Self::Ssid,
        Self::Rssi,
        Self::WifiUptime,
        Self::MqttUptime,
        Self::Uptime,
        Self::PowerSupply,
        Self::WaterMeterVolume,
        Self::WaterMeterDuration,
        Self::WifiConnected,
        Self::MqttConnected,
        Self::AutoShutOffEnabled,
        Self::AutoShutOffVolume,
        Self::AutoShutOffDuration,
        Self::ShutOffEvent,
        Self::FirmwareVersion,
    ];

    /// Snake-case name, matching the serialized form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Valve => "valve",
            Self::WaterFlowing => "water_flowing",
            Self::FlowRate => "flow_rate",
            Self::Pressure => "pressure",
            Self::Temperature => "temperature",
            Self::Ip => "ip",
            Self::Gateway => "gateway",
            Self::Subnet => "subnet",
            Self::Ssid => "ssid",
            Self::Rssi => "rssi",
            Self::WifiUptime => "wifi_uptime",
            Self::MqttUptime => "mqtt_uptime",
            Self::Uptime => "uptime",
            Self::PowerSupply => "power_supply",
            Self::WaterMeterVolume => "water_meter_volume",
            Self::WaterMeterDuration => "water_meter_duration",
            Self::WifiConnected => "wifi_connected",
            Self::MqttConnected => "mqtt_connected",
            Self::AutoShutOffEnabled => "auto_shut_off_enabled",
            Self::AutoShutOffVolume => "auto_shut_off_volume",
            Self::AutoShutOffDuration => "auto_shut_off_duration",
            Self::ShutOffEvent => "shut_off_event",
            Self::FirmwareVersion => "firmware_version",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A projected value. Serializes to a bare JSON value (`null` when unknown).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    /// Sub-record absent or metric flagged as erroring.
    Unknown,
    /// Boolean state.
    Flag(bool),
    /// Measurement.
    Float(f64),
    /// Counter or duration.
    Integer(i64),
    /// Free text.
    Text(String),
    /// Valve position.
    Valve(ValveState),
    /// Most recent automatic shut-off.
    ShutOff(ShutOffEvent),
}

/// Projection of an auto shut-off report: when it fired and what tripped it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShutOffEvent {
    /// When the valve was shut.
    pub timestamp: DateTime<Utc>,
    /// Trigger type.
    pub event_type: AutoShutOffEventType,
    /// Volume that flowed before shut-off.
    pub volume: f64,
    /// Duration of the flow before shut-off.
    pub duration: u64,
}

impl ShutOffEvent {
    /// Builds the event from a raw report. `None` for an out-of-range
    /// timestamp.
    #[must_use]
    pub fn from_report(report: &AutoShutOffReport) -> Option<Self> {
        Some(Self {
            timestamp: DateTime::from_timestamp(report.timestamp, 0)?,
            event_type: report.event_type,
            volume: report.volume,
            duration: report.duration,
        })
    }
}

impl Reading {
    /// Returns `true` for [`Reading::Unknown`].
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

fn integer(value: u64) -> Reading {
    i64::try_from(value).map_or(Reading::Unknown, Reading::Integer)
}

fn text(value: &str) -> Reading {
    Reading::Text(value.to_string())
}

fn opt<T>(value: Option<T>, f: impl FnOnce(T) -> Reading) -> Reading {
    value.map_or(Reading::Unknown, f)
}

fn telemetry_metric(snapshot: &Snapshot, metric: TelemetryMetric) -> Reading {
    let Some(telemetry) = snapshot.telemetry.as_ref() else {
        return Reading::Unknown;
    };
    if telemetry.errors.is_erroring(metric) {
        return Reading::Unknown;
    }
    let value = match metric {
        TelemetryMetric::Flow => flow_rate_lpm(telemetry.flow),
        TelemetryMetric::Pressure => telemetry.pressure,
        TelemetryMetric::Temperature => telemetry.water_temperature,
    };
    Reading::Float(value)
}

/// Whether water is flowing: the device flag, forced to `false` when either
/// record is missing or flow is flagged as erroring.
#[must_use]
pub fn water_flowing(snapshot: &Snapshot) -> bool {
    match (&snapshot.state, &snapshot.telemetry) {
        (Some(state), Some(telemetry)) => {
            state.water_flow_indicator && !telemetry.errors.is_erroring(TelemetryMetric::Flow)
        }
        _ => false,
    }
}

/// Extracts the current value of `field` from `snapshot`.
#[must_use]
pub fn project(snapshot: &Snapshot, field: Field) -> Reading {
    let state = snapshot.state.as_ref();
    let networking = snapshot.networking.as_ref();
    let aso = snapshot.auto_shut_off_state.as_ref();
    let meter = state.and_then(|s| s.water_meter.as_ref());

    match field {
        Field::Valve => opt(state, |s| Reading::Valve(s.valve_state)),
        Field::WaterFlowing => Reading::Flag(water_flowing(snapshot)),
        Field::FlowRate => telemetry_metric(snapshot, TelemetryMetric::Flow),
        Field::Pressure => telemetry_metric(snapshot, TelemetryMetric::Pressure),
        Field::Temperature => telemetry_metric(snapshot, TelemetryMetric::Temperature),
        Field::Ip => opt(networking, |n| text(&n.ip)),
        Field::Gateway => opt(networking, |n| text(&n.gateway)),
        Field::Subnet => opt(networking, |n| text(&n.subnet)),
        Field::Ssid => opt(networking, |n| text(&n.ssid)),
        Field::Rssi => opt(networking, |n| Reading::Integer(i64::from(n.rssi))),
        Field::WifiUptime => opt(networking, |n| integer(n.wifi_uptime)),
        Field::MqttUptime => opt(networking, |n| integer(n.mqtt_uptime)),
        Field::Uptime => opt(state, |s| integer(s.uptime)),
        Field::PowerSupply => opt(state, |s| text(&s.power_supply)),
        Field::WaterMeterVolume => opt(meter, |m| Reading::Float(m.volume)),
        Field::WaterMeterDuration => opt(meter, |m| integer(m.duration)),
        Field::WifiConnected => Reading::Flag(state.is_some_and(|s| s.wifi_status)),
        Field::MqttConnected => Reading::Flag(state.is_some_and(|s| s.mqtt_status)),
        Field::AutoShutOffEnabled => Reading::Flag(aso.is_some_and(|a| a.enabled)),
        Field::AutoShutOffVolume => opt(aso, |a| Reading::Float(a.volume_threshold)),
        Field::AutoShutOffDuration => opt(aso, |a| Reading::Integer(i64::from(a.duration_threshold))),
        Field::ShutOffEvent => snapshot
            .auto_shut_off_report
            .as_ref()
            .and_then(ShutOffEvent::from_report)
            .map_or(Reading::Unknown, Reading::ShutOff),
        Field::FirmwareVersion => opt(state, |s| text(&s.firmware_version)),
    }
}
