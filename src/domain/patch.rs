//! Localized snapshot mutations.
//!
//! A [`SnapshotPatch`] rewrites a narrow slice of a [`Snapshot`]. Patches
//! come from webhook events and from optimistic updates after a control
//! command. Applying a patch is all-or-nothing.

use super::Snapshot;
use super::field::Field;
use super::records::{
    AutoShutOffReport, TelemetryData, TelemetryErrors, TelemetryMetric, ValveState,
};

/// Partial update to the auto shut-off configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoShutOffChange {
    /// New armed flag.
    pub enabled: Option<bool>,
    /// New volume threshold in litres.
    pub volume_threshold: Option<f64>,
    /// New duration threshold in minutes.
    pub duration_threshold: Option<u32>,
}

impl AutoShutOffChange {
    /// Returns `true` if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.volume_threshold.is_none() && self.duration_threshold.is_none()
    }
}

/// A targeted change to one device subsystem.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotPatch {
    /// Fresh telemetry pushed by the device.
    Telemetry {
        /// Raw flow value.
        flow: f64,
        /// Pressure in mbar.
        pressure: f64,
        /// Temperature in °C.
        temperature: f64,
        /// Metrics flagged as invalid in this push.
        errors: TelemetryErrors,
    },
    /// Valve moved.
    Valve(ValveState),
    /// Wi-Fi association changed.
    Wifi {
        /// IPv4 address.
        ip: String,
        /// Default gateway.
        gateway: String,
        /// Subnet mask.
        subnet: String,
        /// SSID.
        ssid: String,
        /// Signal strength in dBm.
        rssi: i32,
    },
    /// Power supply mode changed.
    PowerSupply(String),
    /// An auto shut-off was triggered.
    AutoShutOffReport(AutoShutOffReport),
    /// Auto shut-off configuration was changed through the device API.
    AutoShutOff(AutoShutOffChange),
}

impl SnapshotPatch {
    /// Fields whose projection this patch can change.
    #[must_use]
    pub const fn fields(&self) -> &'static [Field] {
        match self {
            Self::Telemetry { .. } => &[
                Field::WaterFlowing,
                Field::FlowRate,
                Field::Pressure,
                Field::Temperature,
            ],
            Self::Valve(_) => &[Field::Valve],
            Self::Wifi { .. } => &[
                Field::Ip,
                Field::Gateway,
                Field::Subnet,
                Field::Ssid,
                Field::Rssi,
            ],
            Self::PowerSupply(_) => &[Field::PowerSupply],
            Self::AutoShutOffReport(_) => &[Field::ShutOffEvent],
            Self::AutoShutOff(_) => &[
                Field::AutoShutOffEnabled,
                Field::AutoShutOffVolume,
                Field::AutoShutOffDuration,
            ],
        }
    }

    /// Applies the patch in place.
    ///
    /// Returns `false` and leaves `snapshot` untouched when the sub-record
    /// the patch targets is absent, since a sub-record is never partially
    /// populated. Telemetry pushes carry every telemetry value and may
    /// create the record; the report replaces its record wholesale.
    pub fn apply(&self, snapshot: &mut Snapshot) -> bool {
        match self {
            Self::Telemetry {
                flow,
                pressure,
                temperature,
                errors,
            } => {
                if let Some(state) = snapshot.state.as_mut() {
                    state.water_flow_indicator =
                        !errors.is_erroring(TelemetryMetric::Flow) && *flow != 0.0;
                }
                let telemetry = snapshot.telemetry.get_or_insert_with(|| TelemetryData {
                    flow: *flow,
                    pressure: *pressure,
                    water_temperature: *temperature,
                    errors: TelemetryErrors::new(),
                });
                telemetry.flow = *flow;
                telemetry.pressure = *pressure;
                telemetry.water_temperature = *temperature;
                telemetry.errors = errors.clone();
                true
            }
            Self::Valve(valve_state) => match snapshot.state.as_mut() {
                Some(state) => {
                    state.valve_state = *valve_state;
                    true
                }
                None => false,
            },
            Self::Wifi {
                ip,
                gateway,
                subnet,
                ssid,
                rssi,
            } => match snapshot.networking.as_mut() {
                Some(networking) => {
                    networking.ip.clone_from(ip);
                    networking.gateway.clone_from(gateway);
                    networking.subnet.clone_from(subnet);
                    networking.ssid.clone_from(ssid);
                    networking.rssi = *rssi;
                    true
                }
                None => false,
            },
            Self::PowerSupply(supply) => match snapshot.state.as_mut() {
                Some(state) => {
                    state.power_supply.clone_from(supply);
                    true
                }
                None => false,
            },
            Self::AutoShutOffReport(report) => {
                snapshot.auto_shut_off_report = Some(report.clone());
                true
            }
            Self::AutoShutOff(change) => match snapshot.auto_shut_off_state.as_mut() {
                Some(aso) => {
                    if let Some(enabled) = change.enabled {
                        aso.enabled = enabled;
                    }
                    if let Some(volume) = change.volume_threshold {
                        aso.volume_threshold = volume;
                    }
                    if let Some(duration) = change.duration_threshold {
                        aso.duration_threshold = duration;
                    }
                    true
                }
                None => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::field::{Reading, project};
    use crate::domain::records::{
        AutoShutOffEventType, AutoShutOffState, DeviceState, NetworkingData,
    };

    fn populated() -> Snapshot {
        Snapshot {
            state: Some(DeviceState {
                valve_state: ValveState::Open,
                water_flow_indicator: false,
                mqtt_status: true,
                wifi_status: true,
                power_supply: "battery".to_string(),
                firmware_version: "1.0.0".to_string(),
                uptime: 1,
                water_meter: None,
            }),
            telemetry: Some(TelemetryData {
                flow: 0.0,
                pressure: 900.0,
                water_temperature: 12.0,
                errors: TelemetryErrors::new(),
            }),
            networking: Some(NetworkingData {
                ip: "10.0.0.2".to_string(),
                gateway: "10.0.0.1".to_string(),
                subnet: "255.255.255.0".to_string(),
                ssid: "old".to_string(),
                rssi: -70,
                wifi_uptime: 10,
                mqtt_uptime: 10,
                wifi_connected: true,
                mqtt_connected: true,
            }),
            auto_shut_off_state: Some(AutoShutOffState {
                enabled: false,
                volume_threshold: 100.0,
                duration_threshold: 30,
            }),
            auto_shut_off_report: None,
        }
    }

    #[test]
    fn telemetry_sets_values_and_flow_indicator() {
        let mut snapshot = populated();
        let patch = SnapshotPatch::Telemetry {
            flow: 150.0,
            pressure: 1015.0,
            temperature: 20.0,
            errors: TelemetryErrors::new(),
        };
        assert!(patch.apply(&mut snapshot));
        assert_eq!(project(&snapshot, Field::WaterFlowing), Reading::Flag(true));
        assert_eq!(project(&snapshot, Field::FlowRate), Reading::Float(0.15));
        assert_eq!(project(&snapshot, Field::Pressure), Reading::Float(1015.0));
        assert_eq!(project(&snapshot, Field::Temperature), Reading::Float(20.0));
    }

    #[test]
    fn erroring_flow_clears_indicator() {
        let mut snapshot = populated();
        if let Some(state) = snapshot.state.as_mut() {
            state.water_flow_indicator = true;
        }
        let patch = SnapshotPatch::Telemetry {
            flow: 1200.0,
            pressure: 1015.0,
            temperature: 20.0,
            errors: TelemetryErrors::from_metrics(&[TelemetryMetric::Flow]),
        };
        assert!(patch.apply(&mut snapshot));
        assert!(project(&snapshot, Field::FlowRate).is_unknown());
        assert_eq!(snapshot.state.map(|s| s.water_flow_indicator), Some(false));
    }

    #[test]
    fn valve_patch_touches_only_valve() {
        let before = populated();
        let mut after = before.clone();
        assert!(SnapshotPatch::Valve(ValveState::Opening).apply(&mut after));

        assert_eq!(project(&after, Field::Valve), Reading::Valve(ValveState::Opening));
        let mut expected = before;
        if let Some(state) = expected.state.as_mut() {
            state.valve_state = ValveState::Opening;
        }
        assert_eq!(after, expected);
    }

    #[test]
    fn wifi_patch_needs_networking_record() {
        let mut snapshot = Snapshot::default();
        let patch = SnapshotPatch::Wifi {
            ip: "10.0.0.9".to_string(),
            gateway: "10.0.0.1".to_string(),
            subnet: "255.255.255.0".to_string(),
            ssid: "new".to_string(),
            rssi: -40,
        };
        assert!(!patch.apply(&mut snapshot));
        assert_eq!(snapshot, Snapshot::default());

        let mut snapshot = populated();
        assert!(patch.apply(&mut snapshot));
        assert_eq!(project(&snapshot, Field::Ssid), Reading::Text("new".to_string()));
        assert_eq!(project(&snapshot, Field::WifiUptime), Reading::Integer(10));
    }

    #[test]
    fn report_patch_creates_record() {
        let mut snapshot = Snapshot::default();
        let report = AutoShutOffReport {
            event_type: AutoShutOffEventType::VolumeThreshold,
            timestamp: 1_700_000_000,
            volume: 61.0,
            duration: 120,
        };
        assert!(SnapshotPatch::AutoShutOffReport(report.clone()).apply(&mut snapshot));
        assert_eq!(snapshot.auto_shut_off_report, Some(report));
        assert!(!project(&snapshot, Field::ShutOffEvent).is_unknown());
    }

    #[test]
    fn auto_shut_off_change_is_partial() {
        let mut snapshot = populated();
        let patch = SnapshotPatch::AutoShutOff(AutoShutOffChange {
            enabled: Some(true),
            ..AutoShutOffChange::default()
        });
        assert!(patch.apply(&mut snapshot));
        let aso = snapshot.auto_shut_off_state;
        assert_eq!(aso.as_ref().map(|a| a.enabled), Some(true));
        assert_eq!(aso.map(|a| a.duration_threshold), Some(30));
    }
}
