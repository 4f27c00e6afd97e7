//! The merged, most-recent view of one device.

use serde::Serialize;

use super::records::{
    AutoShutOffReport, AutoShutOffState, DeviceState, NetworkingData, TelemetryData,
};

/// Aggregate of the five sub-records fetched from a device.
///
/// Each sub-record is either wholly present or wholly absent. A snapshot is
/// never mutated once shared; the coordinator publishes a new
/// `Arc<Snapshot>` on every refresh and every applied patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Valve, links, power and meter state.
    pub state: Option<DeviceState>,
    /// Flow, pressure and temperature readings.
    pub telemetry: Option<TelemetryData>,
    /// Wi-Fi and MQTT link details.
    pub networking: Option<NetworkingData>,
    /// Auto shut-off configuration.
    pub auto_shut_off_state: Option<AutoShutOffState>,
    /// Most recent auto shut-off trigger.
    pub auto_shut_off_report: Option<AutoShutOffReport>,
}

impl Snapshot {
    /// Builds a snapshot from one complete refresh cycle.
    ///
    /// Results are stored verbatim; no unit conversion or cross-field
    /// derivation happens here.
    #[must_use]
    pub fn merge(
        state: DeviceState,
        telemetry: TelemetryData,
        networking: NetworkingData,
        auto_shut_off_state: AutoShutOffState,
        auto_shut_off_report: AutoShutOffReport,
    ) -> Self {
        Self {
            state: Some(state),
            telemetry: Some(telemetry),
            networking: Some(networking),
            auto_shut_off_state: Some(auto_shut_off_state),
            auto_shut_off_report: Some(auto_shut_off_report),
        }
    }

    /// Firmware version, or an empty string before the first state fetch.
    #[must_use]
    pub fn firmware_version(&self) -> &str {
        self.state
            .as_ref()
            .map_or("", |state| state.firmware_version.as_str())
    }
}
