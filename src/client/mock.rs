//! In-memory [`DeviceClient`] for unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{DeviceClient, DeviceClientError, ValveCommand};
use crate::domain::{
    AutoShutOffChange, AutoShutOffEventType, AutoShutOffReport, AutoShutOffState, DeviceState,
    NetworkingData, TelemetryData, TelemetryErrors, ValveState, WaterMeter,
};

/// Read endpoint selector for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Endpoint {
    State,
    Telemetry,
    Networking,
    AutoShutOff,
    AutoShutOffReport,
}

/// Pauses `get_state` until released, to hold a refresh mid-flight.
#[derive(Debug, Default)]
pub(crate) struct Gate {
    pub(crate) entered: Notify,
    pub(crate) release: Notify,
}

#[derive(Debug)]
struct Records {
    state: DeviceState,
    telemetry: TelemetryData,
    networking: NetworkingData,
    auto_shut_off: AutoShutOffState,
    report: AutoShutOffReport,
}

#[derive(Debug)]
pub(crate) struct MockDeviceClient {
    records: Mutex<Records>,
    failing: Mutex<HashSet<Endpoint>>,
    calls: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Gate>>>,
}

pub(crate) fn sample_state() -> DeviceState {
    DeviceState {
        valve_state: ValveState::Open,
        water_flow_indicator: true,
        mqtt_status: true,
        wifi_status: true,
        power_supply: "battery".to_string(),
        firmware_version: "1.0.0".to_string(),
        uptime: 100,
        water_meter: Some(WaterMeter {
            volume: 1.2,
            duration: 100,
        }),
    }
}

pub(crate) fn sample_telemetry() -> TelemetryData {
    TelemetryData {
        flow: 1200.0,
        pressure: 2.0,
        water_temperature: 29.9,
        errors: TelemetryErrors::new(),
    }
}

pub(crate) fn sample_networking() -> NetworkingData {
    NetworkingData {
        ip: "192.168.1.10".to_string(),
        gateway: "192.168.1.1".to_string(),
        subnet: "255.255.255.0".to_string(),
        ssid: "test_network".to_string(),
        rssi: -50,
        wifi_uptime: 1234,
        mqtt_uptime: 1234,
        wifi_connected: true,
        mqtt_connected: true,
    }
}

pub(crate) fn sample_auto_shut_off() -> AutoShutOffState {
    AutoShutOffState {
        enabled: true,
        volume_threshold: 60.0,
        duration_threshold: 60,
    }
}

pub(crate) fn sample_report() -> AutoShutOffReport {
    AutoShutOffReport {
        event_type: AutoShutOffEventType::VolumeThreshold,
        timestamp: 1_730_282_400,
        volume: 60.0,
        duration: 60,
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockDeviceClient {
    pub(crate) fn new() -> Self {
        Self {
            records: Mutex::new(Records {
                state: sample_state(),
                telemetry: sample_telemetry(),
                networking: sample_networking(),
                auto_shut_off: sample_auto_shut_off(),
                report: sample_report(),
            }),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    pub(crate) fn fail(&self, endpoint: Endpoint) {
        lock(&self.failing).insert(endpoint);
    }

    pub(crate) fn recover(&self) {
        lock(&self.failing).clear();
    }

    pub(crate) fn set_state(&self, state: DeviceState) {
        lock(&self.records).state = state;
    }

    pub(crate) fn set_telemetry(&self, telemetry: TelemetryData) {
        lock(&self.records).telemetry = telemetry;
    }

    pub(crate) fn hold_state(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *lock(&self.gate) = Some(Arc::clone(&gate));
        gate
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn check(&self, endpoint: Endpoint) -> Result<(), DeviceClientError> {
        if lock(&self.failing).contains(&endpoint) {
            return Err(DeviceClientError::Status {
                status: 500,
                path: format!("{endpoint:?}"),
            });
        }
        Ok(())
    }

    fn record(&self, call: String) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl DeviceClient for MockDeviceClient {
    async fn get_state(&self) -> Result<DeviceState, DeviceClientError> {
        let gate = lock(&self.gate).take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.check(Endpoint::State)?;
        Ok(lock(&self.records).state.clone())
    }

    async fn get_telemetry(&self) -> Result<TelemetryData, DeviceClientError> {
        self.check(Endpoint::Telemetry)?;
        Ok(lock(&self.records).telemetry.clone())
    }

    async fn get_networking(&self) -> Result<NetworkingData, DeviceClientError> {
        self.check(Endpoint::Networking)?;
        Ok(lock(&self.records).networking.clone())
    }

    async fn get_auto_shut_off(&self) -> Result<AutoShutOffState, DeviceClientError> {
        self.check(Endpoint::AutoShutOff)?;
        Ok(lock(&self.records).auto_shut_off.clone())
    }

    async fn get_auto_shut_off_report(&self) -> Result<AutoShutOffReport, DeviceClientError> {
        self.check(Endpoint::AutoShutOffReport)?;
        Ok(lock(&self.records).report.clone())
    }

    async fn set_valve_state(&self, command: ValveCommand) -> Result<(), DeviceClientError> {
        self.record(format!("valve:{command:?}"));
        Ok(())
    }

    async fn patch_auto_shut_off(
        &self,
        change: &AutoShutOffChange,
    ) -> Result<(), DeviceClientError> {
        self.record(format!("aso:{change:?}"));
        Ok(())
    }

    async fn set_webhook_url(&self, url: &str) -> Result<(), DeviceClientError> {
        self.record(format!("webhook:{url}"));
        Ok(())
    }
}
