//! Domain layer: snapshot model, projections, patches, and events.
//!
//! This module holds everything that can be reasoned about without a
//! device connection: the sub-records and the [`Snapshot`] aggregate, the
//! typed [`Field`] projections, webhook parsing into [`SnapshotPatch`]es,
//! per-coordinator subscriber registration, and the event bus.

pub mod device_event;
pub mod device_id;
pub mod event_bus;
pub mod field;
pub mod patch;
pub mod records;
pub mod snapshot;
pub mod subscribers;
pub mod webhook_event;

pub use device_event::{DeviceEvent, PatchSource};
pub use device_id::DeviceId;
pub use event_bus::EventBus;
pub use field::{Field, Reading, ShutOffEvent, flow_rate_lpm, project};
pub use patch::{AutoShutOffChange, SnapshotPatch};
pub use records::{
    AutoShutOffEventType, AutoShutOffReport, AutoShutOffState, DeviceState, NetworkingData,
    TelemetryData, TelemetryErrors, TelemetryMetric, ValveState, WaterMeter,
};
pub use snapshot::Snapshot;
pub use subscribers::{Callback, SubscriberRegistry, SubscriptionId};
pub use webhook_event::WebhookEvent;
