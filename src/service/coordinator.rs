//! Per-device refresh coordinator.
//!
//! [`Coordinator`] owns the single authoritative [`Snapshot`] of one device.
//! It performs the five-way concurrent fetch, swaps in the merged snapshot,
//! applies out-of-band patches, and notifies subscribers.
//!
//! # Concurrency
//!
//! One `std::sync::Mutex` guards the current snapshot together with the
//! in-flight refresh flag and the patch journal. Fetches run without it.
//! A patch applied while a refresh is in flight is journaled and replayed
//! onto the merged snapshot before the swap, so a poll can never discard a
//! webhook update. Refreshes on one coordinator are serialized.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::client::{DeviceClient, DeviceClientError, ValveCommand};
use crate::domain::{
    AutoShutOffChange, Callback, DeviceEvent, DeviceId, EventBus, Field, PatchSource, Reading,
    Snapshot, SnapshotPatch, SubscriberRegistry, SubscriptionId, ValveState, project,
};
use crate::error::BridgeError;

/// Accepted auto shut-off volume threshold, litres.
pub const VOLUME_THRESHOLD_RANGE: std::ops::RangeInclusive<f64> = 50.0..=1000.0;
/// Accepted auto shut-off duration threshold, minutes.
pub const DURATION_THRESHOLD_RANGE: std::ops::RangeInclusive<u32> = 5..=500;

/// Result of applying a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The snapshot was replaced; these fields changed.
    ///
    /// `changed` is empty when only data no field projects changed, such
    /// as the raw flow of a metric flagged as erroring. Nobody is notified
    /// in that case.
    Applied {
        /// Fields whose projected value changed.
        changed: Vec<Field>,
    },
    /// The patch matched the current values; nothing changed.
    Unchanged,
    /// The targeted sub-record is absent; nothing changed.
    Skipped,
    /// No snapshot exists yet. If a refresh is in flight the patch will be
    /// replayed onto its result.
    NoSnapshot,
    /// The event type is not one the router acts on.
    Ignored,
}

#[derive(Debug, Default)]
struct SnapshotCell {
    current: Option<Arc<Snapshot>>,
    last_update_success: bool,
    last_update_at: Option<DateTime<Utc>>,
    refresh_in_flight: bool,
    journal: Vec<SnapshotPatch>,
}

/// Point-in-time view of a coordinator, read under one lock.
#[derive(Debug, Clone)]
pub struct CoordinatorStatus {
    /// Current snapshot, `None` until the first successful refresh.
    pub data: Option<Arc<Snapshot>>,
    /// Whether the most recent refresh succeeded.
    pub last_update_success: bool,
    /// When the snapshot was last replaced by a refresh.
    pub last_update_at: Option<DateTime<Utc>>,
}

/// Authoritative state holder for one device.
pub struct Coordinator {
    device_id: DeviceId,
    name: String,
    client: Arc<dyn DeviceClient>,
    cell: Mutex<SnapshotCell>,
    refresh_lock: tokio::sync::Mutex<()>,
    subscribers: SubscriberRegistry,
    event_bus: EventBus,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("device_id", &self.device_id)
            .field("name", &self.name)
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight marker if a refresh is dropped before committing.
struct InFlight<'a> {
    coordinator: &'a Coordinator,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut cell = self.coordinator.cell();
            cell.refresh_in_flight = false;
            cell.journal.clear();
            cell.last_update_success = false;
        }
    }
}

impl Coordinator {
    /// Creates a coordinator with no snapshot.
    #[must_use]
    pub fn new(
        device_id: DeviceId,
        name: impl Into<String>,
        client: Arc<dyn DeviceClient>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            device_id,
            name: name.into(),
            client,
            cell: Mutex::new(SnapshotCell::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
            subscribers: SubscriberRegistry::new(),
            event_bus,
        }
    }

    /// Device identifier, also the webhook id.
    #[must_use]
    pub const fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Human-readable device name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The device client this coordinator polls.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn DeviceClient> {
        &self.client
    }

    fn cell(&self) -> MutexGuard<'_, SnapshotCell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current snapshot. `None` until the first successful refresh.
    #[must_use]
    pub fn data(&self) -> Option<Arc<Snapshot>> {
        self.cell().current.clone()
    }

    /// Whether the most recent refresh succeeded.
    #[must_use]
    pub fn last_update_success(&self) -> bool {
        self.cell().last_update_success
    }

    /// When the snapshot was last replaced by a refresh.
    #[must_use]
    pub fn last_update_at(&self) -> Option<DateTime<Utc>> {
        self.cell().last_update_at
    }

    /// Snapshot and health flags read together.
    #[must_use]
    pub fn status(&self) -> CoordinatorStatus {
        let cell = self.cell();
        CoordinatorStatus {
            data: cell.current.clone(),
            last_update_success: cell.last_update_success,
            last_update_at: cell.last_update_at,
        }
    }

    /// Projects `field` from the current snapshot.
    #[must_use]
    pub fn reading(&self, field: Field) -> Reading {
        self.data()
            .map_or(Reading::Unknown, |snapshot| project(&snapshot, field))
    }

    /// Registers `callback` for changes to `field`.
    pub fn subscribe(&self, field: Field, callback: Callback) -> SubscriptionId {
        self.subscribers.subscribe(field, callback)
    }

    /// Registers `callback` for every refresh and every applied patch.
    pub fn subscribe_all(&self, callback: Callback) -> SubscriptionId {
        self.subscribers.subscribe_all(callback)
    }

    /// Removes a registration.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Runs one refresh cycle.
    ///
    /// All five reads are issued concurrently and awaited to completion. If
    /// any of them fails, the current snapshot is kept and
    /// `last_update_success` becomes `false`. On success the merged
    /// snapshot (with any patches journaled meanwhile) replaces the current
    /// one and every subscriber is notified once.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UpdateFailed`] if any device read fails.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, BridgeError> {
        let _serial = self.refresh_lock.lock().await;
        self.refresh_serialized().await
    }

    /// Runs [`Self::refresh`] bounded by `timeout`.
    ///
    /// The bound starts once any refresh already running on this
    /// coordinator has finished, so waiting behind it never counts as a
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UpdateFailed`] if the refresh fails or does
    /// not finish in time. A timed-out refresh leaves the snapshot as it was.
    pub async fn refresh_with_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Arc<Snapshot>, BridgeError> {
        let _serial = self.refresh_lock.lock().await;
        match tokio::time::timeout(timeout, self.refresh_serialized()).await {
            Ok(result) => result,
            Err(_) => {
                self.abort_refresh();
                let reason = format!("Sonic device did not answer within {timeout:?}");
                warn!(device_id = %self.device_id, ?timeout, "refresh timed out");
                self.publish_failure(&reason);
                Err(BridgeError::UpdateFailed(reason))
            }
        }
    }

    /// One refresh cycle. Callers hold `refresh_lock`.
    async fn refresh_serialized(&self) -> Result<Arc<Snapshot>, BridgeError> {
        let mut in_flight = self.begin_refresh();

        let fetched = self.fetch_all().await;
        in_flight.armed = false;

        match fetched {
            Ok(merged) => {
                let snapshot = self.commit_refresh(merged);
                debug!(device_id = %self.device_id, "snapshot refreshed");
                self.subscribers.notify_all();
                let _ = self.event_bus.publish(DeviceEvent::SnapshotRefreshed {
                    device_id: self.device_id,
                    timestamp: Utc::now(),
                });
                Ok(snapshot)
            }
            Err(e) => {
                self.abort_refresh();
                let reason = format!("Sonic device is unavailable: {e}");
                warn!(device_id = %self.device_id, error = %e, "refresh failed");
                self.publish_failure(&reason);
                Err(BridgeError::UpdateFailed(reason))
            }
        }
    }

    fn publish_failure(&self, reason: &str) {
        let _ = self.event_bus.publish(DeviceEvent::RefreshFailed {
            device_id: self.device_id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn begin_refresh(&self) -> InFlight<'_> {
        let mut cell = self.cell();
        cell.refresh_in_flight = true;
        cell.journal.clear();
        InFlight {
            coordinator: self,
            armed: true,
        }
    }

    async fn fetch_all(&self) -> Result<Snapshot, DeviceClientError> {
        let client = &self.client;
        let (state, telemetry, networking, auto_shut_off, report) = tokio::join!(
            client.get_state(),
            client.get_telemetry(),
            client.get_networking(),
            client.get_auto_shut_off(),
            client.get_auto_shut_off_report(),
        );
        Ok(Snapshot::merge(
            state?,
            telemetry?,
            networking?,
            auto_shut_off?,
            report?,
        ))
    }

    fn commit_refresh(&self, mut merged: Snapshot) -> Arc<Snapshot> {
        let mut cell = self.cell();
        let journal = std::mem::take(&mut cell.journal);
        if !journal.is_empty() {
            debug!(
                device_id = %self.device_id,
                patches = journal.len(),
                "replaying patches onto refreshed snapshot"
            );
        }
        for patch in &journal {
            patch.apply(&mut merged);
        }
        let snapshot = Arc::new(merged);
        cell.current = Some(Arc::clone(&snapshot));
        cell.refresh_in_flight = false;
        cell.last_update_success = true;
        cell.last_update_at = Some(Utc::now());
        snapshot
    }

    fn abort_refresh(&self) {
        let mut cell = self.cell();
        cell.refresh_in_flight = false;
        cell.journal.clear();
        cell.last_update_success = false;
    }

    /// Applies `patch` to the current snapshot.
    ///
    /// Subscribers of the fields whose projected value changed are
    /// notified once each, followed by catch-all subscribers. Re-applying
    /// an identical patch changes nothing and notifies nobody.
    pub fn apply_patch(&self, patch: SnapshotPatch, source: PatchSource) -> PatchOutcome {
        let outcome = {
            let mut cell = self.cell();
            if cell.refresh_in_flight {
                cell.journal.push(patch.clone());
            }
            match cell.current.as_ref() {
                None => PatchOutcome::NoSnapshot,
                Some(current) => {
                    let mut next = Snapshot::clone(current);
                    if patch.apply(&mut next) {
                        let changed: Vec<Field> = patch
                            .fields()
                            .iter()
                            .copied()
                            .filter(|field| project(current, *field) != project(&next, *field))
                            .collect();
                        if next == **current {
                            PatchOutcome::Unchanged
                        } else {
                            cell.current = Some(Arc::new(next));
                            PatchOutcome::Applied { changed }
                        }
                    } else {
                        PatchOutcome::Skipped
                    }
                }
            }
        };

        if let PatchOutcome::Applied { changed } = &outcome
            && !changed.is_empty()
        {
            self.subscribers.notify_fields(changed);
            let _ = self.event_bus.publish(DeviceEvent::FieldsPatched {
                device_id: self.device_id,
                source,
                fields: changed.clone(),
                timestamp: Utc::now(),
            });
        }
        outcome
    }

    /// Opens the valve and optimistically marks it as opening.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Device`] if the device rejects the command.
    pub async fn open_valve(&self) -> Result<PatchOutcome, BridgeError> {
        self.client.set_valve_state(ValveCommand::Open).await?;
        Ok(self.apply_patch(SnapshotPatch::Valve(ValveState::Opening), PatchSource::Command))
    }

    /// Closes the valve and optimistically marks it as closing.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Device`] if the device rejects the command.
    pub async fn close_valve(&self) -> Result<PatchOutcome, BridgeError> {
        self.client.set_valve_state(ValveCommand::Close).await?;
        Ok(self.apply_patch(SnapshotPatch::Valve(ValveState::Closing), PatchSource::Command))
    }

    /// Changes auto shut-off settings on the device, then patches them in.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidRequest`] if `change` is empty or a
    /// threshold is out of range, or [`BridgeError::Device`] if the device
    /// rejects the change.
    pub async fn set_auto_shut_off(
        &self,
        change: AutoShutOffChange,
    ) -> Result<PatchOutcome, BridgeError> {
        validate_auto_shut_off(&change)?;
        self.client.patch_auto_shut_off(&change).await?;
        Ok(self.apply_patch(SnapshotPatch::AutoShutOff(change), PatchSource::Command))
    }
}

/// Checks that an auto shut-off change is non-empty and within device limits.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidRequest`] describing the first violation.
pub fn validate_auto_shut_off(change: &AutoShutOffChange) -> Result<(), BridgeError> {
    if change.is_empty() {
        return Err(BridgeError::InvalidRequest(
            "auto shut-off change has no fields".to_string(),
        ));
    }
    if let Some(volume) = change
        .volume_threshold
        .filter(|v| !VOLUME_THRESHOLD_RANGE.contains(v))
    {
        return Err(BridgeError::InvalidRequest(format!(
            "volume threshold {volume} outside {}..={} L",
            VOLUME_THRESHOLD_RANGE.start(),
            VOLUME_THRESHOLD_RANGE.end()
        )));
    }
    if let Some(duration) = change
        .duration_threshold
        .filter(|d| !DURATION_THRESHOLD_RANGE.contains(d))
    {
        return Err(BridgeError::InvalidRequest(format!(
            "duration threshold {duration} outside {}..={} min",
            DURATION_THRESHOLD_RANGE.start(),
            DURATION_THRESHOLD_RANGE.end()
        )));
    }
    Ok(())
}
