//! Control DTOs: valve commands, auto shut-off changes, patch outcomes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::client::ValveCommand;
use crate::domain::AutoShutOffChange;
use crate::service::PatchOutcome;

/// Requested valve movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ValveAction {
    /// Open the valve.
    Open,
    /// Close the valve.
    Close,
}

impl From<ValveAction> for ValveCommand {
    fn from(action: ValveAction) -> Self {
        match action {
            ValveAction::Open => Self::Open,
            ValveAction::Close => Self::Close,
        }
    }
}

/// Request body for `POST /devices/:id/valve`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValveRequest {
    /// `open` or `close`.
    pub action: ValveAction,
}

/// Request body for `PATCH /devices/:id/auto-shut-off`.
///
/// At least one field must be present.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AutoShutOffRequest {
    /// Arm or disarm auto shut-off.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Volume threshold in litres (50 to 1000).
    #[serde(default)]
    pub volume_threshold: Option<f64>,
    /// Duration threshold in minutes (5 to 500).
    #[serde(default)]
    pub duration_threshold: Option<u32>,
}

impl From<AutoShutOffRequest> for AutoShutOffChange {
    fn from(req: AutoShutOffRequest) -> Self {
        Self {
            enabled: req.enabled,
            volume_threshold: req.volume_threshold,
            duration_threshold: req.duration_threshold,
        }
    }
}

/// Result of a command or webhook delivery.
#[derive(Debug, Serialize, ToSchema)]
pub struct PatchOutcomeDto {
    /// `applied`, `unchanged`, `skipped`, `no_snapshot`, or `ignored`.
    pub outcome: &'static str,
    /// Field names whose value changed.
    pub changed: Vec<String>,
}

impl From<PatchOutcome> for PatchOutcomeDto {
    fn from(outcome: PatchOutcome) -> Self {
        let (name, changed) = match outcome {
            PatchOutcome::Applied { changed } => (
                "applied",
                changed.iter().map(ToString::to_string).collect(),
            ),
            PatchOutcome::Unchanged => ("unchanged", Vec::new()),
            PatchOutcome::Skipped => ("skipped", Vec::new()),
            PatchOutcome::NoSnapshot => ("no_snapshot", Vec::new()),
            PatchOutcome::Ignored => ("ignored", Vec::new()),
        };
        Self {
            outcome: name,
            changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Field;

    #[test]
    fn outcome_lists_changed_field_names() {
        let dto = PatchOutcomeDto::from(PatchOutcome::Applied {
            changed: vec![Field::FlowRate, Field::Pressure],
        });
        assert_eq!(dto.outcome, "applied");
        assert_eq!(dto.changed, vec!["flow_rate", "pressure"]);
    }

    #[test]
    fn auto_shut_off_request_rejects_unknown_fields() {
        let parsed: Result<AutoShutOffRequest, _> =
            serde_json::from_str(r#"{"volume":100}"#);
        assert!(parsed.is_err());

        let parsed: Result<AutoShutOffRequest, _> =
            serde_json::from_str(r#"{"duration_threshold":120}"#);
        assert!(matches!(
            parsed.map(AutoShutOffChange::from),
            Ok(AutoShutOffChange { duration_threshold: Some(120), enabled: None, .. })
        ));
    }
}
