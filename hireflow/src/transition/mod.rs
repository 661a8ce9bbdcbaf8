//! Stage transitions.
//!
//! All writes to an assignment go through an optimistic version check, so
//! two recruiters acting on the same candidate at once get a
//! [`ConcurrentModification`](crate::errors::HireflowError::ConcurrentModification)
//! instead of silently overwriting each other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::automation::RuleEngine;
use crate::core::{AutomationExecution, CandidateStageAssignment};
use crate::errors::{ConcurrentModificationError, HireflowError, ValidationError};
use crate::events::{EngineEvent, EventSink};
use crate::repository::Repositories;

/// Moves an assignment to a new stage against its currently stored version.
///
/// Used by system-driven moves (automation actions), where no caller holds
/// a previously read version. Resolves the assignment's open alerts, since
/// they refer to the stage being left.
pub(crate) async fn apply_stage_move(
    repos: &Repositories,
    events: &dyn EventSink,
    assignment_id: Uuid,
    to_stage_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CandidateStageAssignment, HireflowError> {
    let assignment = repos
        .assignments
        .get(assignment_id)
        .await?
        .ok_or_else(|| HireflowError::not_found("candidate stage assignment", assignment_id))?;
    move_checked(repos, events, assignment.clone(), assignment.version, to_stage_id, now).await
}

/// The shared move path: validates the target, swaps the stage, resolves
/// open alerts and emits the transition event.
async fn move_checked(
    repos: &Repositories,
    events: &dyn EventSink,
    assignment: CandidateStageAssignment,
    expected_version: u64,
    to_stage_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CandidateStageAssignment, HireflowError> {
    if !assignment.active {
        return Err(ValidationError::new("assignment is no longer active").into());
    }

    let target = repos
        .models
        .stage(to_stage_id)
        .await?
        .ok_or_else(|| HireflowError::not_found("stage", to_stage_id))?;
    if let Some(current) = repos.models.stage(assignment.current_stage_id).await? {
        if current.model_id != target.model_id {
            return Err(ValidationError::new(format!(
                "stage '{}' belongs to a different pipeline model",
                target.name
            ))
            .into());
        }
    }

    let from_stage_id = assignment.current_stage_id;
    let mut updated = assignment;
    updated.enter_stage(to_stage_id, now);
    repos
        .assignments
        .update_if_version(updated.clone(), expected_version)
        .await?;

    resolve_open_alerts(repos, events, updated.id, now).await?;

    events
        .emit(EngineEvent::StageTransition {
            assignment_id: updated.id,
            from_stage_id,
            to_stage_id,
        })
        .await;
    Ok(updated)
}

/// Resolves every open alert of an assignment. Alerts always refer to the
/// stage the candidate is leaving.
async fn resolve_open_alerts(
    repos: &Repositories,
    events: &dyn EventSink,
    assignment_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), HireflowError> {
    for mut alert in repos.alerts.open_for_assignment(assignment_id).await? {
        alert.resolve(now);
        let alert_id = alert.id;
        repos.alerts.update(alert).await?;
        events.emit(EngineEvent::AlertResolved { alert_id }).await;
    }
    Ok(())
}

/// Rejects an assignment with a catalogued reason.
pub(crate) async fn apply_rejection(
    repos: &Repositories,
    events: &dyn EventSink,
    assignment_id: Uuid,
    reason_id: Uuid,
    note: Option<&str>,
    expected_version: Option<u64>,
    now: DateTime<Utc>,
) -> Result<CandidateStageAssignment, HireflowError> {
    let reason = repos
        .rejections
        .get(reason_id)
        .await?
        .ok_or_else(|| HireflowError::not_found("rejection reason", reason_id))?;
    if reason.required && note.is_none() {
        return Err(ValidationError::new(format!(
            "rejection reason '{}' requires a note",
            reason.name
        ))
        .with_field("note")
        .into());
    }

    let assignment = repos
        .assignments
        .get(assignment_id)
        .await?
        .ok_or_else(|| HireflowError::not_found("candidate stage assignment", assignment_id))?;
    if !assignment.active {
        return Err(ValidationError::new("assignment is no longer active").into());
    }

    let stage = repos
        .models
        .stage(assignment.current_stage_id)
        .await?
        .ok_or_else(|| HireflowError::not_found("stage", assignment.current_stage_id))?;
    if !stage.can_reject {
        return Err(ValidationError::new(format!(
            "stage '{}' does not allow rejection",
            stage.name
        ))
        .into());
    }

    let expected = expected_version.unwrap_or(assignment.version);
    let mut updated = assignment;
    updated.fill_field("motivo_reprovacao", serde_json::json!(reason.name));
    if let Some(note) = note {
        updated.fill_field("observacao_reprovacao", serde_json::json!(note));
    }
    updated.deactivate();
    repos
        .assignments
        .update_if_version(updated.clone(), expected)
        .await?;

    resolve_open_alerts(repos, events, assignment_id, now).await?;

    events
        .emit(EngineEvent::CandidateRejected {
            assignment_id,
            reason_id,
        })
        .await;
    Ok(updated)
}

/// User-driven stage transitions and rejections.
///
/// Callers pass the assignment version they read; a stale version yields
/// `ConcurrentModification` and leaves the assignment untouched.
pub struct StageTransitionService {
    repos: Repositories,
    events: Arc<dyn EventSink>,
    engine: Arc<RuleEngine>,
}

impl StageTransitionService {
    /// Creates a service over the given repositories.
    #[must_use]
    pub fn new(repos: Repositories, events: Arc<dyn EventSink>, engine: Arc<RuleEngine>) -> Self {
        Self {
            repos,
            events,
            engine,
        }
    }

    /// Moves an assignment to `to_stage_id`.
    ///
    /// Enforces the current stage's required fields, cancels the
    /// assignment's pending delayed automations, then evaluates the new
    /// stage's entry rules.
    ///
    /// # Errors
    ///
    /// `ConcurrentModification` on a stale `expected_version`,
    /// `Validation` for missing required fields or cross-model targets,
    /// `NotFound` for unknown assignments or stages.
    pub async fn transition(
        &self,
        assignment_id: Uuid,
        to_stage_id: Uuid,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<CandidateStageAssignment, HireflowError> {
        let assignment = self
            .repos
            .assignments
            .get(assignment_id)
            .await?
            .ok_or_else(|| {
                HireflowError::not_found("candidate stage assignment", assignment_id)
            })?;

        if assignment.version != expected_version {
            return Err(ConcurrentModificationError::new(
                assignment_id,
                expected_version,
                assignment.version,
            )
            .into());
        }

        if let Some(current) = self
            .repos
            .models
            .stage(assignment.current_stage_id)
            .await?
        {
            let missing: Vec<&str> = current
                .required_fields
                .iter()
                .map(String::as_str)
                .filter(|field| !assignment.fields_filled.contains_key(*field))
                .collect();
            if !missing.is_empty() {
                return Err(ValidationError::new(format!(
                    "stage '{}' requires fields before leaving: {}",
                    current.name,
                    missing.join(", ")
                ))
                .into());
            }
        }

        self.engine.cancel_scheduled_for(assignment_id).await;

        let updated = move_checked(
            &self.repos,
            self.events.as_ref(),
            assignment,
            expected_version,
            to_stage_id,
            now,
        )
        .await?;

        if let Err(error) = self.engine.on_stage_entry(assignment_id, now).await {
            warn!(%assignment_id, %error, "stage-entry automation evaluation failed");
        }
        Ok(updated)
    }

    /// Records a field value and evaluates field-update rules.
    ///
    /// # Errors
    ///
    /// `ConcurrentModification` on a stale `expected_version`, `NotFound`
    /// for unknown assignments.
    pub async fn fill_field(
        &self,
        assignment_id: Uuid,
        name: impl Into<String>,
        value: serde_json::Value,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<AutomationExecution>, HireflowError> {
        let assignment = self
            .repos
            .assignments
            .get(assignment_id)
            .await?
            .ok_or_else(|| {
                HireflowError::not_found("candidate stage assignment", assignment_id)
            })?;
        if !assignment.active {
            return Err(ValidationError::new("assignment is no longer active").into());
        }

        let mut updated = assignment;
        updated.fill_field(name, value);
        self.repos
            .assignments
            .update_if_version(updated, expected_version)
            .await?;

        self.engine.on_field_update(assignment_id, now).await
    }

    /// Rejects an assignment with a catalogued reason.
    ///
    /// # Errors
    ///
    /// `Validation` when the stage does not allow rejection or the reason
    /// requires a note, `ConcurrentModification` on a stale version.
    pub async fn reject(
        &self,
        assignment_id: Uuid,
        reason_id: Uuid,
        note: Option<&str>,
        expected_version: u64,
        now: DateTime<Utc>,
    ) -> Result<CandidateStageAssignment, HireflowError> {
        self.engine.cancel_scheduled_for(assignment_id).await;
        apply_rejection(
            &self.repos,
            self.events.as_ref(),
            assignment_id,
            reason_id,
            note,
            Some(expected_version),
            now,
        )
        .await
    }
}
