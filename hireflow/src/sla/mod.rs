//! SLA evaluation.
//!
//! The evaluator is a periodic pass over every active assignment: it
//! classifies each bound SLA, upserts alerts idempotently and dispatches
//! pending ones. It is safe to re-run at any cadence; a missed run only
//! delays alert emission.

#[cfg(test)]
mod evaluator_tests;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::core::{
    Alert, AlertClassification, CandidateStageAssignment, SlaDefinition, Urgency,
};
use crate::errors::HireflowError;
use crate::events::{EngineEvent, EventSink};
use crate::notify::NotificationDispatcher;
use crate::repository::Repositories;

/// How an assignment stands against one SLA at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaState {
    /// Deadline comfortably away; any open alert can resolve.
    Satisfied,
    /// Inside the pre-deadline alert window.
    Approaching {
        /// Hours left until the deadline.
        remaining_hours: i64,
    },
    /// Past the deadline.
    Breached {
        /// Hours past the deadline.
        overdue_hours: i64,
    },
    /// Past the deadline for longer than the escalation threshold.
    Escalated {
        /// Hours past the deadline.
        overdue_hours: i64,
    },
}

/// Classifies an assignment against one SLA definition.
///
/// Deadlines are relative to the assignment's `entered_at` for its current
/// stage.
#[must_use]
pub fn classify(
    sla: &SlaDefinition,
    assignment: &CandidateStageAssignment,
    now: DateTime<Utc>,
) -> SlaState {
    let elapsed = assignment.hours_in_stage(now);
    let remaining = sla.deadline_hours() - elapsed;

    if remaining > sla.alert_before_hours {
        SlaState::Satisfied
    } else if remaining > 0 {
        SlaState::Approaching {
            remaining_hours: remaining,
        }
    } else {
        let overdue = -remaining;
        if overdue >= sla.alert_after_hours {
            SlaState::Escalated {
                overdue_hours: overdue,
            }
        } else {
            SlaState::Breached {
                overdue_hours: overdue,
            }
        }
    }
}

/// Urgency for a classified state.
///
/// Pre-deadline urgency scales with how much of the alert window is gone;
/// post-breach urgency grows with overdue hours.
#[must_use]
pub fn urgency_for(state: SlaState, sla: &SlaDefinition) -> Urgency {
    match state {
        SlaState::Satisfied => Urgency::Low,
        SlaState::Approaching { remaining_hours } => {
            if remaining_hours * 4 <= sla.alert_before_hours {
                Urgency::High
            } else if remaining_hours * 2 <= sla.alert_before_hours {
                Urgency::Medium
            } else {
                Urgency::Low
            }
        }
        SlaState::Breached { overdue_hours } => {
            if overdue_hours >= 24 {
                Urgency::Critical
            } else {
                Urgency::High
            }
        }
        SlaState::Escalated { .. } => Urgency::Critical,
    }
}

fn classification_of(state: SlaState) -> Option<AlertClassification> {
    match state {
        SlaState::Satisfied => None,
        SlaState::Approaching { .. } => Some(AlertClassification::Approaching),
        SlaState::Breached { .. } => Some(AlertClassification::Breached),
        SlaState::Escalated { .. } => Some(AlertClassification::Escalated),
    }
}

fn title_for(state: SlaState, sla: &SlaDefinition) -> String {
    match state {
        SlaState::Satisfied => format!("{} dentro do prazo", sla.name),
        SlaState::Approaching { remaining_hours } => {
            format!("{}: vence em {remaining_hours}h", sla.name)
        }
        SlaState::Breached { overdue_hours } => {
            format!("{}: estourado há {overdue_hours}h", sla.name)
        }
        SlaState::Escalated { overdue_hours } => {
            format!("{}: estourado há {overdue_hours}h, escalado", sla.name)
        }
    }
}

/// Summary of one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlaPassSummary {
    /// (assignment, SLA) pairs evaluated.
    pub evaluated: usize,
    /// New alerts created.
    pub alerts_created: usize,
    /// Existing alerts reclassified or refreshed.
    pub alerts_updated: usize,
    /// Alerts resolved because their SLA is satisfied again.
    pub alerts_resolved: usize,
    /// Pending alerts delivered.
    pub dispatched: usize,
    /// Assignments skipped as malformed.
    pub skipped: usize,
}

/// Periodic SLA evaluator.
pub struct SlaEvaluator {
    repos: Repositories,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl SlaEvaluator {
    /// Creates an evaluator over the given repositories.
    #[must_use]
    pub fn new(
        repos: Repositories,
        events: Arc<dyn EventSink>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            repos,
            events,
            notifier,
        }
    }

    /// Runs one evaluation pass at `now`.
    ///
    /// Alerts are idempotent per (SLA, assignment): at most one open alert
    /// exists per pair, and state changes reclassify it in place. Malformed
    /// assignments are skipped with a warning, never aborting the batch.
    ///
    /// # Errors
    ///
    /// Propagates repository failures. Dispatch failures do not fail the
    /// pass; the alert stays pending for the next run.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<SlaPassSummary, HireflowError> {
        let mut summary = SlaPassSummary::default();

        for assignment in self.repos.assignments.active().await? {
            if assignment.entered_at > now {
                warn!(
                    assignment_id = %assignment.id,
                    entered_at = %assignment.entered_at,
                    "skipping assignment with entered_at in the future"
                );
                summary.skipped += 1;
                continue;
            }

            let slas = self
                .repos
                .slas
                .for_stage(assignment.current_stage_id)
                .await?;
            for sla in slas {
                summary.evaluated += 1;
                self.evaluate_one(&sla, &assignment, now, &mut summary)
                    .await?;
            }
        }

        self.dispatch_pending(now, &mut summary).await?;
        Ok(summary)
    }

    async fn evaluate_one(
        &self,
        sla: &SlaDefinition,
        assignment: &CandidateStageAssignment,
        now: DateTime<Utc>,
        summary: &mut SlaPassSummary,
    ) -> Result<(), HireflowError> {
        let state = classify(sla, assignment, now);
        let existing = self.repos.alerts.open_for(sla.id, assignment.id).await?;

        let Some(classification) = classification_of(state) else {
            if let Some(mut alert) = existing {
                alert.resolve(now);
                self.repos.alerts.update(alert.clone()).await?;
                self.events
                    .emit(EngineEvent::AlertResolved { alert_id: alert.id })
                    .await;
                summary.alerts_resolved += 1;
            }
            return Ok(());
        };

        let urgency = urgency_for(state, sla);
        let title = title_for(state, sla);

        match existing {
            Some(mut alert) => {
                let escalated_now = alert.classification != AlertClassification::Escalated
                    && classification == AlertClassification::Escalated;
                let changed = alert.reclassify(classification, urgency, title, now);
                if changed {
                    // A changed classification must reach its targets again.
                    alert.reopen(now);
                }
                self.repos.alerts.update(alert.clone()).await?;
                if escalated_now {
                    self.events
                        .emit(EngineEvent::AlertEscalated {
                            alert_id: alert.id,
                            sla_id: sla.id,
                            assignment_id: assignment.id,
                        })
                        .await;
                }
                summary.alerts_updated += 1;
            }
            None => {
                let alert = Alert::new(sla.id, assignment.id, classification, urgency, title, now);
                self.repos.alerts.insert(alert.clone()).await?;
                self.events
                    .emit(EngineEvent::AlertCreated {
                        alert_id: alert.id,
                        sla_id: sla.id,
                        assignment_id: assignment.id,
                        classification,
                    })
                    .await;
                summary.alerts_created += 1;
            }
        }
        Ok(())
    }

    async fn dispatch_pending(
        &self,
        now: DateTime<Utc>,
        summary: &mut SlaPassSummary,
    ) -> Result<(), HireflowError> {
        for mut alert in self.repos.alerts.pending().await? {
            let targets = self.targets_for(&alert).await?;
            match self.notifier.dispatch_alert(&alert, &targets).await {
                Ok(()) => {
                    alert.mark_sent(now);
                    self.repos.alerts.update(alert).await?;
                    summary.dispatched += 1;
                }
                Err(error) => {
                    warn!(
                        alert_id = %alert.id,
                        %error,
                        "alert dispatch failed, leaving pending"
                    );
                }
            }
        }
        Ok(())
    }

    /// Notification targets for an alert; escalated alerts add the SLA's
    /// escalation targets on top of the regular ones.
    async fn targets_for(&self, alert: &Alert) -> Result<Vec<String>, HireflowError> {
        let Some(sla) = self.repos.slas.get(alert.sla_id).await? else {
            return Ok(Vec::new());
        };
        let mut targets = sla.notification_targets.clone();
        if alert.classification == AlertClassification::Escalated {
            for target in &sla.escalation_targets {
                if !targets.contains(target) {
                    targets.push(target.clone());
                }
            }
        }
        Ok(targets)
    }
}

/// Convenience lookup used by operator surfaces: all open alerts of an
/// assignment, most urgent first.
///
/// # Errors
///
/// Propagates repository failures.
pub async fn open_alerts_by_urgency(
    repos: &Repositories,
    assignment_id: Uuid,
) -> Result<Vec<Alert>, HireflowError> {
    let mut alerts = repos.alerts.open_for_assignment(assignment_id).await?;
    alerts.sort_by(|a, b| b.urgency.cmp(&a.urgency));
    Ok(alerts)
}
