//! Delayed automation scheduling.
//!
//! Rules with `delay_minutes > 0` are scheduled, never block the evaluating
//! pass, and re-check their conditions against fresh assignment state at
//! fire time. A schedule whose trigger no longer holds records a cancelled
//! execution instead of running stale actions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use super::actions::ActionExecutor;
use crate::core::{AutomationExecution, AutomationRule};
use crate::events::{EngineEvent, EventSink};
use crate::repository::Repositories;

/// Shared collaborators a scheduled task needs at fire time.
#[derive(Clone)]
pub(crate) struct ScheduleDeps {
    pub repos: Repositories,
    pub events: Arc<dyn EventSink>,
    pub executor: Arc<ActionExecutor>,
}

struct ScheduledAutomation {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Tracks pending delayed automations, keyed by (rule, assignment).
///
/// Scheduling the same pair again replaces (and cancels) the previous
/// schedule.
#[derive(Default)]
pub struct DelayedAutomationScheduler {
    handles: Arc<DashMap<(Uuid, Uuid), ScheduledAutomation>>,
}

impl DelayedAutomationScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of schedules still pending.
    #[must_use]
    pub fn scheduled_count(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn schedule(&self, rule: AutomationRule, assignment_id: Uuid, deps: ScheduleDeps) {
        let key = (rule.id, assignment_id);
        let delay = Duration::from_secs(rule.delay_minutes.saturating_mul(60));
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        let handles = Arc::clone(&self.handles);

        let handle = tokio::spawn(async move {
            // The task only starts once its handle is registered, so the
            // cleanup below always finds its own entry.
            let _ = ready_rx.await;

            tokio::select! {
                _ = cancel_rx.changed() => {
                    let record = AutomationExecution::cancelled(
                        rule.id,
                        assignment_id,
                        "cancelled before the delay elapsed",
                        Utc::now(),
                    );
                    if let Err(error) = deps.repos.executions.record(record).await {
                        warn!(%error, "failed to record cancelled automation");
                    }
                    deps.events
                        .emit(EngineEvent::AutomationCancelled {
                            rule_id: rule.id,
                            assignment_id,
                        })
                        .await;
                }
                () = tokio::time::sleep(delay) => {
                    fire(&rule, assignment_id, &deps).await;
                }
            }

            handles.remove(&key);
        });

        if let Some(previous) = self.handles.insert(
            key,
            ScheduledAutomation {
                cancel: cancel_tx,
                handle,
            },
        ) {
            let _ = previous.cancel.send(true);
        }
        let _ = ready_tx.send(());
    }

    /// Cancels every pending schedule of an assignment, waiting for the
    /// cancellations to be recorded. Returns the number cancelled.
    pub async fn cancel_for_assignment(&self, assignment_id: Uuid) -> usize {
        let keys: Vec<(Uuid, Uuid)> = self
            .handles
            .iter()
            .filter(|entry| entry.key().1 == assignment_id)
            .map(|entry| *entry.key())
            .collect();

        // The signal is sent before the sender drops, so the task observes
        // the cancellation even after its entry is gone.
        let mut cancelled = Vec::new();
        for key in keys {
            if let Some((_, scheduled)) = self.handles.remove(&key) {
                let _ = scheduled.cancel.send(true);
                cancelled.push(scheduled);
            }
        }
        let count = cancelled.len();
        futures::future::join_all(cancelled.into_iter().map(|s| s.handle)).await;
        count
    }

    /// Waits for every pending schedule to finish (fire or cancel).
    ///
    /// Intended for tests and orderly shutdown.
    pub async fn wait_all(&self) {
        loop {
            let Some(key) = self.handles.iter().map(|entry| *entry.key()).next() else {
                return;
            };
            if let Some((_, scheduled)) = self.handles.remove(&key) {
                // Holding the entry keeps the cancel sender alive while the
                // task runs to completion.
                let _ = scheduled.handle.await;
            }
        }
    }
}

async fn fire(rule: &AutomationRule, assignment_id: Uuid, deps: &ScheduleDeps) {
    let now = Utc::now();
    let still_applies = match deps.repos.assignments.get(assignment_id).await {
        Ok(Some(assignment)) => {
            assignment.active
                && assignment.current_stage_id == rule.stage_id
                && rule.matches(&assignment.facts(now))
        }
        Ok(None) => false,
        Err(error) => {
            warn!(
                rule = %rule.name,
                %assignment_id,
                %error,
                "could not reload assignment for delayed automation"
            );
            false
        }
    };

    if still_applies {
        if let Err(error) = deps.executor.execute_rule(rule, assignment_id, now).await {
            warn!(rule = %rule.name, %error, "delayed automation failed");
        }
        return;
    }

    let record = AutomationExecution::cancelled(
        rule.id,
        assignment_id,
        "conditions no longer hold at fire time",
        now,
    );
    if let Err(error) = deps.repos.executions.record(record).await {
        warn!(%error, "failed to record cancelled automation");
    }
    deps.events
        .emit(EngineEvent::AutomationCancelled {
            rule_id: rule.id,
            assignment_id,
        })
        .await;
}
