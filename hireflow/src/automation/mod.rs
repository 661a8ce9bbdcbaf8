//! Automation rule evaluation.
//!
//! This module provides:
//! - The rule engine matching stage-entry and field-update events
//! - Sequential action execution with bounded retries
//! - Delayed, cancellable scheduling for deferred rules

mod actions;
mod retry;
mod scheduler;

pub use actions::ActionExecutor;
pub use retry::{with_retry, RetryConfig};
pub use scheduler::DelayedAutomationScheduler;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::{AutomationExecution, AutomationTrigger};
use crate::errors::HireflowError;
use crate::events::{EngineEvent, EventSink};
use crate::repository::Repositories;
use scheduler::ScheduleDeps;

/// Matches automation rules against assignment events and runs their
/// actions.
///
/// Rules attached to a stage are evaluated in order; a rule fires only when
/// every condition matches. Immediate rules execute inline; delayed rules
/// are handed to the scheduler.
pub struct RuleEngine {
    repos: Repositories,
    events: Arc<dyn EventSink>,
    executor: Arc<ActionExecutor>,
    scheduler: DelayedAutomationScheduler,
}

impl RuleEngine {
    /// Creates an engine over the given repositories.
    #[must_use]
    pub fn new(
        repos: Repositories,
        events: Arc<dyn EventSink>,
        executor: Arc<ActionExecutor>,
    ) -> Self {
        Self {
            repos,
            events,
            executor,
            scheduler: DelayedAutomationScheduler::new(),
        }
    }

    /// The delayed-automation scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &DelayedAutomationScheduler {
        &self.scheduler
    }

    /// Evaluates stage-entry rules for an assignment.
    ///
    /// # Errors
    ///
    /// Propagates repository failures; individual action failures are
    /// recorded in the returned executions instead.
    pub async fn on_stage_entry(
        &self,
        assignment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<AutomationExecution>, HireflowError> {
        self.evaluate(assignment_id, AutomationTrigger::StageEntry, now)
            .await
    }

    /// Evaluates field-update rules for an assignment.
    ///
    /// # Errors
    ///
    /// Propagates repository failures; individual action failures are
    /// recorded in the returned executions instead.
    pub async fn on_field_update(
        &self,
        assignment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<AutomationExecution>, HireflowError> {
        self.evaluate(assignment_id, AutomationTrigger::FieldUpdate, now)
            .await
    }

    /// Cancels every pending delayed automation of an assignment.
    pub async fn cancel_scheduled_for(&self, assignment_id: Uuid) -> usize {
        self.scheduler.cancel_for_assignment(assignment_id).await
    }

    async fn evaluate(
        &self,
        assignment_id: Uuid,
        trigger: AutomationTrigger,
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
            return Ok(Vec::new());
        }

        let facts = assignment.facts(now);
        let rules = self
            .repos
            .automations
            .rules_for_stage(assignment.current_stage_id)
            .await?;

        let mut records = Vec::new();
        for rule in rules {
            if !rule.active || rule.trigger != trigger || !rule.matches(&facts) {
                continue;
            }

            if rule.delay_minutes > 0 {
                let delay_minutes = rule.delay_minutes;
                let rule_id = rule.id;
                self.scheduler.schedule(
                    rule,
                    assignment_id,
                    ScheduleDeps {
                        repos: self.repos.clone(),
                        events: Arc::clone(&self.events),
                        executor: Arc::clone(&self.executor),
                    },
                );
                self.events
                    .emit(EngineEvent::AutomationScheduled {
                        rule_id,
                        assignment_id,
                        delay_minutes,
                    })
                    .await;
            } else {
                records.extend(self.executor.execute_rule(&rule, assignment_id, now).await?);
            }
        }
        Ok(records)
    }
}
