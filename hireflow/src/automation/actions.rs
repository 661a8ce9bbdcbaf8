//! Automation action execution.
//!
//! Every action firing leaves an [`AutomationExecution`] record, success or
//! failure. Remote actions (notify, webhook) retry within the rule's
//! attempt budget; exhaustion records a permanent failure and never crashes
//! the evaluating pass.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::retry::{with_retry, RetryConfig};
use crate::core::{AutomationAction, AutomationExecution, AutomationRule};
use crate::errors::HireflowError;
use crate::events::{EngineEvent, EventSink};
use crate::notify::NotificationDispatcher;
use crate::repository::Repositories;
use crate::transition::apply_stage_move;
#[cfg(feature = "webhook")]
use crate::webhook::{WebhookDispatcher, WebhookPayload};

/// Executes the actions of fired rules and records their outcomes.
pub struct ActionExecutor {
    repos: Repositories,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn NotificationDispatcher>,
    retry: RetryConfig,
    #[cfg(feature = "webhook")]
    webhooks: Option<Arc<WebhookDispatcher>>,
}

impl ActionExecutor {
    /// Creates an executor. Webhook delivery stays disabled until a
    /// dispatcher is attached.
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
            retry: RetryConfig::default(),
            #[cfg(feature = "webhook")]
            webhooks: None,
        }
    }

    /// Overrides the retry policy for remote actions.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Attaches a webhook dispatcher.
    #[cfg(feature = "webhook")]
    #[must_use]
    pub fn with_webhooks(mut self, webhooks: Arc<WebhookDispatcher>) -> Self {
        self.webhooks = Some(webhooks);
        self
    }

    /// Executes a rule's actions sequentially, recording each outcome.
    ///
    /// Individual action failures are recorded, not propagated; a failing
    /// action does not stop the remaining actions of the rule.
    ///
    /// # Errors
    ///
    /// Propagates repository failures only.
    pub async fn execute_rule(
        &self,
        rule: &AutomationRule,
        assignment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<AutomationExecution>, HireflowError> {
        self.events
            .emit(EngineEvent::AutomationFired {
                rule_id: rule.id,
                assignment_id,
            })
            .await;

        let mut records = Vec::with_capacity(rule.actions.len());
        for action in &rule.actions {
            let record = self.execute_action(rule, assignment_id, action, now).await;
            if let Some(error) = &record.error {
                warn!(
                    rule = %rule.name,
                    action = %record.action,
                    %error,
                    "automation action failed"
                );
            }
            self.repos.executions.record(record.clone()).await?;
            records.push(record);
        }
        Ok(records)
    }

    async fn execute_action(
        &self,
        rule: &AutomationRule,
        assignment_id: Uuid,
        action: &AutomationAction,
        now: DateTime<Utc>,
    ) -> AutomationExecution {
        let kind = action.kind();
        match action {
            AutomationAction::MoveStage { target_stage_id } => {
                match apply_stage_move(
                    &self.repos,
                    self.events.as_ref(),
                    assignment_id,
                    *target_stage_id,
                    now,
                )
                .await
                {
                    Ok(_) => AutomationExecution::completed(rule.id, assignment_id, kind, 1, now),
                    Err(error) => AutomationExecution::failed(
                        rule.id,
                        assignment_id,
                        kind,
                        1,
                        error.to_string(),
                        now,
                    ),
                }
            }
            AutomationAction::Notify { target, message } => {
                let outcome = with_retry(&self.retry, rule.max_attempts, |_| {
                    self.notifier.notify(target, message)
                })
                .await;
                match outcome {
                    Ok(((), attempts)) => {
                        AutomationExecution::completed(rule.id, assignment_id, kind, attempts, now)
                    }
                    Err((error, attempts)) => {
                        let permanent = HireflowError::permanent_failure(
                            rule.name.clone(),
                            attempts,
                            error.to_string(),
                        );
                        AutomationExecution::failed(
                            rule.id,
                            assignment_id,
                            kind,
                            attempts,
                            permanent.to_string(),
                            now,
                        )
                    }
                }
            }
            AutomationAction::Webhook { config } => {
                self.execute_webhook(rule, assignment_id, config, now).await
            }
            AutomationAction::RecordRejection { reason_id, note } => {
                match self
                    .record_rejection(assignment_id, *reason_id, note.as_deref(), now)
                    .await
                {
                    Ok(()) => AutomationExecution::completed(rule.id, assignment_id, kind, 1, now),
                    Err(error) => AutomationExecution::failed(
                        rule.id,
                        assignment_id,
                        kind,
                        1,
                        error.to_string(),
                        now,
                    ),
                }
            }
            AutomationAction::Custom { name, data } => {
                debug!(rule = %rule.name, hook = %name, ?data, "custom automation hook");
                AutomationExecution::completed(rule.id, assignment_id, kind, 1, now)
            }
        }
    }

    #[cfg(feature = "webhook")]
    async fn execute_webhook(
        &self,
        rule: &AutomationRule,
        assignment_id: Uuid,
        config: &crate::core::WebhookConfig,
        now: DateTime<Utc>,
    ) -> AutomationExecution {
        let Some(webhooks) = &self.webhooks else {
            return AutomationExecution::failed(
                rule.id,
                assignment_id,
                "webhook",
                0,
                "no webhook dispatcher configured",
                now,
            );
        };

        let assignment = match self.repos.assignments.get(assignment_id).await {
            Ok(Some(assignment)) => assignment,
            Ok(None) => {
                return AutomationExecution::failed(
                    rule.id,
                    assignment_id,
                    "webhook",
                    0,
                    "assignment no longer exists",
                    now,
                )
            }
            Err(error) => {
                return AutomationExecution::failed(
                    rule.id,
                    assignment_id,
                    "webhook",
                    0,
                    error.to_string(),
                    now,
                )
            }
        };

        let payload = WebhookPayload::new(
            assignment.candidate_id,
            assignment.job_id,
            serde_json::json!({
                "etapa_id": assignment.current_stage_id,
                "regra": rule.name,
            }),
        );

        match webhooks.deliver(config, &payload, rule.max_attempts).await {
            Ok(delivery) => {
                self.events
                    .emit(EngineEvent::WebhookDelivered {
                        rule_id: rule.id,
                        url: config.url.clone(),
                        status: delivery.status,
                    })
                    .await;
                AutomationExecution::completed(
                    rule.id,
                    assignment_id,
                    "webhook",
                    delivery.attempts,
                    now,
                )
            }
            Err(error) => {
                let attempts = match &error {
                    HireflowError::WebhookDelivery(e) => e.attempt,
                    _ => 1,
                };
                self.events
                    .emit(EngineEvent::WebhookFailed {
                        rule_id: rule.id,
                        url: config.url.clone(),
                        attempts,
                    })
                    .await;
                let permanent = HireflowError::permanent_failure(
                    rule.name.clone(),
                    attempts,
                    error.to_string(),
                );
                AutomationExecution::failed(
                    rule.id,
                    assignment_id,
                    "webhook",
                    attempts,
                    permanent.to_string(),
                    now,
                )
            }
        }
    }

    #[cfg(not(feature = "webhook"))]
    async fn execute_webhook(
        &self,
        rule: &AutomationRule,
        assignment_id: Uuid,
        _config: &crate::core::WebhookConfig,
        now: DateTime<Utc>,
    ) -> AutomationExecution {
        AutomationExecution::failed(
            rule.id,
            assignment_id,
            "webhook",
            0,
            "webhook support disabled at build time",
            now,
        )
    }

    /// Rejects the candidate with a catalogued reason, against the
    /// assignment's currently stored version.
    async fn record_rejection(
        &self,
        assignment_id: Uuid,
        reason_id: Uuid,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), HireflowError> {
        crate::transition::apply_rejection(
            &self.repos,
            self.events.as_ref(),
            assignment_id,
            reason_id,
            note,
            None,
            now,
        )
        .await
        .map(|_| ())
    }
}
