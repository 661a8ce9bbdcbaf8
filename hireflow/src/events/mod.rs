//! Engine events and event sinks.
//!
//! Every engine component emits typed events through an [`EventSink`] for
//! observability and analytics. Sinks must never fail the caller; delivery
//! problems are logged and suppressed.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::core::AlertClassification;

/// A typed event emitted by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A pipeline model was instantiated from templates.
    ModelInstantiated {
        /// The new model.
        model_id: Uuid,
        /// The owning company.
        company_id: Uuid,
        /// Number of stages created.
        stage_count: usize,
    },
    /// A candidate moved between stages.
    StageTransition {
        /// The assignment that moved.
        assignment_id: Uuid,
        /// The stage left.
        from_stage_id: Uuid,
        /// The stage entered.
        to_stage_id: Uuid,
    },
    /// A candidate was rejected.
    CandidateRejected {
        /// The assignment.
        assignment_id: Uuid,
        /// The catalogued reason.
        reason_id: Uuid,
    },
    /// The SLA evaluator created a new alert.
    AlertCreated {
        /// The alert.
        alert_id: Uuid,
        /// The SLA definition.
        sla_id: Uuid,
        /// The assignment.
        assignment_id: Uuid,
        /// Initial classification.
        classification: AlertClassification,
    },
    /// An existing alert escalated.
    AlertEscalated {
        /// The alert.
        alert_id: Uuid,
        /// The SLA definition.
        sla_id: Uuid,
        /// The assignment.
        assignment_id: Uuid,
    },
    /// An alert resolved because its SLA is satisfied again or the
    /// candidate left the stage.
    AlertResolved {
        /// The alert.
        alert_id: Uuid,
    },
    /// An automation rule fired immediately.
    AutomationFired {
        /// The rule.
        rule_id: Uuid,
        /// The assignment.
        assignment_id: Uuid,
    },
    /// An automation rule was scheduled for delayed execution.
    AutomationScheduled {
        /// The rule.
        rule_id: Uuid,
        /// The assignment.
        assignment_id: Uuid,
        /// The configured delay.
        delay_minutes: u64,
    },
    /// A scheduled automation was cancelled before running.
    AutomationCancelled {
        /// The rule.
        rule_id: Uuid,
        /// The assignment.
        assignment_id: Uuid,
    },
    /// A webhook was delivered.
    WebhookDelivered {
        /// The rule owning the webhook action.
        rule_id: Uuid,
        /// The target URL.
        url: String,
        /// HTTP status received.
        status: u16,
    },
    /// A webhook permanently failed.
    WebhookFailed {
        /// The rule owning the webhook action.
        rule_id: Uuid,
        /// The target URL.
        url: String,
        /// Attempts used.
        attempts: u32,
    },
}

impl EngineEvent {
    /// Stable event kind string (e.g. `sla.alert_created`).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelInstantiated { .. } => "model.instantiated",
            Self::StageTransition { .. } => "stage.transition",
            Self::CandidateRejected { .. } => "stage.candidate_rejected",
            Self::AlertCreated { .. } => "sla.alert_created",
            Self::AlertEscalated { .. } => "sla.alert_escalated",
            Self::AlertResolved { .. } => "sla.alert_resolved",
            Self::AutomationFired { .. } => "automation.fired",
            Self::AutomationScheduled { .. } => "automation.scheduled",
            Self::AutomationCancelled { .. } => "automation.cancelled",
            Self::WebhookDelivered { .. } => "webhook.delivered",
            Self::WebhookFailed { .. } => "webhook.failed",
        }
    }
}

/// Trait for sinks receiving engine events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: EngineEvent);

    /// Emits an event without blocking. Must never panic; errors are
    /// logged and suppressed.
    fn try_emit(&self, event: EngineEvent);
}

/// A sink that discards all events. The default when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: EngineEvent) {}

    fn try_emit(&self, _event: EngineEvent) {}
}

/// A sink that logs events through the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSink;

impl LoggingEventSink {
    /// Creates a new logging sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn log_event(event: &EngineEvent) {
        info!(
            event_kind = %event.kind(),
            event_data = ?event,
            "engine event"
        );
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: EngineEvent) {
        Self::log_event(&event);
    }

    fn try_emit(&self, event: EngineEvent) {
        Self::log_event(&event);
    }
}

/// A collecting sink for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<EngineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.read().clone()
    }

    /// Number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Whether no events were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns events whose kind starts with `prefix`.
    #[must_use]
    pub fn events_of_kind(&self, prefix: &str) -> Vec<EngineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.kind().starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: EngineEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: EngineEvent) {
        self.events.write().push(event);
    }
}
