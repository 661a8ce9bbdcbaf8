//! # Hireflow
//!
//! The core engine behind a recruitment pipeline product: template-driven
//! stage definitions, SLA deadline tracking with escalation alerts, and
//! rule-based stage automations.
//!
//! Hireflow provides:
//!
//! - **Template catalogs**: seeded stage, checklist, SLA, rejection-reason
//!   and automation defaults, instantiated per company and contract type
//! - **Pipeline models**: per-company ordered stage definitions with a
//!   single-default invariant
//! - **SLA evaluation**: a periodic, idempotent pass classifying every
//!   active assignment and upserting alerts
//! - **Automation rules**: condition→action bindings fired on stage-entry
//!   and field-update events, with delayed cancellable scheduling and
//!   bounded retries
//! - **Webhook delivery**: outbound calls with secret-reference expansion
//!   and jittered exponential backoff
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hireflow::prelude::*;
//!
//! let repos = Repositories::in_memory();
//! let events = Arc::new(LoggingEventSink::new());
//! let catalog = CatalogService::new(repos.clone(), events.clone());
//!
//! let model = catalog
//!     .instantiate_pipeline_model(company_id, "Pipeline CLT", ContractType::Clt, Utc::now())
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod automation;
pub mod catalog;
pub mod core;
pub mod errors;
pub mod events;
pub mod notify;
pub mod repository;
pub mod sla;
pub mod testing;
pub mod transition;

#[cfg(feature = "webhook")]
pub mod webhook;

#[cfg(test)]
mod integration_tests;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::automation::{ActionExecutor, RetryConfig, RuleEngine};
    pub use crate::catalog::{CatalogService, CategoryCode};
    pub use crate::core::{
        Alert, AlertClassification, AlertStatus, AutomationAction, AutomationRule,
        AutomationTrigger, CandidateStageAssignment, Condition, ConditionOperator, ContractType,
        Deadline, DeadlineUnit, FactSet, FactValue, PipelineModel, RejectionReason, SlaDefinition,
        StageInstance, StageKind, StageTemplate, Urgency,
    };
    pub use crate::errors::HireflowError;
    pub use crate::events::{EngineEvent, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::notify::{LoggingDispatcher, NotificationDispatcher};
    pub use crate::repository::Repositories;
    pub use crate::sla::{SlaEvaluator, SlaPassSummary};
    pub use crate::transition::StageTransitionService;
    #[cfg(feature = "webhook")]
    pub use crate::webhook::{SecretStore, WebhookDispatcher, WebhookPayload};
}
