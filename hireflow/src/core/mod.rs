//! Core domain types.
//!
//! This module provides:
//! - Stage templates, stage instances and pipeline models
//! - Candidate stage assignments with optimistic versioning
//! - SLA definitions, deadline arithmetic and alerts
//! - Automation rules, conditions, actions and execution records
//! - Rejection reason catalog entries

mod alert;
mod assignment;
mod automation;
mod model;
mod rejection;
mod sla;
mod stage;

pub use alert::{Alert, AlertClassification, AlertStatus, Urgency};
pub use assignment::CandidateStageAssignment;
pub use automation::{
    AutomationAction, AutomationExecution, AutomationRule, AutomationTrigger, Condition,
    ConditionOperator, ExecutionOutcome, FactSet, FactValue, ValueType, WebhookConfig,
    WebhookMethod,
};
pub use model::{InstantiatedModel, PipelineModel};
pub use rejection::{RejectionCategory, RejectionReason};
pub use sla::{Deadline, DeadlineUnit, SlaDefinition};
pub use stage::{ContractType, StageInstance, StageKind, StageTemplate};
