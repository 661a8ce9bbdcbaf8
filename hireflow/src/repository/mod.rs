//! Repository traits injected into every engine component.
//!
//! Each persisted entity gets its own trait so embedders can back the engine
//! with any store; the bundled [`memory`] implementation serves tests and
//! database-free embedding. Batch-insert methods are the transaction
//! boundary: an implementation must persist the whole batch or nothing.
//!
//! For a SQL-backed implementation the entities map onto the tables
//! `modelos_pipeline`, `etapas_modelo_pipeline`, `slas_etapas`,
//! `alertas_sla`, `automatizacoes_etapa`, `motivos_reprovacao`,
//! `checklists_etapa`.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::ChecklistItem;
use crate::core::{
    Alert, AutomationExecution, AutomationRule, CandidateStageAssignment, PipelineModel,
    RejectionReason, SlaDefinition, StageInstance,
};
use crate::errors::HireflowError;

/// Pipeline models and their stages.
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Persists a model together with its stages, all-or-nothing.
    async fn insert_model_with_stages(
        &self,
        model: PipelineModel,
        stages: Vec<StageInstance>,
    ) -> Result<(), HireflowError>;

    /// Looks up a model.
    async fn model(&self, id: Uuid) -> Result<Option<PipelineModel>, HireflowError>;

    /// All models of a company.
    async fn models_for_company(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<PipelineModel>, HireflowError>;

    /// Stages of a model, ordered by their `order` field.
    async fn stages_for_model(&self, model_id: Uuid) -> Result<Vec<StageInstance>, HireflowError>;

    /// Looks up a single stage.
    async fn stage(&self, stage_id: Uuid) -> Result<Option<StageInstance>, HireflowError>;

    /// Marks `model_id` as the company default, unsetting any previous
    /// default in the same write.
    async fn set_default(&self, company_id: Uuid, model_id: Uuid) -> Result<(), HireflowError>;
}

/// Candidate stage assignments.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Persists a new assignment.
    async fn insert(&self, assignment: CandidateStageAssignment) -> Result<(), HireflowError>;

    /// Looks up an assignment.
    async fn get(&self, id: Uuid) -> Result<Option<CandidateStageAssignment>, HireflowError>;

    /// All active assignments.
    async fn active(&self) -> Result<Vec<CandidateStageAssignment>, HireflowError>;

    /// Replaces an assignment iff the stored version equals
    /// `expected_version`.
    ///
    /// # Errors
    ///
    /// [`HireflowError::ConcurrentModification`] on a version mismatch,
    /// [`HireflowError::NotFound`] when the assignment does not exist.
    async fn update_if_version(
        &self,
        assignment: CandidateStageAssignment,
        expected_version: u64,
    ) -> Result<(), HireflowError>;
}

/// SLA definitions.
#[async_trait]
pub trait SlaRepository: Send + Sync {
    /// Persists a batch of definitions, all-or-nothing.
    async fn insert_batch(&self, slas: Vec<SlaDefinition>) -> Result<(), HireflowError>;

    /// Looks up a definition.
    async fn get(&self, id: Uuid) -> Result<Option<SlaDefinition>, HireflowError>;

    /// Definitions bound to a stage.
    async fn for_stage(&self, stage_id: Uuid) -> Result<Vec<SlaDefinition>, HireflowError>;
}

/// SLA alerts.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Persists a new alert.
    async fn insert(&self, alert: Alert) -> Result<(), HireflowError>;

    /// Replaces an existing alert.
    async fn update(&self, alert: Alert) -> Result<(), HireflowError>;

    /// The open (non-resolved) alert for one (SLA, assignment) pair, if
    /// any. The evaluator keeps at most one.
    async fn open_for(
        &self,
        sla_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<Option<Alert>, HireflowError>;

    /// All open alerts for an assignment.
    async fn open_for_assignment(&self, assignment_id: Uuid) -> Result<Vec<Alert>, HireflowError>;

    /// All pending (created, undelivered) alerts.
    async fn pending(&self) -> Result<Vec<Alert>, HireflowError>;
}

/// Automation rules.
#[async_trait]
pub trait AutomationRepository: Send + Sync {
    /// Persists a batch of rules, all-or-nothing.
    async fn insert_batch(&self, rules: Vec<AutomationRule>) -> Result<(), HireflowError>;

    /// Rules attached to a stage, ordered by their `order` field.
    async fn rules_for_stage(&self, stage_id: Uuid) -> Result<Vec<AutomationRule>, HireflowError>;
}

/// Checklist items created from templates.
#[async_trait]
pub trait ChecklistRepository: Send + Sync {
    /// Persists a batch of items, all-or-nothing.
    async fn insert_batch(&self, items: Vec<ChecklistItem>) -> Result<(), HireflowError>;

    /// Items for a stage, ordered.
    async fn for_stage(&self, stage_id: Uuid) -> Result<Vec<ChecklistItem>, HireflowError>;
}

/// Rejection reason catalogs.
#[async_trait]
pub trait RejectionRepository: Send + Sync {
    /// Persists a batch of reasons, all-or-nothing.
    async fn insert_batch(&self, reasons: Vec<RejectionReason>) -> Result<(), HireflowError>;

    /// Looks up a reason.
    async fn get(&self, id: Uuid) -> Result<Option<RejectionReason>, HireflowError>;

    /// Reasons of a company, ordered.
    async fn for_company(&self, company_id: Uuid) -> Result<Vec<RejectionReason>, HireflowError>;
}

/// Automation execution records.
#[async_trait]
pub trait ExecutionRepository: Send + Sync {
    /// Records an execution.
    async fn record(&self, execution: AutomationExecution) -> Result<(), HireflowError>;

    /// All permanently failed executions, for operator visibility.
    async fn failed(&self) -> Result<Vec<AutomationExecution>, HireflowError>;

    /// All executions of a rule.
    async fn for_rule(&self, rule_id: Uuid) -> Result<Vec<AutomationExecution>, HireflowError>;
}

/// The repository bundle injected into engine components.
#[derive(Clone)]
pub struct Repositories {
    /// Pipeline models and stages.
    pub models: Arc<dyn ModelRepository>,
    /// Candidate stage assignments.
    pub assignments: Arc<dyn AssignmentRepository>,
    /// SLA definitions.
    pub slas: Arc<dyn SlaRepository>,
    /// SLA alerts.
    pub alerts: Arc<dyn AlertRepository>,
    /// Automation rules.
    pub automations: Arc<dyn AutomationRepository>,
    /// Checklist items.
    pub checklists: Arc<dyn ChecklistRepository>,
    /// Rejection reasons.
    pub rejections: Arc<dyn RejectionRepository>,
    /// Automation execution records.
    pub executions: Arc<dyn ExecutionRepository>,
}

impl Repositories {
    /// Builds a bundle backed by a single in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            models: store.clone(),
            assignments: store.clone(),
            slas: store.clone(),
            alerts: store.clone(),
            automations: store.clone(),
            checklists: store.clone(),
            rejections: store.clone(),
            executions: store,
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
