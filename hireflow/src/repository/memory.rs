//! In-memory repository implementation backed by concurrent maps.
//!
//! Backs tests and embedding without a database. Batch inserts hold no lock
//! across entities, but each map insert is atomic and batches are validated
//! before the first write, so a batch never partially applies.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::{
    AlertRepository, AssignmentRepository, AutomationRepository, ChecklistRepository,
    ExecutionRepository, ModelRepository, RejectionRepository, SlaRepository,
};
use crate::catalog::ChecklistItem;
use crate::core::{
    Alert, AutomationExecution, AutomationRule, CandidateStageAssignment, ExecutionOutcome,
    PipelineModel, RejectionReason, SlaDefinition, StageInstance,
};
use crate::errors::{ConcurrentModificationError, HireflowError};

/// Concurrent in-memory store implementing every repository trait.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    models: DashMap<Uuid, PipelineModel>,
    stages: DashMap<Uuid, StageInstance>,
    assignments: DashMap<Uuid, CandidateStageAssignment>,
    slas: DashMap<Uuid, SlaDefinition>,
    alerts: DashMap<Uuid, Alert>,
    automations: DashMap<Uuid, AutomationRule>,
    checklists: DashMap<Uuid, ChecklistItem>,
    rejections: DashMap<Uuid, RejectionReason>,
    executions: DashMap<Uuid, AutomationExecution>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelRepository for InMemoryStore {
    async fn insert_model_with_stages(
        &self,
        model: PipelineModel,
        stages: Vec<StageInstance>,
    ) -> Result<(), HireflowError> {
        for stage in &stages {
            if stage.model_id != model.id {
                return Err(HireflowError::Repository(format!(
                    "stage '{}' does not belong to model {}",
                    stage.name, model.id
                )));
            }
        }
        for stage in stages {
            self.stages.insert(stage.id, stage);
        }
        self.models.insert(model.id, model);
        Ok(())
    }

    async fn model(&self, id: Uuid) -> Result<Option<PipelineModel>, HireflowError> {
        Ok(self.models.get(&id).map(|m| m.clone()))
    }

    async fn models_for_company(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<PipelineModel>, HireflowError> {
        Ok(self
            .models
            .iter()
            .filter(|m| m.company_id == company_id)
            .map(|m| m.clone())
            .collect())
    }

    async fn stages_for_model(&self, model_id: Uuid) -> Result<Vec<StageInstance>, HireflowError> {
        let mut stages: Vec<StageInstance> = self
            .stages
            .iter()
            .filter(|s| s.model_id == model_id)
            .map(|s| s.clone())
            .collect();
        stages.sort_by_key(|s| s.order);
        Ok(stages)
    }

    async fn stage(&self, stage_id: Uuid) -> Result<Option<StageInstance>, HireflowError> {
        Ok(self.stages.get(&stage_id).map(|s| s.clone()))
    }

    async fn set_default(&self, company_id: Uuid, model_id: Uuid) -> Result<(), HireflowError> {
        if !self.models.contains_key(&model_id) {
            return Err(HireflowError::not_found("pipeline model", model_id));
        }
        for mut entry in self.models.iter_mut() {
            if entry.company_id == company_id {
                entry.is_default = entry.id == model_id;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryStore {
    async fn insert(&self, assignment: CandidateStageAssignment) -> Result<(), HireflowError> {
        self.assignments.insert(assignment.id, assignment);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<CandidateStageAssignment>, HireflowError> {
        Ok(self.assignments.get(&id).map(|a| a.clone()))
    }

    async fn active(&self) -> Result<Vec<CandidateStageAssignment>, HireflowError> {
        Ok(self
            .assignments
            .iter()
            .filter(|a| a.active)
            .map(|a| a.clone())
            .collect())
    }

    async fn update_if_version(
        &self,
        assignment: CandidateStageAssignment,
        expected_version: u64,
    ) -> Result<(), HireflowError> {
        use dashmap::mapref::entry::Entry;

        match self.assignments.entry(assignment.id) {
            Entry::Occupied(mut entry) => {
                let actual = entry.get().version;
                if actual != expected_version {
                    return Err(ConcurrentModificationError::new(
                        assignment.id,
                        expected_version,
                        actual,
                    )
                    .into());
                }
                entry.insert(assignment);
                Ok(())
            }
            Entry::Vacant(_) => Err(HireflowError::not_found(
                "candidate stage assignment",
                assignment.id,
            )),
        }
    }
}

#[async_trait]
impl SlaRepository for InMemoryStore {
    async fn insert_batch(&self, slas: Vec<SlaDefinition>) -> Result<(), HireflowError> {
        for sla in slas {
            self.slas.insert(sla.id, sla);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SlaDefinition>, HireflowError> {
        Ok(self.slas.get(&id).map(|s| s.clone()))
    }

    async fn for_stage(&self, stage_id: Uuid) -> Result<Vec<SlaDefinition>, HireflowError> {
        Ok(self
            .slas
            .iter()
            .filter(|s| s.stage_id == stage_id)
            .map(|s| s.clone())
            .collect())
    }
}

#[async_trait]
impl AlertRepository for InMemoryStore {
    async fn insert(&self, alert: Alert) -> Result<(), HireflowError> {
        self.alerts.insert(alert.id, alert);
        Ok(())
    }

    async fn update(&self, alert: Alert) -> Result<(), HireflowError> {
        if !self.alerts.contains_key(&alert.id) {
            return Err(HireflowError::not_found("alert", alert.id));
        }
        self.alerts.insert(alert.id, alert);
        Ok(())
    }

    async fn open_for(
        &self,
        sla_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<Option<Alert>, HireflowError> {
        Ok(self
            .alerts
            .iter()
            .find(|a| {
                a.sla_id == sla_id && a.assignment_id == assignment_id && a.status.is_open()
            })
            .map(|a| a.clone()))
    }

    async fn open_for_assignment(&self, assignment_id: Uuid) -> Result<Vec<Alert>, HireflowError> {
        Ok(self
            .alerts
            .iter()
            .filter(|a| a.assignment_id == assignment_id && a.status.is_open())
            .map(|a| a.clone())
            .collect())
    }

    async fn pending(&self) -> Result<Vec<Alert>, HireflowError> {
        Ok(self
            .alerts
            .iter()
            .filter(|a| a.status == crate::core::AlertStatus::Pending)
            .map(|a| a.clone())
            .collect())
    }
}

#[async_trait]
impl AutomationRepository for InMemoryStore {
    async fn insert_batch(&self, rules: Vec<AutomationRule>) -> Result<(), HireflowError> {
        for rule in &rules {
            rule.validate()?;
        }
        for rule in rules {
            self.automations.insert(rule.id, rule);
        }
        Ok(())
    }

    async fn rules_for_stage(&self, stage_id: Uuid) -> Result<Vec<AutomationRule>, HireflowError> {
        let mut rules: Vec<AutomationRule> = self
            .automations
            .iter()
            .filter(|r| r.stage_id == stage_id)
            .map(|r| r.clone())
            .collect();
        rules.sort_by_key(|r| r.order);
        Ok(rules)
    }
}

#[async_trait]
impl ChecklistRepository for InMemoryStore {
    async fn insert_batch(&self, items: Vec<ChecklistItem>) -> Result<(), HireflowError> {
        for item in items {
            self.checklists.insert(item.id, item);
        }
        Ok(())
    }

    async fn for_stage(&self, stage_id: Uuid) -> Result<Vec<ChecklistItem>, HireflowError> {
        let mut items: Vec<ChecklistItem> = self
            .checklists
            .iter()
            .filter(|c| c.stage_id == stage_id)
            .map(|c| c.clone())
            .collect();
        items.sort_by_key(|c| c.order);
        Ok(items)
    }
}

#[async_trait]
impl RejectionRepository for InMemoryStore {
    async fn insert_batch(&self, reasons: Vec<RejectionReason>) -> Result<(), HireflowError> {
        for reason in reasons {
            self.rejections.insert(reason.id, reason);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<RejectionReason>, HireflowError> {
        Ok(self.rejections.get(&id).map(|r| r.clone()))
    }

    async fn for_company(&self, company_id: Uuid) -> Result<Vec<RejectionReason>, HireflowError> {
        let mut reasons: Vec<RejectionReason> = self
            .rejections
            .iter()
            .filter(|r| r.company_id == company_id)
            .map(|r| r.clone())
            .collect();
        reasons.sort_by_key(|r| r.order);
        Ok(reasons)
    }
}

#[async_trait]
impl ExecutionRepository for InMemoryStore {
    async fn record(&self, execution: AutomationExecution) -> Result<(), HireflowError> {
        self.executions.insert(execution.id, execution);
        Ok(())
    }

    async fn failed(&self) -> Result<Vec<AutomationExecution>, HireflowError> {
        Ok(self
            .executions
            .iter()
            .filter(|e| e.outcome == ExecutionOutcome::Failed)
            .map(|e| e.clone())
            .collect())
    }

    async fn for_rule(&self, rule_id: Uuid) -> Result<Vec<AutomationExecution>, HireflowError> {
        Ok(self
            .executions
            .iter()
            .filter(|e| e.rule_id == rule_id)
            .map(|e| e.clone())
            .collect())
    }
}
