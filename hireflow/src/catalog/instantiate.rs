//! Catalog instantiation: copying templates into company-owned records.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::defaults::{
    automation_templates, checklist_templates, rejection_reason_templates, sla_templates,
    stage_templates,
};
use super::{CategoryCode, ChecklistItem, TemplateAction};
use crate::core::{
    AutomationAction, AutomationRule, ContractType, InstantiatedModel, PipelineModel,
    RejectionReason, SlaDefinition, StageInstance,
};
use crate::errors::{HireflowError, ValidationError};
use crate::events::{EngineEvent, EventSink};
use crate::repository::Repositories;

/// Copies catalog templates into persisted, company-owned records.
///
/// Every instantiation builds its whole batch first and persists it through
/// a single batch-insert, so a failure leaves no partial state behind.
pub struct CatalogService {
    repos: Repositories,
    events: Arc<dyn EventSink>,
}

impl CatalogService {
    /// Creates a service over the given repositories.
    #[must_use]
    pub fn new(repos: Repositories, events: Arc<dyn EventSink>) -> Self {
        Self { repos, events }
    }

    /// Instantiates a pipeline model from the stage template catalog.
    ///
    /// Templates are filtered by `contract_type`; the surviving stages are
    /// created in template order starting at order 1. The new model becomes
    /// the company default, unsetting any previous default.
    ///
    /// # Errors
    ///
    /// Propagates repository failures. The batch either fully persists or
    /// not at all.
    pub async fn instantiate_pipeline_model(
        &self,
        company_id: Uuid,
        name: impl Into<String>,
        contract_type: ContractType,
        now: DateTime<Utc>,
    ) -> Result<InstantiatedModel, HireflowError> {
        let model = PipelineModel::new(company_id, name, now).as_default();

        let stages: Vec<StageInstance> = stage_templates()
            .iter()
            .filter(|t| t.applies_to(contract_type))
            .enumerate()
            .map(|(index, template)| {
                #[allow(clippy::cast_possible_truncation)]
                let order = index as u32 + 1;
                StageInstance::from_template(model.id, order, template)
            })
            .collect();

        self.repos
            .models
            .insert_model_with_stages(model.clone(), stages.clone())
            .await?;
        self.repos
            .models
            .set_default(company_id, model.id)
            .await?;

        self.events
            .emit(EngineEvent::ModelInstantiated {
                model_id: model.id,
                company_id,
                stage_count: stages.len(),
            })
            .await;

        Ok(InstantiatedModel { model, stages })
    }

    /// Marks a model as the company default, unsetting the previous one.
    ///
    /// # Errors
    ///
    /// [`HireflowError::NotFound`] for an unknown model,
    /// [`HireflowError::Validation`] when the model belongs to another
    /// company.
    pub async fn set_default_model(
        &self,
        company_id: Uuid,
        model_id: Uuid,
    ) -> Result<(), HireflowError> {
        let model = self
            .repos
            .models
            .model(model_id)
            .await?
            .ok_or_else(|| HireflowError::not_found("pipeline model", model_id))?;
        if model.company_id != company_id {
            return Err(ValidationError::new(format!(
                "model '{}' belongs to another company",
                model.name
            ))
            .into());
        }
        self.repos.models.set_default(company_id, model_id).await
    }

    /// Instantiates checklist items for a stage from a raw category code.
    ///
    /// # Errors
    ///
    /// [`HireflowError::UnknownCategory`] when `category` has no mapping.
    pub async fn instantiate_checklists(
        &self,
        stage_id: Uuid,
        category: &str,
    ) -> Result<Vec<ChecklistItem>, HireflowError> {
        let code = CategoryCode::from_str(category)?;
        let items: Vec<ChecklistItem> = checklist_templates(code)
            .iter()
            .enumerate()
            .map(|(index, template)| {
                #[allow(clippy::cast_possible_truncation)]
                let order = index as u32 + 1;
                ChecklistItem::from_template(stage_id, order, template)
            })
            .collect();
        self.repos.checklists.insert_batch(items.clone()).await?;
        Ok(items)
    }

    /// Instantiates SLA definitions for a stage.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn instantiate_slas(
        &self,
        stage_id: Uuid,
        code: CategoryCode,
    ) -> Result<Vec<SlaDefinition>, HireflowError> {
        let slas: Vec<SlaDefinition> = sla_templates(code)
            .into_iter()
            .map(|template| {
                SlaDefinition::new(stage_id, template.name, template.deadline)
                    .with_alert_before_hours(template.alert_before_hours)
                    .with_alert_after_hours(template.alert_after_hours)
                    .with_notification_targets(template.notification_targets)
                    .with_escalation_targets(template.escalation_targets)
            })
            .collect();
        self.repos.slas.insert_batch(slas.clone()).await?;
        Ok(slas)
    }

    /// Instantiates automation rules for a stage.
    ///
    /// `next_stage_id` resolves [`TemplateAction::AdvanceStage`]; templates
    /// that advance are skipped on the last stage of a model.
    ///
    /// # Errors
    ///
    /// Propagates repository failures and rule validation errors.
    pub async fn instantiate_automations(
        &self,
        stage_id: Uuid,
        next_stage_id: Option<Uuid>,
        code: CategoryCode,
    ) -> Result<Vec<AutomationRule>, HireflowError> {
        let mut rules = Vec::new();
        for (index, template) in automation_templates(code).into_iter().enumerate() {
            let action = match template.action {
                TemplateAction::AdvanceStage => match next_stage_id {
                    Some(target_stage_id) => AutomationAction::MoveStage { target_stage_id },
                    None => {
                        debug!(
                            rule = %template.name,
                            "skipping advance-stage template on last stage"
                        );
                        continue;
                    }
                },
                TemplateAction::Notify { target, message } => {
                    AutomationAction::Notify { target, message }
                }
                TemplateAction::Webhook { config } => AutomationAction::Webhook { config },
            };

            #[allow(clippy::cast_possible_truncation)]
            let mut rule = AutomationRule::new(stage_id, template.name, template.trigger)
                .with_delay_minutes(template.delay_minutes)
                .with_max_attempts(template.max_attempts)
                .with_order(index as u32 + 1)
                .with_action(action);
            rule.conditions = template.conditions;
            rules.push(rule);
        }
        self.repos.automations.insert_batch(rules.clone()).await?;
        Ok(rules)
    }

    /// Instantiates the default rejection reason catalog for a company.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn instantiate_rejection_reasons(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<RejectionReason>, HireflowError> {
        let reasons: Vec<RejectionReason> = rejection_reason_templates()
            .into_iter()
            .enumerate()
            .map(|(index, template)| {
                #[allow(clippy::cast_possible_truncation)]
                let mut reason = RejectionReason::new(
                    company_id,
                    template.name,
                    template.category,
                    index as u32 + 1,
                );
                reason.required = template.required;
                reason
            })
            .collect();
        self.repos.rejections.insert_batch(reasons.clone()).await?;
        Ok(reasons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoOpEventSink;
    use pretty_assertions::assert_eq;

    fn service() -> (CatalogService, Repositories) {
        let repos = Repositories::in_memory();
        let service = CatalogService::new(repos.clone(), Arc::new(NoOpEventSink));
        (service, repos)
    }

    #[tokio::test]
    async fn test_model_stages_are_densely_ordered() {
        let (service, _) = service();
        let instantiated = service
            .instantiate_pipeline_model(Uuid::new_v4(), "Padrão CLT", ContractType::Clt, Utc::now())
            .await
            .unwrap();

        let orders: Vec<u32> = instantiated.stages.iter().map(|s| s.order).collect();
        let expected: Vec<u32> = (1..=instantiated.stages.len() as u32).collect();
        assert_eq!(orders, expected);
        assert!(instantiated.model.is_default);
    }

    #[tokio::test]
    async fn test_pj_model_excludes_clt_only_stages() {
        let (service, _) = service();
        let instantiated = service
            .instantiate_pipeline_model(Uuid::new_v4(), "Padrão PJ", ContractType::Pj, Utc::now())
            .await
            .unwrap();

        let names: Vec<&str> = instantiated.stages.iter().map(|s| s.name.as_str()).collect();
        for excluded in [
            "Realização de Exames Médicos",
            "Período de Experiência – Fase 1",
            "Prorrogação do Contrato de Experiência",
            "Efetivação – Após 90 dias",
        ] {
            assert!(!names.contains(&excluded), "'{excluded}' must be absent");
        }
        // Order stays dense after filtering.
        let orders: Vec<u32> = instantiated.stages.iter().map(|s| s.order).collect();
        let expected: Vec<u32> = (1..=instantiated.stages.len() as u32).collect();
        assert_eq!(orders, expected);
    }

    #[tokio::test]
    async fn test_second_model_takes_over_default() {
        let (service, repos) = service();
        let company = Uuid::new_v4();
        let first = service
            .instantiate_pipeline_model(company, "CLT", ContractType::Clt, Utc::now())
            .await
            .unwrap();
        let second = service
            .instantiate_pipeline_model(company, "PJ", ContractType::Pj, Utc::now())
            .await
            .unwrap();

        let models = repos.models.models_for_company(company).await.unwrap();
        let defaults: Vec<_> = models.iter().filter(|m| m.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, second.model.id);

        service
            .set_default_model(company, first.model.id)
            .await
            .unwrap();
        let models = repos.models.models_for_company(company).await.unwrap();
        let defaults: Vec<_> = models.iter().filter(|m| m.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, first.model.id);
    }

    #[tokio::test]
    async fn test_set_default_rejects_foreign_model() {
        let (service, _) = service();
        let company = Uuid::new_v4();
        let other_company = Uuid::new_v4();
        let model = service
            .instantiate_pipeline_model(other_company, "CLT", ContractType::Clt, Utc::now())
            .await
            .unwrap();

        let result = service.set_default_model(company, model.model.id).await;
        assert!(matches!(result, Err(HireflowError::Validation(_))));
    }

    #[tokio::test]
    async fn test_checklist_order_matches_catalog() {
        let (service, repos) = service();
        let stage_id = Uuid::new_v4();
        let created = service
            .instantiate_checklists(stage_id, "documentacao")
            .await
            .unwrap();

        let catalog = checklist_templates(CategoryCode::Documentacao);
        assert_eq!(created.len(), catalog.len());
        for (index, (item, template)) in created.iter().zip(catalog.iter()).enumerate() {
            assert_eq!(item.order, index as u32 + 1);
            assert_eq!(item.label, template.label);
        }

        let stored = repos.checklists.for_stage(stage_id).await.unwrap();
        assert_eq!(stored.len(), catalog.len());
    }

    #[tokio::test]
    async fn test_unknown_category_fails_instantiation() {
        let (service, repos) = service();
        let stage_id = Uuid::new_v4();
        let result = service.instantiate_checklists(stage_id, "onboarding").await;

        assert!(matches!(result, Err(HireflowError::UnknownCategory(_))));
        assert!(repos.checklists.for_stage(stage_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_advance_stage_template_skipped_on_last_stage() {
        let (service, _) = service();
        let stage_id = Uuid::new_v4();
        let rules = service
            .instantiate_automations(stage_id, None, CategoryCode::Triagem)
            .await
            .unwrap();
        assert!(rules.is_empty());

        let rules = service
            .instantiate_automations(stage_id, Some(Uuid::new_v4()), CategoryCode::Triagem)
            .await
            .unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[tokio::test]
    async fn test_rejection_reasons_keep_catalog_order() {
        let (service, repos) = service();
        let company = Uuid::new_v4();
        service.instantiate_rejection_reasons(company).await.unwrap();

        let stored = repos.rejections.for_company(company).await.unwrap();
        let catalog = rejection_reason_templates();
        assert_eq!(stored.len(), catalog.len());
        for (index, (reason, template)) in stored.iter().zip(catalog.iter()).enumerate() {
            assert_eq!(reason.order, index as u32 + 1);
            assert_eq!(reason.name, template.name);
        }
    }
}
