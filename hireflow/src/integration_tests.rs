//! End-to-end tests wiring the catalog, transition, SLA and automation
//! components together over the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use crate::automation::{ActionExecutor, RetryConfig, RuleEngine};
use crate::catalog::{CatalogService, CategoryCode};
use crate::core::{
    AlertClassification, AlertStatus, AutomationAction, AutomationRule, AutomationTrigger,
    CandidateStageAssignment, Condition, ConditionOperator, ContractType, ExecutionOutcome,
    InstantiatedModel,
};
use crate::errors::HireflowError;
use crate::events::CollectingEventSink;
use crate::repository::Repositories;
use crate::sla::SlaEvaluator;
use crate::testing::RecordingDispatcher;
use crate::transition::StageTransitionService;

struct Engine {
    repos: Repositories,
    events: Arc<CollectingEventSink>,
    dispatcher: Arc<RecordingDispatcher>,
    catalog: CatalogService,
    evaluator: SlaEvaluator,
    rules: Arc<RuleEngine>,
    transitions: StageTransitionService,
}

fn engine() -> Engine {
    let repos = Repositories::in_memory();
    let events = Arc::new(CollectingEventSink::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let executor = Arc::new(
        ActionExecutor::new(repos.clone(), events.clone(), dispatcher.clone()).with_retry_config(
            RetryConfig::new().with_base_delay_ms(1).without_jitter(),
        ),
    );
    let rules = Arc::new(RuleEngine::new(repos.clone(), events.clone(), executor));
    let transitions = StageTransitionService::new(repos.clone(), events.clone(), rules.clone());
    let evaluator = SlaEvaluator::new(repos.clone(), events.clone(), dispatcher.clone());
    let catalog = CatalogService::new(repos.clone(), events.clone());
    Engine {
        repos,
        events,
        dispatcher,
        catalog,
        evaluator,
        rules,
        transitions,
    }
}

async fn clt_model(e: &Engine, company: Uuid, now: DateTime<Utc>) -> InstantiatedModel {
    e.catalog
        .instantiate_pipeline_model(company, "Pipeline CLT", ContractType::Clt, now)
        .await
        .unwrap()
}

async fn enter_pipeline(
    e: &Engine,
    stage_id: Uuid,
    entered_at: DateTime<Utc>,
) -> CandidateStageAssignment {
    let assignment =
        CandidateStageAssignment::new(Uuid::new_v4(), Uuid::new_v4(), stage_id, entered_at);
    e.repos.assignments.insert(assignment.clone()).await.unwrap();
    assignment
}

#[tokio::test]
async fn test_sla_alert_lifecycle_48h_deadline() {
    let e = engine();
    let entered = Utc::now();
    let model = clt_model(&e, Uuid::new_v4(), entered).await;
    let triagem = &model.stages[0];

    // Triagem SLA template: 2 days deadline, alert 4h before, escalate 24h
    // after breach.
    let slas = e
        .catalog
        .instantiate_slas(triagem.id, CategoryCode::Triagem)
        .await
        .unwrap();
    let sla = &slas[0];
    assert_eq!(sla.deadline_hours(), 48);

    let assignment = enter_pipeline(&e, triagem.id, entered).await;

    // 47h elapsed, 1h remaining: one pending pre-deadline alert.
    let summary = e
        .evaluator
        .run_pass(entered + Duration::hours(47))
        .await
        .unwrap();
    assert_eq!(summary.alerts_created, 1);

    let alert = e
        .repos
        .alerts
        .open_for(sla.id, assignment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alert.classification, AlertClassification::Approaching);

    // 50h elapsed: the existing alert becomes breached, no second alert.
    let summary = e
        .evaluator
        .run_pass(entered + Duration::hours(50))
        .await
        .unwrap();
    assert_eq!(summary.alerts_created, 0);
    assert_eq!(summary.alerts_updated, 1);

    let breached = e
        .repos
        .alerts
        .open_for(sla.id, assignment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(breached.id, alert.id);
    assert_eq!(breached.classification, AlertClassification::Breached);

    // 80h elapsed (32h overdue, past alert_after=24h): escalated, and the
    // escalation targets join the delivery.
    e.evaluator
        .run_pass(entered + Duration::hours(80))
        .await
        .unwrap();
    let escalated = e
        .repos
        .alerts
        .open_for(sla.id, assignment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(escalated.classification, AlertClassification::Escalated);
    assert_eq!(e.events.events_of_kind("sla.alert_escalated").len(), 1);
}

#[tokio::test]
async fn test_score_automation_moves_candidate() {
    let e = engine();
    let now = Utc::now();
    let model = clt_model(&e, Uuid::new_v4(), now).await;
    let triagem = &model.stages[0];
    let entrevista = &model.stages[1];

    e.catalog
        .instantiate_automations(triagem.id, Some(entrevista.id), CategoryCode::Triagem)
        .await
        .unwrap();

    let assignment = enter_pipeline(&e, triagem.id, now).await;

    // score below the threshold: nothing moves.
    let records = e
        .transitions
        .fill_field(assignment.id, "score", serde_json::json!(79), 1, now)
        .await
        .unwrap();
    assert!(records.is_empty());
    let unchanged = e.repos.assignments.get(assignment.id).await.unwrap().unwrap();
    assert_eq!(unchanged.current_stage_id, triagem.id);

    // score at 85: the rule fires and moves the candidate, resetting
    // entered_at.
    let later = now + Duration::hours(6);
    let records = e
        .transitions
        .fill_field(assignment.id, "score", serde_json::json!(85), 2, later)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, ExecutionOutcome::Completed);

    let moved = e.repos.assignments.get(assignment.id).await.unwrap().unwrap();
    assert_eq!(moved.current_stage_id, entrevista.id);
    assert_eq!(moved.entered_at, later);
    assert_eq!(e.events.events_of_kind("stage.transition").len(), 1);
}

#[tokio::test]
async fn test_concurrent_transitions_are_serialized() {
    let e = engine();
    let now = Utc::now();
    let model = clt_model(&e, Uuid::new_v4(), now).await;
    let triagem = &model.stages[0];
    let entrevista = &model.stages[1];
    let gestor = &model.stages[2];

    let assignment = enter_pipeline(&e, triagem.id, now).await;
    // Triagem requires a score before leaving.
    e.transitions
        .fill_field(assignment.id, "score", serde_json::json!(70), 1, now)
        .await
        .unwrap();

    // Both recruiters read version 2, then act simultaneously.
    e.transitions
        .transition(assignment.id, entrevista.id, 2, now)
        .await
        .unwrap();

    let result = e
        .transitions
        .transition(assignment.id, gestor.id, 2, now)
        .await;
    assert!(matches!(
        result,
        Err(HireflowError::ConcurrentModification(_))
    ));

    // The loser changed nothing.
    let state = e.repos.assignments.get(assignment.id).await.unwrap().unwrap();
    assert_eq!(state.current_stage_id, entrevista.id);
}

#[tokio::test]
async fn test_required_fields_gate_transitions() {
    let e = engine();
    let now = Utc::now();
    let model = clt_model(&e, Uuid::new_v4(), now).await;
    let triagem = &model.stages[0];
    let entrevista = &model.stages[1];

    let assignment = enter_pipeline(&e, triagem.id, now).await;

    let result = e
        .transitions
        .transition(assignment.id, entrevista.id, 1, now)
        .await;
    assert!(matches!(result, Err(HireflowError::Validation(_))));
}

#[tokio::test(start_paused = true)]
async fn test_delayed_automation_cancelled_when_conditions_flip() {
    let e = engine();
    let now = Utc::now();
    let model = clt_model(&e, Uuid::new_v4(), now).await;
    let triagem = &model.stages[0];

    let rule = AutomationRule::new(triagem.id, "lembrete", AutomationTrigger::FieldUpdate)
        .with_condition(Condition::number("score", ConditionOperator::Gte, 80.0))
        .with_action(AutomationAction::Notify {
            target: "recrutador".to_string(),
            message: "Score alto aguardando ação".to_string(),
        })
        .with_delay_minutes(10);
    let rule_id = rule.id;
    e.repos.automations.insert_batch(vec![rule]).await.unwrap();

    let assignment = enter_pipeline(&e, triagem.id, now).await;
    e.transitions
        .fill_field(assignment.id, "score", serde_json::json!(85), 1, now)
        .await
        .unwrap();
    assert_eq!(e.rules.scheduler().scheduled_count(), 1);
    assert_eq!(e.events.events_of_kind("automation.scheduled").len(), 1);

    // The score drops below the threshold before the delay elapses; the
    // condition no longer matches at fire time (it also re-schedules
    // nothing, since 70 < 80).
    e.transitions
        .fill_field(assignment.id, "score", serde_json::json!(70), 2, now)
        .await
        .unwrap();

    e.rules.scheduler().wait_all().await;

    let executions = e.repos.executions.for_rule(rule_id).await.unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].outcome, ExecutionOutcome::Cancelled);
    assert!(e.dispatcher.notifications().is_empty());
}

#[tokio::test]
async fn test_transition_cancels_pending_schedules() {
    let e = engine();
    let now = Utc::now();
    let model = clt_model(&e, Uuid::new_v4(), now).await;
    let triagem = &model.stages[0];
    let entrevista = &model.stages[1];

    let rule = AutomationRule::new(triagem.id, "lembrete", AutomationTrigger::FieldUpdate)
        .with_condition(Condition::number("score", ConditionOperator::Gte, 80.0))
        .with_action(AutomationAction::Notify {
            target: "recrutador".to_string(),
            message: "Score alto aguardando ação".to_string(),
        })
        .with_delay_minutes(30);
    let rule_id = rule.id;
    e.repos.automations.insert_batch(vec![rule]).await.unwrap();

    let assignment = enter_pipeline(&e, triagem.id, now).await;
    e.transitions
        .fill_field(assignment.id, "score", serde_json::json!(90), 1, now)
        .await
        .unwrap();
    assert_eq!(e.rules.scheduler().scheduled_count(), 1);

    e.transitions
        .transition(assignment.id, entrevista.id, 2, now)
        .await
        .unwrap();

    assert_eq!(e.rules.scheduler().scheduled_count(), 0);
    let executions = e.repos.executions.for_rule(rule_id).await.unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].outcome, ExecutionOutcome::Cancelled);
    assert_eq!(e.events.events_of_kind("automation.cancelled").len(), 1);
}

#[tokio::test]
async fn test_notify_retries_exhaust_into_recorded_failure() {
    let e = engine();
    let now = Utc::now();
    let model = clt_model(&e, Uuid::new_v4(), now).await;
    let triagem = &model.stages[0];

    let rule = AutomationRule::new(triagem.id, "aviso", AutomationTrigger::FieldUpdate)
        .with_condition(Condition::number("score", ConditionOperator::Gte, 80.0))
        .with_action(AutomationAction::Notify {
            target: "recrutador".to_string(),
            message: "Candidato aprovado na triagem".to_string(),
        })
        .with_max_attempts(2);
    let rule_id = rule.id;
    e.repos.automations.insert_batch(vec![rule]).await.unwrap();

    let assignment = enter_pipeline(&e, triagem.id, now).await;
    e.dispatcher.fail_next(5);
    let records = e
        .transitions
        .fill_field(assignment.id, "score", serde_json::json!(95), 1, now)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, ExecutionOutcome::Failed);
    assert_eq!(records[0].attempts, 2);

    let failed = e.repos.executions.failed().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].rule_id, rule_id);
    assert!(failed[0]
        .error
        .as_deref()
        .unwrap()
        .contains("permanently failed after 2 attempts"));
}

#[tokio::test]
async fn test_rejection_flow_with_catalogued_reason() {
    let e = engine();
    let now = Utc::now();
    let company = Uuid::new_v4();
    let model = clt_model(&e, company, now).await;
    let triagem = &model.stages[0];
    assert!(triagem.can_reject);

    let reasons = e.catalog.instantiate_rejection_reasons(company).await.unwrap();
    let fit_cultural = reasons
        .iter()
        .find(|r| r.name == "Fit cultural inadequado")
        .unwrap();
    assert!(fit_cultural.required);

    let assignment = enter_pipeline(&e, triagem.id, now).await;

    // A note-required reason without a note is a validation error.
    let result = e
        .transitions
        .reject(assignment.id, fit_cultural.id, None, 1, now)
        .await;
    assert!(matches!(result, Err(HireflowError::Validation(_))));

    let rejected = e
        .transitions
        .reject(
            assignment.id,
            fit_cultural.id,
            Some("Conflito com os valores do time"),
            1,
            now,
        )
        .await
        .unwrap();
    assert!(!rejected.active);
    assert_eq!(
        rejected.fields_filled.get("motivo_reprovacao").unwrap(),
        &serde_json::json!("Fit cultural inadequado")
    );
    assert_eq!(e.events.events_of_kind("stage.candidate_rejected").len(), 1);

    // Inactive assignments fall out of SLA evaluation entirely.
    let summary = e.evaluator.run_pass(now + Duration::hours(100)).await.unwrap();
    assert_eq!(summary.evaluated, 0);
}

#[tokio::test]
async fn test_transition_resolves_open_alerts() {
    let e = engine();
    let entered = Utc::now();
    let model = clt_model(&e, Uuid::new_v4(), entered).await;
    let triagem = &model.stages[0];
    let entrevista = &model.stages[1];

    e.catalog
        .instantiate_slas(triagem.id, CategoryCode::Triagem)
        .await
        .unwrap();

    let assignment = enter_pipeline(&e, triagem.id, entered).await;
    let late = entered + Duration::hours(47);
    e.evaluator.run_pass(late).await.unwrap();
    assert_eq!(
        e.repos
            .alerts
            .open_for_assignment(assignment.id)
            .await
            .unwrap()
            .len(),
        1
    );

    e.transitions
        .fill_field(assignment.id, "score", serde_json::json!(75), 1, late)
        .await
        .unwrap();
    e.transitions
        .transition(assignment.id, entrevista.id, 2, late)
        .await
        .unwrap();

    let open = e
        .repos
        .alerts
        .open_for_assignment(assignment.id)
        .await
        .unwrap();
    assert!(open.is_empty());

    let resolved = e.events.events_of_kind("sla.alert_resolved");
    assert_eq!(resolved.len(), 1);
}

#[tokio::test]
async fn test_alert_status_progresses_through_dispatch() {
    let e = engine();
    let entered = Utc::now();
    let model = clt_model(&e, Uuid::new_v4(), entered).await;
    let triagem = &model.stages[0];
    let slas = e
        .catalog
        .instantiate_slas(triagem.id, CategoryCode::Triagem)
        .await
        .unwrap();
    let assignment = enter_pipeline(&e, triagem.id, entered).await;

    e.evaluator
        .run_pass(entered + Duration::hours(47))
        .await
        .unwrap();

    let alert = e
        .repos
        .alerts
        .open_for(slas[0].id, assignment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alert.status, AlertStatus::Sent);
    assert_eq!(e.dispatcher.alert_count(), 1);
}
