use std::sync::Arc;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use super::{classify, urgency_for, SlaEvaluator, SlaState};
use crate::core::{
    AlertClassification, AlertStatus, CandidateStageAssignment, Deadline, SlaDefinition, Urgency,
};
use crate::events::CollectingEventSink;
use crate::repository::Repositories;
use crate::testing::RecordingDispatcher;

fn sla_48h(stage_id: Uuid) -> SlaDefinition {
    SlaDefinition::new(stage_id, "Prazo da etapa", Deadline::hours(48))
        .with_alert_before_hours(4)
        .with_alert_after_hours(24)
        .with_notification_targets(["recrutador"])
        .with_escalation_targets(["gestor_rh"])
}

fn assignment_in(stage_id: Uuid, hours_ago: i64) -> CandidateStageAssignment {
    CandidateStageAssignment::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        stage_id,
        Utc::now() - Duration::hours(hours_ago),
    )
}

struct Harness {
    repos: Repositories,
    events: Arc<CollectingEventSink>,
    dispatcher: Arc<RecordingDispatcher>,
    evaluator: SlaEvaluator,
}

fn harness() -> Harness {
    let repos = Repositories::in_memory();
    let events = Arc::new(CollectingEventSink::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let evaluator = SlaEvaluator::new(repos.clone(), events.clone(), dispatcher.clone());
    Harness {
        repos,
        events,
        dispatcher,
        evaluator,
    }
}

#[test]
fn test_classify_windows() {
    let stage_id = Uuid::new_v4();
    let sla = sla_48h(stage_id);

    let fresh = assignment_in(stage_id, 10);
    let approaching = assignment_in(stage_id, 47);
    let breached = assignment_in(stage_id, 50);
    let escalated = assignment_in(stage_id, 80);
    let now = Utc::now();

    assert_eq!(classify(&sla, &fresh, now), SlaState::Satisfied);

    assert_eq!(
        classify(&sla, &approaching, now),
        SlaState::Approaching { remaining_hours: 1 }
    );

    assert_eq!(
        classify(&sla, &breached, now),
        SlaState::Breached { overdue_hours: 2 }
    );

    assert_eq!(
        classify(&sla, &escalated, now),
        SlaState::Escalated { overdue_hours: 32 }
    );
}

#[test]
fn test_urgency_scales_with_proximity() {
    let sla = sla_48h(Uuid::new_v4());

    assert_eq!(
        urgency_for(SlaState::Approaching { remaining_hours: 4 }, &sla),
        Urgency::Low
    );
    assert_eq!(
        urgency_for(SlaState::Approaching { remaining_hours: 2 }, &sla),
        Urgency::Medium
    );
    assert_eq!(
        urgency_for(SlaState::Approaching { remaining_hours: 1 }, &sla),
        Urgency::High
    );
    assert_eq!(
        urgency_for(SlaState::Breached { overdue_hours: 2 }, &sla),
        Urgency::High
    );
    assert_eq!(
        urgency_for(SlaState::Breached { overdue_hours: 30 }, &sla),
        Urgency::Critical
    );
}

#[tokio::test]
async fn test_approaching_alert_created_and_dispatched() {
    let h = harness();
    let stage_id = Uuid::new_v4();
    let sla = sla_48h(stage_id);
    let assignment = assignment_in(stage_id, 47);
    h.repos.slas.insert_batch(vec![sla.clone()]).await.unwrap();
    h.repos.assignments.insert(assignment.clone()).await.unwrap();

    let summary = h.evaluator.run_pass(Utc::now()).await.unwrap();

    assert_eq!(summary.alerts_created, 1);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(h.events.events_of_kind("sla.alert_created").len(), 1);

    let open = h
        .repos
        .alerts
        .open_for(sla.id, assignment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(open.classification, AlertClassification::Approaching);
    assert_eq!(open.status, AlertStatus::Sent);
    assert_eq!(h.dispatcher.alert_count(), 1);
}

#[tokio::test]
async fn test_run_pass_is_idempotent() {
    let h = harness();
    let stage_id = Uuid::new_v4();
    let sla = sla_48h(stage_id);
    let assignment = assignment_in(stage_id, 47);
    h.repos.slas.insert_batch(vec![sla]).await.unwrap();
    h.repos.assignments.insert(assignment).await.unwrap();

    let now = Utc::now();
    let first = h.evaluator.run_pass(now).await.unwrap();
    let second = h.evaluator.run_pass(now).await.unwrap();

    assert_eq!(first.alerts_created, 1);
    assert_eq!(second.alerts_created, 0);
    assert_eq!(second.alerts_updated, 1);
    assert_eq!(h.events.events_of_kind("sla.alert_created").len(), 1);
}

#[tokio::test]
async fn test_breach_reclassifies_existing_alert() {
    let h = harness();
    let stage_id = Uuid::new_v4();
    let sla = sla_48h(stage_id);
    let entered = Utc::now();
    let assignment =
        CandidateStageAssignment::new(Uuid::new_v4(), Uuid::new_v4(), stage_id, entered);
    h.repos.slas.insert_batch(vec![sla.clone()]).await.unwrap();
    h.repos.assignments.insert(assignment.clone()).await.unwrap();

    // 47h elapsed: pre-deadline alert.
    h.evaluator
        .run_pass(entered + chrono::Duration::hours(47))
        .await
        .unwrap();
    let alert = h
        .repos
        .alerts
        .open_for(sla.id, assignment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alert.classification, AlertClassification::Approaching);

    // 50h elapsed: the same alert transitions to breached.
    h.evaluator
        .run_pass(entered + chrono::Duration::hours(50))
        .await
        .unwrap();
    let reclassified = h
        .repos
        .alerts
        .open_for(sla.id, assignment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reclassified.id, alert.id);
    assert_eq!(reclassified.classification, AlertClassification::Breached);
    assert_eq!(h.events.events_of_kind("sla.alert_created").len(), 1);
}

#[tokio::test]
async fn test_escalation_adds_manager_targets() {
    let h = harness();
    let stage_id = Uuid::new_v4();
    let sla = sla_48h(stage_id);
    let assignment = assignment_in(stage_id, 80);
    h.repos.slas.insert_batch(vec![sla]).await.unwrap();
    h.repos.assignments.insert(assignment).await.unwrap();

    h.evaluator.run_pass(Utc::now()).await.unwrap();

    let dispatched = h.dispatcher.dispatched_alerts();
    assert_eq!(dispatched.len(), 1);
    let (_, targets) = &dispatched[0];
    assert!(targets.contains(&"recrutador".to_string()));
    assert!(targets.contains(&"gestor_rh".to_string()));
}

#[tokio::test]
async fn test_satisfied_sla_resolves_open_alert() {
    let h = harness();
    let stage_id = Uuid::new_v4();
    let sla = sla_48h(stage_id);
    let entered = Utc::now();
    let assignment =
        CandidateStageAssignment::new(Uuid::new_v4(), Uuid::new_v4(), stage_id, entered);
    h.repos.slas.insert_batch(vec![sla.clone()]).await.unwrap();
    h.repos.assignments.insert(assignment.clone()).await.unwrap();

    h.evaluator
        .run_pass(entered + chrono::Duration::hours(47))
        .await
        .unwrap();
    assert!(h
        .repos
        .alerts
        .open_for(sla.id, assignment.id)
        .await
        .unwrap()
        .is_some());

    // The recruiter acted: candidate re-entered the window (e.g. SLA was
    // extended); a pass early in the window resolves the alert.
    let summary = h
        .evaluator
        .run_pass(entered + chrono::Duration::hours(10))
        .await
        .unwrap();
    assert_eq!(summary.alerts_resolved, 1);
    assert!(h
        .repos
        .alerts
        .open_for(sla.id, assignment.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_malformed_assignment_skipped_not_fatal() {
    let h = harness();
    let stage_id = Uuid::new_v4();
    let sla = sla_48h(stage_id);
    let future = CandidateStageAssignment::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        stage_id,
        Utc::now() + chrono::Duration::hours(5),
    );
    let normal = assignment_in(stage_id, 47);
    h.repos.slas.insert_batch(vec![sla]).await.unwrap();
    h.repos.assignments.insert(future).await.unwrap();
    h.repos.assignments.insert(normal).await.unwrap();

    let summary = h.evaluator.run_pass(Utc::now()).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.alerts_created, 1);
}

#[tokio::test]
async fn test_dispatch_failure_leaves_alert_pending() {
    let h = harness();
    let stage_id = Uuid::new_v4();
    let sla = sla_48h(stage_id);
    let assignment = assignment_in(stage_id, 50);
    h.repos.slas.insert_batch(vec![sla.clone()]).await.unwrap();
    h.repos.assignments.insert(assignment.clone()).await.unwrap();

    h.dispatcher.fail_next(1);
    let summary = h.evaluator.run_pass(Utc::now()).await.unwrap();
    assert_eq!(summary.dispatched, 0);

    let alert = h
        .repos
        .alerts
        .open_for(sla.id, assignment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alert.status, AlertStatus::Pending);

    // Next pass delivers.
    let summary = h.evaluator.run_pass(Utc::now()).await.unwrap();
    assert_eq!(summary.dispatched, 1);
}
