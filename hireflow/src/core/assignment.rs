//! Candidate stage assignments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::automation::{FactSet, FactValue};

/// Tracks a candidate's current stage within a job pipeline.
///
/// A candidate has exactly one active assignment per job. Every mutation
/// bumps `version`; writers pass the version they read so concurrent
/// transitions are detected instead of silently overwriting each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateStageAssignment {
    /// Unique assignment id.
    pub id: Uuid,
    /// The candidate.
    pub candidate_id: Uuid,
    /// The job opening.
    pub job_id: Uuid,
    /// The stage the candidate currently sits in.
    pub current_stage_id: Uuid,
    /// When the candidate entered the current stage. SLA deadlines are
    /// always relative to this instant.
    pub entered_at: DateTime<Utc>,
    /// Field values filled while in the pipeline (score, interview result,
    /// checklist completion and so on).
    pub fields_filled: HashMap<String, serde_json::Value>,
    /// Optimistic concurrency token.
    pub version: u64,
    /// Whether the assignment is still live (false after rejection or
    /// removal from the pipeline).
    pub active: bool,
}

impl CandidateStageAssignment {
    /// Creates an assignment entering `stage_id` at `now`.
    #[must_use]
    pub fn new(candidate_id: Uuid, job_id: Uuid, stage_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            job_id,
            current_stage_id: stage_id,
            entered_at: now,
            fields_filled: HashMap::new(),
            version: 1,
            active: true,
        }
    }

    /// Moves the assignment into a new stage, resetting `entered_at`.
    pub fn enter_stage(&mut self, stage_id: Uuid, now: DateTime<Utc>) {
        self.current_stage_id = stage_id;
        self.entered_at = now;
        self.version += 1;
    }

    /// Records a field value.
    pub fn fill_field(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.fields_filled.insert(name.into(), value);
        self.version += 1;
    }

    /// Deactivates the assignment (rejection or pipeline removal).
    pub fn deactivate(&mut self) {
        self.active = false;
        self.version += 1;
    }

    /// Whole hours spent in the current stage as of `now`.
    ///
    /// Negative when `entered_at` lies in the future (malformed record);
    /// evaluation passes skip those.
    #[must_use]
    pub fn hours_in_stage(&self, now: DateTime<Utc>) -> i64 {
        (now - self.entered_at).num_hours()
    }

    /// Snapshots the assignment's fields into a fact set for rule matching.
    ///
    /// Adds the derived `dias_na_etapa` fact. Field values that are neither
    /// numbers, strings nor booleans are dropped from the snapshot.
    #[must_use]
    pub fn facts(&self, now: DateTime<Utc>) -> FactSet {
        let mut facts = FactSet::new();
        for (name, value) in &self.fields_filled {
            let fact = match value {
                serde_json::Value::Number(n) => n.as_f64().map(FactValue::Number),
                serde_json::Value::String(s) => Some(FactValue::Text(s.clone())),
                serde_json::Value::Bool(b) => Some(FactValue::Bool(*b)),
                _ => None,
            };
            if let Some(fact) = fact {
                facts.insert(name.clone(), fact);
            }
        }
        #[allow(clippy::cast_precision_loss)]
        facts.insert(
            "dias_na_etapa",
            FactValue::Number((self.hours_in_stage(now) / 24) as f64),
        );
        facts
    }
}
