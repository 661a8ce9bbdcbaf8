//! Pipeline models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::StageInstance;

/// A company-specific ordered set of stages.
///
/// A company may own several models; at most one is marked default at any
/// time. Stages are owned exclusively by one model and kept as a dense
/// 1..N order sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineModel {
    /// Unique model id.
    pub id: Uuid,
    /// The owning company.
    pub company_id: Uuid,
    /// Model name.
    pub name: String,
    /// Whether this is the company default.
    pub is_default: bool,
    /// Whether the model is active.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl PipelineModel {
    /// Creates a new active, non-default model.
    #[must_use]
    pub fn new(company_id: Uuid, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            name: name.into(),
            is_default: false,
            active: true,
            created_at: now,
        }
    }

    /// Marks the model as the company default.
    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// A model together with its freshly created stages.
///
/// Returned by catalog instantiation so callers get the full result of the
/// atomic batch insert.
#[derive(Debug, Clone)]
pub struct InstantiatedModel {
    /// The created model.
    pub model: PipelineModel,
    /// The created stages, in order.
    pub stages: Vec<StageInstance>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_model_is_not_default() {
        let model = PipelineModel::new(Uuid::new_v4(), "Pipeline Padrão", Utc::now());
        assert!(!model.is_default);
        assert!(model.active);
    }

    #[test]
    fn test_as_default() {
        let model = PipelineModel::new(Uuid::new_v4(), "Pipeline Padrão", Utc::now()).as_default();
        assert!(model.is_default);
    }
}
