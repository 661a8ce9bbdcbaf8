//! Rejection reason catalog entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Grouping for rejection reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCategory {
    /// Technical fit.
    Tecnico,
    /// Behavioral fit.
    Comportamental,
    /// Documentation problems.
    Documentacao,
    /// Candidate withdrew.
    Desistencia,
    /// Anything else.
    Outros,
}

impl fmt::Display for RejectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tecnico => write!(f, "tecnico"),
            Self::Comportamental => write!(f, "comportamental"),
            Self::Documentacao => write!(f, "documentacao"),
            Self::Desistencia => write!(f, "desistencia"),
            Self::Outros => write!(f, "outros"),
        }
    }
}

/// A catalogued cause for rejecting a candidate at a stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionReason {
    /// Unique id.
    pub id: Uuid,
    /// The owning company.
    pub company_id: Uuid,
    /// Reason text.
    pub name: String,
    /// Grouping.
    pub category: RejectionCategory,
    /// Whether a note is required when this reason is used.
    pub required: bool,
    /// Display order within the company catalog.
    pub order: u32,
}

impl RejectionReason {
    /// Creates a reason for a company at the given order.
    #[must_use]
    pub fn new(
        company_id: Uuid,
        name: impl Into<String>,
        category: RejectionCategory,
        order: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            name: name.into(),
            category,
            required: false,
            order,
        }
    }

    /// Requires a note when the reason is used.
    #[must_use]
    pub fn note_required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display() {
        assert_eq!(RejectionCategory::Tecnico.to_string(), "tecnico");
        assert_eq!(RejectionCategory::Desistencia.to_string(), "desistencia");
    }

    #[test]
    fn test_reason_builder() {
        let reason = RejectionReason::new(
            Uuid::new_v4(),
            "Perfil técnico insuficiente",
            RejectionCategory::Tecnico,
            1,
        )
        .note_required();

        assert!(reason.required);
        assert_eq!(reason.order, 1);
    }
}
