//! Template catalogs and pipeline model instantiation.
//!
//! Catalogs are plain data tables loaded at startup, keyed by a closed set
//! of category codes. Free-text labels are display-only; lookups never
//! match on them, so a typo in a label cannot silently change behavior.

mod defaults;
mod instantiate;

pub use defaults::{
    automation_templates, checklist_templates, checklist_templates_by_code,
    rejection_reason_templates, sla_templates, stage_templates,
};
pub use instantiate::CatalogService;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::{
    AutomationTrigger, Condition, Deadline, RejectionCategory, WebhookConfig,
};
use crate::errors::HireflowError;

/// Stable category code for checklist, SLA and automation catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryCode {
    /// Resume screening.
    Triagem,
    /// Candidate interviews.
    Entrevista,
    /// Document collection.
    Documentacao,
    /// Medical exams.
    Exames,
    /// Onboarding.
    Integracao,
}

impl CategoryCode {
    /// Every category code.
    pub const ALL: [Self; 5] = [
        Self::Triagem,
        Self::Entrevista,
        Self::Documentacao,
        Self::Exames,
        Self::Integracao,
    ];

    /// Display label for UI surfaces.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Triagem => "Triagem",
            Self::Entrevista => "Entrevista com o Candidato",
            Self::Documentacao => "Documentação",
            Self::Exames => "Exames Médicos",
            Self::Integracao => "Integração",
        }
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triagem => write!(f, "triagem"),
            Self::Entrevista => write!(f, "entrevista"),
            Self::Documentacao => write!(f, "documentacao"),
            Self::Exames => write!(f, "exames"),
            Self::Integracao => write!(f, "integracao"),
        }
    }
}

impl FromStr for CategoryCode {
    type Err = HireflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "triagem" => Ok(Self::Triagem),
            "entrevista" => Ok(Self::Entrevista),
            "documentacao" | "documentação" => Ok(Self::Documentacao),
            "exames" => Ok(Self::Exames),
            "integracao" | "integração" => Ok(Self::Integracao),
            other => Err(HireflowError::UnknownCategory(other.to_string())),
        }
    }
}

/// A catalog entry for one checklist item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistTemplate {
    /// Item text.
    pub label: String,
    /// Whether the item must be checked before leaving the stage.
    pub required: bool,
}

impl ChecklistTemplate {
    /// Creates a required checklist template.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            required: true,
        }
    }

    /// Marks the item as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A checklist item persisted for a stage, copied from a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Unique id.
    pub id: Uuid,
    /// The stage the item belongs to.
    pub stage_id: Uuid,
    /// Item text.
    pub label: String,
    /// Whether the item must be checked.
    pub required: bool,
    /// 1-indexed position matching catalog order.
    pub order: u32,
}

impl ChecklistItem {
    /// Copies a template into an item for `stage_id` at `order`.
    #[must_use]
    pub fn from_template(stage_id: Uuid, order: u32, template: &ChecklistTemplate) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage_id,
            label: template.label.clone(),
            required: template.required,
            order,
        }
    }
}

/// A catalog entry for one rejection reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionReasonTemplate {
    /// Reason text.
    pub name: String,
    /// Grouping.
    pub category: RejectionCategory,
    /// Whether a note is required when this reason is used.
    pub required: bool,
}

/// A catalog entry for one SLA definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaTemplate {
    /// SLA name.
    pub name: String,
    /// The deadline.
    pub deadline: Deadline,
    /// Pre-deadline alert window in hours.
    pub alert_before_hours: i64,
    /// Post-breach escalation threshold in hours.
    pub alert_after_hours: i64,
    /// Targets notified on any alert.
    pub notification_targets: Vec<String>,
    /// Additional targets once escalated.
    pub escalation_targets: Vec<String>,
}

/// Action descriptor used by automation templates.
///
/// Templates cannot reference concrete stage ids, so stage movement is
/// expressed as [`TemplateAction::AdvanceStage`] and resolved against the
/// model's stage order at instantiation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateAction {
    /// Move the candidate to the next stage in the model.
    AdvanceStage,
    /// Notify a target.
    Notify {
        /// Role name or channel id.
        target: String,
        /// Message body.
        message: String,
    },
    /// Call an outbound webhook.
    Webhook {
        /// The webhook configuration.
        config: WebhookConfig,
    },
}

/// A catalog entry for one automation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationTemplate {
    /// Rule name.
    pub name: String,
    /// Triggering event.
    pub trigger: AutomationTrigger,
    /// Conditions, all of which must match.
    pub conditions: Vec<Condition>,
    /// The action to take.
    pub action: TemplateAction,
    /// Execution delay in minutes.
    pub delay_minutes: u64,
    /// Retry budget for remote actions.
    pub max_attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_code_parse() {
        assert_eq!("triagem".parse::<CategoryCode>().unwrap(), CategoryCode::Triagem);
        assert_eq!(
            "Documentação".parse::<CategoryCode>().unwrap(),
            CategoryCode::Documentacao
        );
        assert!(matches!(
            "onboarding".parse::<CategoryCode>(),
            Err(HireflowError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_label_is_display_only() {
        // Parsing a label must not work; only stable codes resolve.
        assert!("Entrevista com o Candidato".parse::<CategoryCode>().is_err());
        assert_eq!(CategoryCode::Entrevista.label(), "Entrevista com o Candidato");
    }

    #[test]
    fn test_checklist_item_copies_template() {
        let template = ChecklistTemplate::new("Conferir RG e CPF").optional();
        let stage_id = Uuid::new_v4();
        let item = ChecklistItem::from_template(stage_id, 3, &template);

        assert_eq!(item.stage_id, stage_id);
        assert_eq!(item.order, 3);
        assert!(!item.required);
    }
}
