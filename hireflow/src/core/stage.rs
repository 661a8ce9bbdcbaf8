//! Stage templates and stage instances.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::HireflowError;

/// The position a stage occupies in the hiring flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// The entry stage of a pipeline (e.g., resume screening).
    Initial,
    /// A stage between entry and decision (e.g., interviews, tests).
    Intermediate,
    /// A stage where an approve/reject decision is made.
    Decision,
    /// A terminal stage (e.g., admission).
    Final,
    /// A stage that runs after the contract is signed (e.g., probation).
    PostContract,
}

impl Default for StageKind {
    fn default() -> Self {
        Self::Intermediate
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Decision => write!(f, "decision"),
            Self::Final => write!(f, "final"),
            Self::PostContract => write!(f, "post_contract"),
        }
    }
}

/// Contract type a pipeline model is instantiated for.
///
/// Stage templates declare which contract types they apply to; the catalog
/// filters on this when a model is created. `Pj` covers both freelancer and
/// PJ contractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    /// Standard CLT employment.
    Clt,
    /// Internship.
    Estagio,
    /// Contractor / freelancer.
    Pj,
}

impl ContractType {
    /// Display label for UI surfaces.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clt => "CLT",
            Self::Estagio => "Estágio",
            Self::Pj => "PJ / Freelancer",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clt => write!(f, "clt"),
            Self::Estagio => write!(f, "estagio"),
            Self::Pj => write!(f, "pj"),
        }
    }
}

impl FromStr for ContractType {
    type Err = HireflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clt" => Ok(Self::Clt),
            "estagio" | "estágio" => Ok(Self::Estagio),
            "pj" | "freelancer" => Ok(Self::Pj),
            other => Err(HireflowError::UnknownCategory(other.to_string())),
        }
    }
}

/// An immutable catalog entry describing a default stage.
///
/// Templates are never mutated; instantiating a pipeline model copies the
/// matching templates into owned [`StageInstance`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTemplate {
    /// Stage name as shown to recruiters.
    pub name: String,
    /// Longer description.
    pub description: String,
    /// Position in the hiring flow.
    pub kind: StageKind,
    /// Display color (hex).
    pub color: String,
    /// Whether the stage cannot be skipped.
    pub required: bool,
    /// Whether a candidate can be rejected at this stage.
    pub can_reject: bool,
    /// Default SLA in days, if the stage carries one.
    pub sla_days: Option<u32>,
    /// Names of default automation hooks attached on instantiation.
    pub auto_actions: Vec<String>,
    /// Fields that must be filled before leaving the stage.
    pub required_fields: Vec<String>,
    /// Roles responsible for acting on the stage.
    pub responsible_roles: Vec<String>,
    /// Contract types the stage applies to.
    pub contract_types: Vec<ContractType>,
}

impl StageTemplate {
    /// Creates a template applying to every contract type.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StageKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            color: "#6b7280".to_string(),
            required: true,
            can_reject: false,
            sla_days: None,
            auto_actions: Vec::new(),
            required_fields: Vec::new(),
            responsible_roles: Vec::new(),
            contract_types: vec![ContractType::Clt, ContractType::Estagio, ContractType::Pj],
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the display color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Marks the stage as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Allows rejecting candidates at this stage.
    #[must_use]
    pub fn rejectable(mut self) -> Self {
        self.can_reject = true;
        self
    }

    /// Sets the default SLA in days.
    #[must_use]
    pub fn with_sla_days(mut self, days: u32) -> Self {
        self.sla_days = Some(days);
        self
    }

    /// Sets the fields required before leaving the stage.
    #[must_use]
    pub fn with_required_fields(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the responsible roles.
    #[must_use]
    pub fn with_responsible_roles(
        mut self,
        roles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.responsible_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the default automation hook names.
    #[must_use]
    pub fn with_auto_actions(
        mut self,
        actions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.auto_actions = actions.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts the template to the given contract types.
    #[must_use]
    pub fn only_for(mut self, types: impl IntoIterator<Item = ContractType>) -> Self {
        self.contract_types = types.into_iter().collect();
        self
    }

    /// Whether the template applies to a contract type.
    #[must_use]
    pub fn applies_to(&self, contract_type: ContractType) -> bool {
        self.contract_types.contains(&contract_type)
    }
}

/// A stage owned by one pipeline model, copied from a template.
///
/// `order` is a dense 1..N sequence within the owning model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageInstance {
    /// Unique stage id.
    pub id: Uuid,
    /// The owning pipeline model.
    pub model_id: Uuid,
    /// 1-indexed position within the model.
    pub order: u32,
    /// Stage name.
    pub name: String,
    /// Stage description.
    pub description: String,
    /// Position in the hiring flow.
    pub kind: StageKind,
    /// Display color.
    pub color: String,
    /// Whether the stage cannot be skipped.
    pub required: bool,
    /// Whether candidates can be rejected here.
    pub can_reject: bool,
    /// Default SLA in days.
    pub sla_days: Option<u32>,
    /// Fields that must be filled before leaving the stage.
    pub required_fields: Vec<String>,
    /// Roles responsible for the stage.
    pub responsible_roles: Vec<String>,
}

impl StageInstance {
    /// Copies a template into a stage owned by `model_id` at `order`.
    #[must_use]
    pub fn from_template(model_id: Uuid, order: u32, template: &StageTemplate) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_id,
            order,
            name: template.name.clone(),
            description: template.description.clone(),
            kind: template.kind,
            color: template.color.clone(),
            required: template.required,
            can_reject: template.can_reject,
            sla_days: template.sla_days,
            required_fields: template.required_fields.clone(),
            responsible_roles: template.responsible_roles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::Initial.to_string(), "initial");
        assert_eq!(StageKind::PostContract.to_string(), "post_contract");
    }

    #[test]
    fn test_contract_type_parse() {
        assert_eq!("clt".parse::<ContractType>().unwrap(), ContractType::Clt);
        assert_eq!("PJ".parse::<ContractType>().unwrap(), ContractType::Pj);
        assert_eq!(
            "freelancer".parse::<ContractType>().unwrap(),
            ContractType::Pj
        );
        assert!("temporario".parse::<ContractType>().is_err());
    }

    #[test]
    fn test_template_builder() {
        let tpl = StageTemplate::new("Entrevista com RH", StageKind::Intermediate)
            .with_sla_days(3)
            .rejectable()
            .with_required_fields(["resultado_entrevista"])
            .only_for([ContractType::Clt, ContractType::Estagio]);

        assert_eq!(tpl.sla_days, Some(3));
        assert!(tpl.can_reject);
        assert!(tpl.applies_to(ContractType::Clt));
        assert!(!tpl.applies_to(ContractType::Pj));
    }

    #[test]
    fn test_instance_copies_template() {
        let tpl = StageTemplate::new("Triagem de Currículos", StageKind::Initial)
            .with_color("#3b82f6")
            .with_sla_days(2);
        let model_id = Uuid::new_v4();
        let instance = StageInstance::from_template(model_id, 1, &tpl);

        assert_eq!(instance.model_id, model_id);
        assert_eq!(instance.order, 1);
        assert_eq!(instance.name, "Triagem de Currículos");
        assert_eq!(instance.sla_days, Some(2));
    }
}
