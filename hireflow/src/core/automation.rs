//! Automation rules: conditions, actions and execution records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::errors::ValidationError;

/// Comparison operator used in rule conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionOperator {
    /// Equal.
    #[serde(rename = "==")]
    Eq,
    /// Greater than or equal.
    #[serde(rename = ">=")]
    Gte,
    /// Less than or equal.
    #[serde(rename = "<=")]
    Lte,
    /// Strictly greater than.
    #[serde(rename = ">")]
    Gt,
    /// Strictly less than.
    #[serde(rename = "<")]
    Lt,
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "=="),
            Self::Gte => write!(f, ">="),
            Self::Lte => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Lt => write!(f, "<"),
        }
    }
}

/// Declared type of a condition's comparison value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Numeric comparison.
    Number,
    /// String comparison (orderings are lexicographic).
    Text,
    /// Boolean comparison (equality only).
    Boolean,
}

/// A typed fact about an assignment, used for condition matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    /// A numeric fact.
    Number(f64),
    /// A textual fact.
    Text(String),
    /// A boolean fact.
    Bool(bool),
}

impl FactValue {
    /// Coerces to a number where meaningful.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    /// Coerces to text.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
        }
    }

    /// Coerces to a boolean where meaningful.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "sim" => Some(true),
                "false" | "nao" | "não" => Some(false),
                _ => None,
            },
            Self::Number(_) => None,
        }
    }
}

/// A named set of facts snapshotted from an assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactSet(HashMap<String, FactValue>);

impl FactSet {
    /// Creates an empty fact set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fact.
    pub fn insert(&mut self, name: impl Into<String>, value: FactValue) {
        self.0.insert(name.into(), value);
    }

    /// Adds a fact, builder-style.
    #[must_use]
    pub fn with_fact(mut self, name: impl Into<String>, value: FactValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Looks up a fact by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FactValue> {
        self.0.get(name)
    }

    /// Number of facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, FactValue>> for FactSet {
    fn from(map: HashMap<String, FactValue>) -> Self {
        Self(map)
    }
}

/// A single condition of an automation rule.
///
/// The comparison value is stored as JSON and coerced according to
/// `value_type` at match time. A missing fact never matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// Name of the fact to compare (e.g. `score`, `dias_na_etapa`).
    pub field: String,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Comparison value.
    pub value: serde_json::Value,
    /// Declared type of the comparison.
    pub value_type: ValueType,
}

impl Condition {
    /// Creates a numeric condition.
    #[must_use]
    pub fn number(field: impl Into<String>, operator: ConditionOperator, value: f64) -> Self {
        Self {
            field: field.into(),
            operator,
            value: serde_json::json!(value),
            value_type: ValueType::Number,
        }
    }

    /// Creates a text condition.
    #[must_use]
    pub fn text(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<String>,
    ) -> Self {
        let value: String = value.into();
        Self {
            field: field.into(),
            operator,
            value: serde_json::json!(value),
            value_type: ValueType::Text,
        }
    }

    /// Creates a boolean equality condition.
    #[must_use]
    pub fn boolean(field: impl Into<String>, value: bool) -> Self {
        Self {
            field: field.into(),
            operator: ConditionOperator::Eq,
            value: serde_json::json!(value),
            value_type: ValueType::Boolean,
        }
    }

    /// Validates operator/type compatibility and value coercibility.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the comparison value cannot be
    /// coerced to the declared type, or when a boolean condition uses an
    /// ordering operator.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.value_type {
            ValueType::Number => {
                if self.expected_number().is_none() {
                    return Err(ValidationError::new(format!(
                        "condition on '{}' declares a number but value is not numeric",
                        self.field
                    ))
                    .with_field(self.field.clone()));
                }
            }
            ValueType::Boolean => {
                if self.operator != ConditionOperator::Eq {
                    return Err(ValidationError::new(format!(
                        "boolean condition on '{}' only supports '=='",
                        self.field
                    ))
                    .with_field(self.field.clone()));
                }
                if self.expected_bool().is_none() {
                    return Err(ValidationError::new(format!(
                        "condition on '{}' declares a boolean but value is not boolean",
                        self.field
                    ))
                    .with_field(self.field.clone()));
                }
            }
            ValueType::Text => {
                if self.value.as_str().is_none() {
                    return Err(ValidationError::new(format!(
                        "condition on '{}' declares text but value is not a string",
                        self.field
                    ))
                    .with_field(self.field.clone()));
                }
            }
        }
        Ok(())
    }

    /// Evaluates the condition against a fact set.
    #[must_use]
    pub fn matches(&self, facts: &FactSet) -> bool {
        let Some(fact) = facts.get(&self.field) else {
            return false;
        };

        match self.value_type {
            ValueType::Number => {
                let (Some(actual), Some(expected)) = (fact.as_number(), self.expected_number())
                else {
                    return false;
                };
                compare_f64(actual, expected, self.operator)
            }
            ValueType::Text => {
                let Some(expected) = self.value.as_str() else {
                    return false;
                };
                compare_str(&fact.as_text(), expected, self.operator)
            }
            ValueType::Boolean => {
                let (Some(actual), Some(expected)) = (fact.as_bool(), self.expected_bool()) else {
                    return false;
                };
                self.operator == ConditionOperator::Eq && actual == expected
            }
        }
    }

    fn expected_number(&self) -> Option<f64> {
        self.value
            .as_f64()
            .or_else(|| self.value.as_str().and_then(|s| s.trim().parse().ok()))
    }

    fn expected_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }
}

fn compare_f64(actual: f64, expected: f64, operator: ConditionOperator) -> bool {
    match operator {
        ConditionOperator::Eq => (actual - expected).abs() < f64::EPSILON,
        ConditionOperator::Gte => actual >= expected,
        ConditionOperator::Lte => actual <= expected,
        ConditionOperator::Gt => actual > expected,
        ConditionOperator::Lt => actual < expected,
    }
}

fn compare_str(actual: &str, expected: &str, operator: ConditionOperator) -> bool {
    match operator {
        ConditionOperator::Eq => actual == expected,
        ConditionOperator::Gte => actual >= expected,
        ConditionOperator::Lte => actual <= expected,
        ConditionOperator::Gt => actual > expected,
        ConditionOperator::Lt => actual < expected,
    }
}

/// Event kind that triggers rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationTrigger {
    /// The candidate entered the rule's stage.
    StageEntry,
    /// A field on the assignment was updated while in the stage.
    FieldUpdate,
}

/// HTTP method for webhook actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookMethod {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP PATCH.
    Patch,
}

impl fmt::Display for WebhookMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Patch => write!(f, "PATCH"),
        }
    }
}

/// Configuration for an outbound webhook call.
///
/// Header values and the body template may contain `${NAME}` references
/// resolved from the secret store at call time; the resolved values are
/// never persisted or logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: WebhookMethod,
    /// Header templates.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Optional body template; when absent the engine sends the standard
    /// versioned payload envelope.
    #[serde(default)]
    pub body_template: Option<String>,
}

impl WebhookConfig {
    /// Creates a POST webhook config.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: WebhookMethod::Post,
            headers: HashMap::new(),
            body_template: None,
        }
    }

    /// Adds a header template.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body template.
    #[must_use]
    pub fn with_body_template(mut self, template: impl Into<String>) -> Self {
        self.body_template = Some(template.into());
        self
    }
}

/// An action executed when a rule fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AutomationAction {
    /// Move the candidate to another stage.
    MoveStage {
        /// The destination stage.
        target_stage_id: Uuid,
    },
    /// Notify a target through the notification dispatcher.
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
    /// Reject the candidate with a catalogued reason.
    RecordRejection {
        /// The rejection reason id.
        reason_id: Uuid,
        /// Optional free-text note.
        note: Option<String>,
    },
    /// An opaque hook handled by an embedding application.
    Custom {
        /// Hook name.
        name: String,
        /// Hook payload.
        data: serde_json::Value,
    },
}

impl AutomationAction {
    /// Short label used in execution records and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MoveStage { .. } => "move_stage",
            Self::Notify { .. } => "notify",
            Self::Webhook { .. } => "webhook",
            Self::RecordRejection { .. } => "record_rejection",
            Self::Custom { .. } => "custom",
        }
    }

    /// Whether the action talks to an external collaborator and is
    /// therefore retried on transient failure.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Notify { .. } | Self::Webhook { .. })
    }
}

/// A condition→action binding attached to a stage.
///
/// All conditions must match (logical AND) for the rule to fire. Rules on a
/// stage are evaluated in `order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    /// Unique rule id.
    pub id: Uuid,
    /// The stage the rule is attached to.
    pub stage_id: Uuid,
    /// Rule name.
    pub name: String,
    /// What event triggers evaluation.
    pub trigger: AutomationTrigger,
    /// Conditions, all of which must match.
    pub conditions: Vec<Condition>,
    /// Actions executed sequentially when the rule fires.
    pub actions: Vec<AutomationAction>,
    /// Defer execution by this many minutes; 0 executes immediately.
    pub delay_minutes: u64,
    /// Retry budget for remote actions.
    pub max_attempts: u32,
    /// Evaluation order within the stage.
    pub order: u32,
    /// Whether the rule is enabled.
    pub active: bool,
}

impl AutomationRule {
    /// Creates an immediate, active rule.
    #[must_use]
    pub fn new(
        stage_id: Uuid,
        name: impl Into<String>,
        trigger: AutomationTrigger,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage_id,
            name: name.into(),
            trigger,
            conditions: Vec::new(),
            actions: Vec::new(),
            delay_minutes: 0,
            max_attempts: 3,
            order: 1,
            active: true,
        }
    }

    /// Adds a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Adds an action.
    #[must_use]
    pub fn with_action(mut self, action: AutomationAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Defers execution by `minutes`.
    #[must_use]
    pub fn with_delay_minutes(mut self, minutes: u64) -> Self {
        self.delay_minutes = minutes;
        self
    }

    /// Sets the retry budget for remote actions.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the evaluation order.
    #[must_use]
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Validates the rule's conditions and shape.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty action list or any invalid
    /// condition.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.actions.is_empty() {
            return Err(
                ValidationError::new(format!("rule '{}' has no actions", self.name))
                    .with_field("actions"),
            );
        }
        for condition in &self.conditions {
            condition.validate()?;
        }
        Ok(())
    }

    /// Whether every condition matches the fact set.
    #[must_use]
    pub fn matches(&self, facts: &FactSet) -> bool {
        self.conditions.iter().all(|c| c.matches(facts))
    }
}

/// Outcome of one automation action execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The action completed.
    Completed,
    /// The action failed permanently (retries exhausted or non-retryable).
    Failed,
    /// A scheduled execution was cancelled before running.
    Cancelled,
}

/// A record of one automation action firing, kept for operator visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationExecution {
    /// Unique record id.
    pub id: Uuid,
    /// The rule that fired.
    pub rule_id: Uuid,
    /// The assignment the rule fired for.
    pub assignment_id: Uuid,
    /// The action kind (`move_stage`, `webhook`, ...).
    pub action: String,
    /// Outcome.
    pub outcome: ExecutionOutcome,
    /// Attempts used (1 for local actions).
    pub attempts: u32,
    /// Terminal error for failed executions.
    pub error: Option<String>,
    /// When the execution finished.
    pub occurred_at: DateTime<Utc>,
}

impl AutomationExecution {
    /// Records a completed execution.
    #[must_use]
    pub fn completed(
        rule_id: Uuid,
        assignment_id: Uuid,
        action: &str,
        attempts: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id,
            assignment_id,
            action: action.to_string(),
            outcome: ExecutionOutcome::Completed,
            attempts,
            error: None,
            occurred_at: now,
        }
    }

    /// Records a permanently failed execution.
    #[must_use]
    pub fn failed(
        rule_id: Uuid,
        assignment_id: Uuid,
        action: &str,
        attempts: u32,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id,
            assignment_id,
            action: action.to_string(),
            outcome: ExecutionOutcome::Failed,
            attempts,
            error: Some(error.into()),
            occurred_at: now,
        }
    }

    /// Records a cancelled scheduled execution.
    #[must_use]
    pub fn cancelled(
        rule_id: Uuid,
        assignment_id: Uuid,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id,
            assignment_id,
            action: "scheduled".to_string(),
            outcome: ExecutionOutcome::Cancelled,
            attempts: 0,
            error: Some(reason.into()),
            occurred_at: now,
        }
    }
}
