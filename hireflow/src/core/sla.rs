//! SLA definitions and deadline arithmetic.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit a deadline is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineUnit {
    /// Plain hours.
    Hours,
    /// Days, 24 hours each.
    Days,
    /// Weeks, 168 hours each.
    Weeks,
}

impl DeadlineUnit {
    /// Hours per unit.
    #[must_use]
    pub fn hours_multiplier(self) -> i64 {
        match self {
            Self::Hours => 1,
            Self::Days => 24,
            Self::Weeks => 168,
        }
    }
}

/// A deadline expressed as an amount of some unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    /// Amount of `unit`.
    pub amount: i64,
    /// The unit.
    pub unit: DeadlineUnit,
}

impl Deadline {
    /// Creates a deadline of `amount` hours.
    #[must_use]
    pub fn hours(amount: i64) -> Self {
        Self {
            amount,
            unit: DeadlineUnit::Hours,
        }
    }

    /// Creates a deadline of `amount` days.
    #[must_use]
    pub fn days(amount: i64) -> Self {
        Self {
            amount,
            unit: DeadlineUnit::Days,
        }
    }

    /// Creates a deadline of `amount` weeks.
    #[must_use]
    pub fn weeks(amount: i64) -> Self {
        Self {
            amount,
            unit: DeadlineUnit::Weeks,
        }
    }

    /// The deadline expressed in hours.
    #[must_use]
    pub fn as_hours(self) -> i64 {
        self.amount.saturating_mul(self.unit.hours_multiplier())
    }
}

/// A deadline bound to a stage, tracked per candidate.
///
/// Several definitions may apply to one stage. Deadlines are always relative
/// to the assignment's `entered_at` for its current stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaDefinition {
    /// Unique id.
    pub id: Uuid,
    /// The stage this SLA is bound to.
    pub stage_id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// The deadline.
    pub deadline: Deadline,
    /// Hours before the deadline at which a pre-deadline alert fires.
    pub alert_before_hours: i64,
    /// Hours past the deadline after which the alert escalates to the
    /// escalation targets.
    pub alert_after_hours: i64,
    /// Names of automation hooks to run on breach.
    pub auto_actions: Vec<String>,
    /// Targets notified on any alert (role names or channel ids).
    pub notification_targets: Vec<String>,
    /// Additional targets notified once the alert escalates.
    pub escalation_targets: Vec<String>,
}

impl SlaDefinition {
    /// Creates an SLA bound to `stage_id`.
    #[must_use]
    pub fn new(stage_id: Uuid, name: impl Into<String>, deadline: Deadline) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage_id,
            name: name.into(),
            deadline,
            alert_before_hours: 4,
            alert_after_hours: 24,
            auto_actions: Vec::new(),
            notification_targets: Vec::new(),
            escalation_targets: Vec::new(),
        }
    }

    /// Sets the pre-deadline alert window.
    #[must_use]
    pub fn with_alert_before_hours(mut self, hours: i64) -> Self {
        self.alert_before_hours = hours;
        self
    }

    /// Sets the post-breach escalation threshold.
    #[must_use]
    pub fn with_alert_after_hours(mut self, hours: i64) -> Self {
        self.alert_after_hours = hours;
        self
    }

    /// Sets the notification targets.
    #[must_use]
    pub fn with_notification_targets(
        mut self,
        targets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.notification_targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the escalation targets.
    #[must_use]
    pub fn with_escalation_targets(
        mut self,
        targets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.escalation_targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// The deadline in hours.
    #[must_use]
    pub fn deadline_hours(&self) -> i64 {
        self.deadline.as_hours()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_convert_to_hours() {
        assert_eq!(Deadline::days(2).as_hours(), 48);
        assert_eq!(Deadline::days(5).as_hours(), 120);
    }

    #[test]
    fn test_weeks_convert_to_hours() {
        assert_eq!(Deadline::weeks(1).as_hours(), 168);
        assert_eq!(Deadline::weeks(2).as_hours(), 336);
    }

    #[test]
    fn test_hours_pass_through() {
        assert_eq!(Deadline::hours(36).as_hours(), 36);
    }

    #[test]
    fn test_sla_definition_builder() {
        let stage_id = Uuid::new_v4();
        let sla = SlaDefinition::new(stage_id, "Prazo de triagem", Deadline::days(2))
            .with_alert_before_hours(6)
            .with_alert_after_hours(12)
            .with_notification_targets(["recrutador"])
            .with_escalation_targets(["gestor_rh"]);

        assert_eq!(sla.stage_id, stage_id);
        assert_eq!(sla.deadline_hours(), 48);
        assert_eq!(sla.alert_before_hours, 6);
        assert_eq!(sla.escalation_targets, vec!["gestor_rh".to_string()]);
    }
}
