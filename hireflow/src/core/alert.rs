//! SLA alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How an assignment stands relative to an SLA deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertClassification {
    /// Deadline is close: `0 < remaining <= alert_before`.
    Approaching,
    /// Deadline has passed.
    Breached,
    /// Breached for longer than `alert_after`; escalation targets notified.
    Escalated,
}

impl fmt::Display for AlertClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approaching => write!(f, "approaching"),
            Self::Breached => write!(f, "breached"),
            Self::Escalated => write!(f, "escalated"),
        }
    }
}

/// Alert urgency, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// Deadline still comfortably away.
    Low,
    /// Deadline approaching.
    Medium,
    /// Deadline imminent or recently breached.
    High,
    /// Long overdue or escalated.
    Critical,
}

/// Lifecycle status of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    /// Created, not yet delivered.
    Pending,
    /// Delivered to the notification targets.
    Sent,
    /// A recipient acknowledged the alert.
    Acknowledged,
    /// The underlying condition cleared or was handled.
    Resolved,
}

impl AlertStatus {
    /// Whether the alert still needs attention.
    #[must_use]
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Resolved)
    }
}

/// An alert produced by the SLA evaluator for one (SLA, assignment) pair.
///
/// The evaluator keeps at most one open alert per pair: state changes
/// reclassify the existing alert rather than inserting duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert id.
    pub id: Uuid,
    /// The SLA definition that produced the alert.
    pub sla_id: Uuid,
    /// The candidate stage assignment the alert is about.
    pub assignment_id: Uuid,
    /// Current classification.
    pub classification: AlertClassification,
    /// Current urgency.
    pub urgency: Urgency,
    /// Lifecycle status.
    pub status: AlertStatus,
    /// Short human-readable title.
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    /// Creates a new pending alert.
    #[must_use]
    pub fn new(
        sla_id: Uuid,
        assignment_id: Uuid,
        classification: AlertClassification,
        urgency: Urgency,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sla_id,
            assignment_id,
            classification,
            urgency,
            status: AlertStatus::Pending,
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Updates classification, urgency and title in place.
    ///
    /// Returns true when the classification actually changed.
    pub fn reclassify(
        &mut self,
        classification: AlertClassification,
        urgency: Urgency,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let changed = self.classification != classification;
        self.classification = classification;
        self.urgency = urgency;
        self.title = title.into();
        self.updated_at = now;
        changed
    }

    /// Puts the alert back in the delivery queue, used when a
    /// classification change must reach its targets again.
    pub fn reopen(&mut self, now: DateTime<Utc>) {
        self.status = AlertStatus::Pending;
        self.updated_at = now;
    }

    /// Marks the alert as delivered.
    pub fn mark_sent(&mut self, now: DateTime<Utc>) {
        self.status = AlertStatus::Sent;
        self.updated_at = now;
    }

    /// Marks the alert as acknowledged.
    pub fn acknowledge(&mut self, now: DateTime<Utc>) {
        self.status = AlertStatus::Acknowledged;
        self.updated_at = now;
    }

    /// Resolves the alert.
    pub fn resolve(&mut self, now: DateTime<Utc>) {
        self.status = AlertStatus::Resolved;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert() -> Alert {
        Alert::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            AlertClassification::Approaching,
            Urgency::Medium,
            "Prazo de triagem se aproximando",
            Utc::now(),
        )
    }

    #[test]
    fn test_new_alert_is_pending() {
        let alert = alert();
        assert_eq!(alert.status, AlertStatus::Pending);
        assert!(alert.status.is_open());
    }

    #[test]
    fn test_reclassify_reports_change() {
        let mut alert = alert();
        let now = Utc::now();

        let changed = alert.reclassify(
            AlertClassification::Breached,
            Urgency::High,
            "Prazo de triagem estourado",
            now,
        );
        assert!(changed);
        assert_eq!(alert.classification, AlertClassification::Breached);

        let changed = alert.reclassify(
            AlertClassification::Breached,
            Urgency::Critical,
            "Prazo de triagem estourado",
            now,
        );
        assert!(!changed);
        assert_eq!(alert.urgency, Urgency::Critical);
    }

    #[test]
    fn test_urgency_ordering() {
        assert!(Urgency::Low < Urgency::Medium);
        assert!(Urgency::High < Urgency::Critical);
    }

    #[test]
    fn test_resolve_closes_alert() {
        let mut alert = alert();
        alert.resolve(Utc::now());
        assert!(!alert.status.is_open());
    }
}
