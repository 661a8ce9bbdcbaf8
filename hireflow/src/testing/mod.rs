//! Test doubles for engine seams.

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::core::Alert;
use crate::errors::HireflowError;
use crate::notify::NotificationDispatcher;

/// A notification dispatcher that records deliveries and can be told to
/// fail the next N calls.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    alerts: Mutex<Vec<(Uuid, Vec<String>)>>,
    notifications: Mutex<Vec<(String, String)>>,
    fail_remaining: Mutex<u32>,
}

impl RecordingDispatcher {
    /// Creates a new recording dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` deliveries fail.
    pub fn fail_next(&self, count: u32) {
        *self.fail_remaining.lock() = count;
    }

    /// Number of alerts delivered.
    #[must_use]
    pub fn alert_count(&self) -> usize {
        self.alerts.lock().len()
    }

    /// Delivered alerts as (alert id, targets) pairs.
    #[must_use]
    pub fn dispatched_alerts(&self) -> Vec<(Uuid, Vec<String>)> {
        self.alerts.lock().clone()
    }

    /// Delivered plain notifications as (target, message) pairs.
    #[must_use]
    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().clone()
    }

    /// Clears recorded deliveries.
    pub fn reset(&self) {
        self.alerts.lock().clear();
        self.notifications.lock().clear();
        *self.fail_remaining.lock() = 0;
    }

    fn take_failure(&self) -> bool {
        let mut remaining = self.fail_remaining.lock();
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch_alert(
        &self,
        alert: &Alert,
        targets: &[String],
    ) -> Result<(), HireflowError> {
        if self.take_failure() {
            return Err(HireflowError::Repository(
                "simulated dispatch failure".to_string(),
            ));
        }
        self.alerts.lock().push((alert.id, targets.to_vec()));
        Ok(())
    }

    async fn notify(&self, target: &str, message: &str) -> Result<(), HireflowError> {
        if self.take_failure() {
            return Err(HireflowError::Repository(
                "simulated dispatch failure".to_string(),
            ));
        }
        self.notifications
            .lock()
            .push((target.to_string(), message.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlertClassification, Urgency};
    use chrono::Utc;

    #[tokio::test]
    async fn test_recording_and_failure_injection() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.fail_next(1);

        assert!(dispatcher.notify("recrutador", "oi").await.is_err());
        assert!(dispatcher.notify("recrutador", "oi").await.is_ok());
        assert_eq!(dispatcher.notifications().len(), 1);

        let alert = Alert::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            AlertClassification::Approaching,
            Urgency::Low,
            "Prazo",
            Utc::now(),
        );
        dispatcher
            .dispatch_alert(&alert, &["gestor".to_string()])
            .await
            .unwrap();
        assert_eq!(dispatcher.alert_count(), 1);

        dispatcher.reset();
        assert_eq!(dispatcher.alert_count(), 0);
    }
}
