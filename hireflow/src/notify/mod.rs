//! Notification dispatch seam.
//!
//! Delivery channels (e-mail, WhatsApp, in-app) live outside this crate;
//! the engine only talks to this trait.

use async_trait::async_trait;
use tracing::info;

use crate::core::Alert;
use crate::errors::HireflowError;

/// External collaborator receiving alerts and ad-hoc notifications.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Delivers an SLA alert to its targets.
    ///
    /// # Errors
    ///
    /// Returns an error on delivery failure; the alert stays pending and is
    /// retried on the next evaluation pass.
    async fn dispatch_alert(&self, alert: &Alert, targets: &[String])
        -> Result<(), HireflowError>;

    /// Delivers a plain notification to one target.
    ///
    /// # Errors
    ///
    /// Returns an error on delivery failure; automation actions retry this
    /// within their attempt budget.
    async fn notify(&self, target: &str, message: &str) -> Result<(), HireflowError>;
}

/// A dispatcher that logs deliveries through tracing and always succeeds.
///
/// The default when no real channel is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher;

impl LoggingDispatcher {
    /// Creates a new logging dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn dispatch_alert(
        &self,
        alert: &Alert,
        targets: &[String],
    ) -> Result<(), HireflowError> {
        info!(
            alert_id = %alert.id,
            classification = %alert.classification,
            ?targets,
            title = %alert.title,
            "dispatching SLA alert"
        );
        Ok(())
    }

    async fn notify(&self, target: &str, message: &str) -> Result<(), HireflowError> {
        info!(%target, %message, "dispatching notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlertClassification, Urgency};
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_logging_dispatcher_succeeds() {
        let dispatcher = LoggingDispatcher::new();
        let alert = Alert::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            AlertClassification::Breached,
            Urgency::High,
            "Prazo estourado",
            Utc::now(),
        );

        dispatcher
            .dispatch_alert(&alert, &["recrutador".to_string()])
            .await
            .unwrap();
        dispatcher.notify("gestor_rh", "Candidato parado").await.unwrap();
    }
}
