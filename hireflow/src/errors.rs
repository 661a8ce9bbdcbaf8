//! Error types for the hireflow engine.
//!
//! Batch passes (SLA evaluation, automation matching) skip and log malformed
//! records instead of aborting; these types cover the failures that do
//! surface to callers.

use thiserror::Error;
use uuid::Uuid;

/// The main error type for hireflow operations.
#[derive(Debug, Error)]
pub enum HireflowError {
    /// A category code string had no mapping in the template catalogs.
    #[error("unknown category code: '{0}'")]
    UnknownCategory(String),

    /// A validation error occurred.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A stage transition raced with a concurrent write.
    #[error("{0}")]
    ConcurrentModification(#[from] ConcurrentModificationError),

    /// A webhook delivery attempt failed (transient, retryable).
    #[error("{0}")]
    WebhookDelivery(#[from] WebhookDeliveryError),

    /// An automation action failed permanently after exhausting retries.
    #[error("automation '{rule}' permanently failed after {attempts} attempts: {reason}")]
    PermanentAutomationFailure {
        /// The rule name.
        rule: String,
        /// Attempts used before giving up.
        attempts: u32,
        /// The terminal failure reason.
        reason: String,
    },

    /// An entity lookup missed.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The entity kind.
        entity: &'static str,
        /// The entity id.
        id: Uuid,
    },

    /// A repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HireflowError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Creates a permanent automation failure.
    #[must_use]
    pub fn permanent_failure(
        rule: impl Into<String>,
        attempts: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self::PermanentAutomationFailure {
            rule: rule.into(),
            attempts,
            reason: reason.into(),
        }
    }

    /// Returns true if the error maps to a caller mistake (4xx at an API
    /// boundary) rather than an engine fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownCategory(_)
                | Self::Validation(_)
                | Self::ConcurrentModification(_)
                | Self::NotFound { .. }
        )
    }
}

/// Error raised when a rule, action or request is structurally invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The error message.
    pub message: String,
    /// The offending field, when one can be named.
    pub field: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    /// Names the offending field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Error raised when an assignment write observes a stale version.
#[derive(Debug, Clone, Error)]
#[error(
    "assignment {assignment_id} was modified concurrently: expected version {expected}, found {actual}"
)]
pub struct ConcurrentModificationError {
    /// The assignment that raced.
    pub assignment_id: Uuid,
    /// The version the writer expected.
    pub expected: u64,
    /// The version actually stored.
    pub actual: u64,
}

impl ConcurrentModificationError {
    /// Creates a new concurrent modification error.
    #[must_use]
    pub fn new(assignment_id: Uuid, expected: u64, actual: u64) -> Self {
        Self {
            assignment_id,
            expected,
            actual,
        }
    }
}

/// Error raised when an outbound webhook call fails.
///
/// Carries the attempt number so retry exhaustion can be reported precisely.
/// The message never contains resolved header or body values.
#[derive(Debug, Clone, Error)]
#[error("webhook delivery to '{url}' failed on attempt {attempt}: {reason}")]
pub struct WebhookDeliveryError {
    /// The target URL.
    pub url: String,
    /// The 1-indexed attempt number.
    pub attempt: u32,
    /// The failure reason.
    pub reason: String,
}

impl WebhookDeliveryError {
    /// Creates a new webhook delivery error.
    #[must_use]
    pub fn new(url: impl Into<String>, attempt: u32, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            attempt,
            reason: reason.into(),
        }
    }
}
