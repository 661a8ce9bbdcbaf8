//! Outbound webhook delivery.
//!
//! Header values and body templates may carry `${NAME}` secret references.
//! They are resolved through a [`SecretStore`] at call time only: resolved
//! values never reach the persisted config, error messages or logs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::automation::{with_retry, RetryConfig};
use crate::core::{WebhookConfig, WebhookMethod};
use crate::errors::{HireflowError, ValidationError, WebhookDeliveryError};

/// Resolves secret references found in webhook templates.
pub trait SecretStore: Send + Sync {
    /// Resolves a reference name to its value, if known.
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Secret store backed by process environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn resolve(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed-map secret store for tests and embedded configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret.
    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

impl SecretStore for StaticSecretStore {
    fn resolve(&self, name: &str) -> Option<String> {
        self.secrets.get(name).cloned()
    }
}

fn reference_pattern() -> Regex {
    #[allow(clippy::expect_used)]
    let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid reference pattern");
    pattern
}

/// Expands `${NAME}` references in a template.
///
/// # Errors
///
/// [`ValidationError`] naming the unresolved reference. The error carries
/// the reference name only, never any resolved value.
pub fn substitute_references(
    template: &str,
    secrets: &dyn SecretStore,
) -> Result<String, ValidationError> {
    let pattern = reference_pattern();
    let mut missing: Option<String> = None;
    let result = pattern.replace_all(template, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match secrets.resolve(name) {
            Some(value) => value,
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(ValidationError::new(format!(
            "unresolved secret reference '${{{name}}}'"
        ))
        .with_field(name)),
        None => Ok(result.into_owned()),
    }
}

/// The standard payload envelope sent when a rule has no body template.
///
/// The envelope is versioned so receivers can evolve independently.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    /// Payload schema version.
    pub schema_version: u32,
    /// The candidate.
    pub candidato_id: Uuid,
    /// The job opening.
    pub vaga_id: Uuid,
    /// Rule-specific data.
    pub data: serde_json::Value,
}

impl WebhookPayload {
    /// Creates a v1 payload.
    #[must_use]
    pub fn new(candidato_id: Uuid, vaga_id: Uuid, data: serde_json::Value) -> Self {
        Self {
            schema_version: 1,
            candidato_id,
            vaga_id,
            data,
        }
    }
}

/// Result of a successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookDelivery {
    /// HTTP status received.
    pub status: u16,
    /// Attempts used.
    pub attempts: u32,
}

fn to_http_method(method: WebhookMethod) -> reqwest::Method {
    match method {
        WebhookMethod::Get => reqwest::Method::GET,
        WebhookMethod::Post => reqwest::Method::POST,
        WebhookMethod::Put => reqwest::Method::PUT,
        WebhookMethod::Patch => reqwest::Method::PATCH,
    }
}

/// Delivers webhooks with bounded timeouts and jittered retries.
pub struct WebhookDispatcher {
    client: reqwest::Client,
    secrets: Arc<dyn SecretStore>,
    retry: RetryConfig,
}

impl WebhookDispatcher {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a dispatcher with the default timeout and retry policy.
    ///
    /// # Errors
    ///
    /// [`HireflowError::Repository`] when the HTTP client cannot be built.
    pub fn new(secrets: Arc<dyn SecretStore>) -> Result<Self, HireflowError> {
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| HireflowError::Repository(format!("http client: {e}")))?;
        Ok(Self {
            client,
            secrets,
            retry: RetryConfig::default(),
        })
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Delivers one webhook, retrying transient failures up to
    /// `max_attempts`.
    ///
    /// # Errors
    ///
    /// [`HireflowError::Validation`] for unresolved secret references or
    /// malformed headers (not retried), or the last
    /// [`HireflowError::WebhookDelivery`] once the budget is exhausted.
    pub async fn deliver(
        &self,
        config: &WebhookConfig,
        payload: &WebhookPayload,
        max_attempts: u32,
    ) -> Result<WebhookDelivery, HireflowError> {
        let mut headers = reqwest::header::HeaderMap::new();
        for (name, template) in &config.headers {
            let value = substitute_references(template, self.secrets.as_ref())?;
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ValidationError::new(format!("invalid header name '{name}'")))?;
            let value = reqwest::header::HeaderValue::from_str(&value)
                .map_err(|_| ValidationError::new("invalid header value"))?;
            headers.insert(name, value);
        }

        let body = match &config.body_template {
            Some(template) => substitute_references(template, self.secrets.as_ref())?,
            None => serde_json::to_string(payload)?,
        };

        let url = config.url.clone();
        let method = to_http_method(config.method);

        let outcome = with_retry(&self.retry, max_attempts, |attempt| {
            let request = self
                .client
                .request(method.clone(), url.as_str())
                .headers(headers.clone())
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone());
            let url = url.clone();
            async move {
                debug!(%url, attempt, "sending webhook");
                let response = request
                    .send()
                    .await
                    .map_err(|e| WebhookDeliveryError::new(url.as_str(), attempt + 1, e.to_string()))?;
                let status = response.status();
                if status.is_success() {
                    Ok(status.as_u16())
                } else {
                    Err(WebhookDeliveryError::new(
                        url.as_str(),
                        attempt + 1,
                        format!("status {status}"),
                    ))
                }
            }
        })
        .await;

        match outcome {
            Ok((status, attempts)) => Ok(WebhookDelivery { status, attempts }),
            Err((error, attempts)) => {
                warn!(
                    url = %config.url,
                    attempts,
                    error = %error,
                    "webhook delivery exhausted retry budget"
                );
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn secrets() -> StaticSecretStore {
        StaticSecretStore::new().with_secret("API_KEY", "s3cr3t-value")
    }

    #[test]
    fn test_substitution_expands_references() {
        let resolved =
            substitute_references("Bearer ${API_KEY}", &secrets()).unwrap();
        assert_eq!(resolved, "Bearer s3cr3t-value");
    }

    #[test]
    fn test_substitution_leaves_plain_text_alone() {
        let resolved = substitute_references("application/json", &secrets()).unwrap();
        assert_eq!(resolved, "application/json");
    }

    #[test]
    fn test_unresolved_reference_fails_without_leaking() {
        let error =
            substitute_references("Bearer ${MISSING_KEY}", &secrets()).unwrap_err();
        assert!(error.to_string().contains("MISSING_KEY"));
        assert!(!error.to_string().contains("s3cr3t-value"));
    }

    #[test]
    fn test_multiple_references() {
        let store = secrets().with_secret("TENANT", "acme");
        let resolved =
            substitute_references("${TENANT}:${API_KEY}", &store).unwrap();
        assert_eq!(resolved, "acme:s3cr3t-value");
    }

    #[test]
    fn test_payload_envelope_is_versioned() {
        let payload = WebhookPayload::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            serde_json::json!({"tipo_exames": "admissional"}),
        );
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["data"]["tipo_exames"], "admissional");
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_http_method(WebhookMethod::Post), reqwest::Method::POST);
        assert_eq!(to_http_method(WebhookMethod::Get), reqwest::Method::GET);
    }
}
