// # Resend Notifier
//
// This crate provides an email notifier for the openseat monitor backed by
// the Resend REST API.
//
// ## Trust Level: Untrusted (Notifier)
//
// - ✅ One HTTP request per notification, 30 second client timeout
// - ✅ Specific error handling for HTTP status codes (401, 403, 422, 429, 5xx)
// - ❌ NO retry logic (a transition gets exactly one delivery attempt)
// - ❌ NO queueing or background tasks
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output
// - Notifier MUST fail fast if the key is empty
//
// ## API Reference
//
// - Send Email: POST `https://api.resend.com/emails`
//   `{ "from", "to": [..], "subject", "text" }` with `Authorization: Bearer <key>`

use async_trait::async_trait;
use openseat_core::AdapterRegistry;
use openseat_core::config::NotifierConfig;
use openseat_core::traits::{Notifier, NotifierFactory};
use openseat_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resend send-email endpoint
const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";

/// Environment variable consulted when the config carries no key
pub const API_KEY_ENV: &str = "RESEND_API_KEY";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

/// Resend email notifier
pub struct ResendNotifier {
    /// Resend API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// Sender address
    from: String,

    /// Send-email endpoint
    endpoint: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for ResendNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendNotifier")
            .field("api_key", &"<REDACTED>")
            .field("from", &self.from)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl ResendNotifier {
    /// Create a new Resend notifier
    ///
    /// # Errors
    ///
    /// Configuration error if `api_key` is empty.
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::config("Resend API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            from: from.into(),
            endpoint: RESEND_EMAILS_URL.to_string(),
            client,
        })
    }

    /// Send to a different endpoint (local gateways, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send(&self, destination: &str, subject: &str, body: &str) -> Result<()> {
        let request = SendEmailRequest {
            from: &self.from,
            to: [destination],
            subject,
            text: body,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(format!("Resend request timed out: {}", e))
                } else {
                    Error::http(format!("Resend request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            // Map HTTP status codes to specific errors
            return Err(match status.as_u16() {
                401 | 403 => Error::auth(format!(
                    "Invalid Resend API key or insufficient permissions. Status: {}",
                    status
                )),
                422 => Error::notification(format!(
                    "Resend rejected the email: {} - {}",
                    status, error_text
                )),
                429 => Error::rate_limited(format!(
                    "Resend rate limit exceeded. Status: {}",
                    status
                )),
                500..=599 => Error::adapter(
                    "resend",
                    format!("Resend server error (transient): {} - {}", status, error_text),
                ),
                _ => Error::adapter(
                    "resend",
                    format!("Failed to send email: {} - {}", status, error_text),
                ),
            });
        }

        match response.json::<SendEmailResponse>().await {
            Ok(sent) => tracing::debug!("Resend accepted email {}", sent.id),
            // Delivery was accepted; the body only matters for logging
            Err(e) => tracing::debug!("Resend accepted email, unreadable response: {}", e),
        }

        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "resend"
    }
}

/// Pick the configured key, falling back to the environment value
fn resolve_api_key(configured: Option<&str>, env: Option<String>) -> Option<String> {
    configured
        .map(str::to_string)
        .filter(|k| !k.trim().is_empty())
        .or_else(|| env.filter(|k| !k.trim().is_empty()))
}

/// Factory for creating Resend notifiers
pub struct ResendFactory;

impl NotifierFactory for ResendFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        match config {
            NotifierConfig::Resend { api_key, from } => {
                let api_key = resolve_api_key(api_key.as_deref(), std::env::var(API_KEY_ENV).ok())
                    .ok_or_else(|| {
                        Error::config(format!(
                            "Resend API key is required (set transport.api_key or {})",
                            API_KEY_ENV
                        ))
                    })?;

                Ok(Box::new(ResendNotifier::new(api_key, from.clone())?))
            }
            _ => Err(Error::config("Invalid config for Resend notifier")),
        }
    }
}

/// Register the Resend notifier with a registry
///
/// # Example
///
/// ```rust
/// use openseat_core::AdapterRegistry;
///
/// let registry = AdapterRegistry::new();
/// openseat_notify_resend::register(&registry);
/// assert!(registry.has_notifier("resend"));
/// ```
pub fn register(registry: &AdapterRegistry) {
    registry.register_notifier("resend", Box::new(ResendFactory));
}
