//! Publish targets.
//!
//! - [`HttpPublishTarget`]: POSTs the payload as JSON to a store endpoint
//! - [`DryRunPublishTarget`]: logs the payload and reports success

use async_trait::async_trait;
use launchpad_core::{PublishError, PublishPayload, PublishTarget};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Store endpoint reached over HTTP.
pub struct HttpPublishTarget {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpPublishTarget {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[async_trait]
impl PublishTarget for HttpPublishTarget {
    async fn publish(&self, payload: &PublishPayload) -> Result<(), PublishError> {
        let mut request = self.client.post(&self.endpoint).json(payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        tracing::info!(endpoint = %self.endpoint, app = %payload.app_name, "Submitting release");
        let response = request.send().await.map_err(|err| {
            PublishError::at_step("request", format!("Store request failed: {err}"))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read store error body".to_string());
        Err(map_store_error(status, &body))
    }
}

#[derive(Deserialize)]
struct StoreErrorBody {
    #[serde(default)]
    step: Option<String>,
    #[serde(alias = "error", alias = "detail")]
    message: Option<String>,
}

/// Turns a store error response into a [`PublishError`], keeping the store's wording.
fn map_store_error(status: StatusCode, body: &str) -> PublishError {
    match serde_json::from_str::<StoreErrorBody>(body) {
        Ok(StoreErrorBody {
            step,
            message: Some(message),
        }) => PublishError { step, message },
        _ => {
            let text = body.trim();
            let message = if text.is_empty() {
                format!("Store responded with {status}")
            } else {
                format!("Store responded with {status}: {text}")
            };
            PublishError::new(message)
        }
    }
}

/// Accepts every payload without contacting a store.
#[derive(Debug, Default)]
pub struct DryRunPublishTarget;

#[async_trait]
impl PublishTarget for DryRunPublishTarget {
    async fn publish(&self, payload: &PublishPayload) -> Result<(), PublishError> {
        let rendered = serde_json::to_string_pretty(payload)
            .map_err(|err| PublishError::at_step("serialize", err.to_string()))?;
        tracing::info!(app = %payload.app_name, "Dry run publish:\n{}", rendered);
        Ok(())
    }
}
