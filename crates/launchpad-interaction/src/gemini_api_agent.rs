//! GeminiGenerator - Direct REST API implementation for Gemini.
//!
//! Calls the Gemini `generateContent` endpoint. System messages are sent as the
//! request's system instruction, user messages as conversation contents.

use async_trait::async_trait;
use launchpad_core::{CollaboratorError, PromptMessage, PromptRole, TextGenerator};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Text generator that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    /// Creates a new generator with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points the generator at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(messages: &[PromptMessage]) -> Result<GenerateContentRequest, CollaboratorError> {
        let system_text: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == PromptRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents: Vec<Content> = messages
            .iter()
            .filter(|m| m.role == PromptRole::User && !m.content.trim().is_empty())
            .map(|m| Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        if contents.is_empty() {
            return Err(CollaboratorError::InvalidResponse(
                "Gemini payload must include at least one user message".into(),
            ));
        }

        let system_instruction = (!system_text.is_empty()).then(|| Content {
            role: "system".to_string(),
            parts: vec![Part {
                text: system_text.join("\n\n"),
            }],
        });

        Ok(GenerateContentRequest {
            contents,
            system_instruction,
        })
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, CollaboratorError> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            self.base_url,
            model = self.model,
            api_key = self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| CollaboratorError::Process {
                status_code: None,
                message: format!("Gemini API request failed: {err}"),
                is_retryable: err.is_connect() || err.is_timeout(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            CollaboratorError::InvalidResponse(format!("Failed to parse Gemini response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, CollaboratorError> {
        let request = Self::build_request(messages)?;
        tracing::debug!(model = %self.model, messages = messages.len(), "Sending Gemini request");
        self.send_request(&request).await
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, CollaboratorError> {
    response
        .candidates
        .and_then(|mut candidates| candidates.pop())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
        .ok_or_else(|| {
            CollaboratorError::InvalidResponse(
                "Gemini API returned no text in the response candidates".into(),
            )
        })
}

fn map_http_error(status: StatusCode, body: String) -> CollaboratorError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    CollaboratorError::Process {
        status_code: Some(status.as_u16()),
        message,
        is_retryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_splits_roles() {
        let request = GeminiGenerator::build_request(&[
            PromptMessage::system("You classify fields."),
            PromptMessage::user("Context here"),
        ])
        .unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Context here");
        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "You classify fields."
        );
    }

    #[test]
    fn test_build_request_requires_user_message() {
        let err = GeminiGenerator::build_request(&[PromptMessage::system("only system")]).unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidResponse(_)));
    }

    #[test]
    fn test_map_http_error_reads_error_body() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = map_http_error(StatusCode::TOO_MANY_REQUESTS, body.to_string());
        assert!(err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Collaborator call failed: RESOURCE_EXHAUSTED: Quota exceeded"
        );
    }

    #[test]
    fn test_map_http_error_plain_body() {
        let err = map_http_error(StatusCode::BAD_REQUEST, "nope".to_string());
        assert!(!err.is_retryable());
        assert!(err.to_string().ends_with("nope"));
    }

    #[test]
    fn test_extract_text_response_without_candidates() {
        let parsed: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(extract_text_response(parsed).is_err());
    }
}
