//! ErrorRecoveryAnalyzer - maps a publish failure to the fields the user must correct.

use super::AnalysisError;
use super::context;
use super::prompts::PromptRenderer;
use super::structured::parse_structured;
use launchpad_core::{
    DataCollectionRequest, FieldCatalogue, PublishError, ReleaseSession, TextGenerator,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Correction {
    field: String,
    #[serde(default, alias = "reason")]
    issue: String,
    #[serde(default, alias = "suggestions")]
    suggested_values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CorrectionReply {
    fields: Vec<Correction>,
}

/// Produces corrective requests after a failed publish attempt.
///
/// An empty result means the failure is not attributable to user data and the
/// same payload should simply be submitted again.
pub struct ErrorRecoveryAnalyzer {
    generator: Option<Arc<dyn TextGenerator>>,
    catalogue: FieldCatalogue,
    prompts: Arc<PromptRenderer>,
}

impl ErrorRecoveryAnalyzer {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        catalogue: FieldCatalogue,
        prompts: Arc<PromptRenderer>,
    ) -> Self {
        Self {
            generator,
            catalogue,
            prompts,
        }
    }

    /// Asks the classifier which fields caused `error`. Every returned request is required.
    pub async fn analyze_error(
        &self,
        session: &ReleaseSession,
        error: &PublishError,
    ) -> Result<Vec<DataCollectionRequest>, AnalysisError> {
        let generator = self.generator.as_ref().ok_or(AnalysisError::NoGenerator)?;
        let messages = self.prompts.recovery(
            &context::summarize(session),
            error.step(),
            &error.message,
            session.retry_count,
        )?;

        tracing::debug!(
            session_id = %session.id,
            step = error.step(),
            attempt = session.retry_count,
            "Requesting error recovery analysis"
        );
        let reply = generator.generate(&messages).await?;
        let parsed: CorrectionReply = parse_structured(&reply)?;

        let mut requests: Vec<DataCollectionRequest> = Vec::with_capacity(parsed.fields.len());
        for correction in parsed.fields {
            let key = correction.field.trim();
            if key.is_empty() || requests.iter().any(|r| r.field == key) {
                continue;
            }
            let issue = if correction.issue.trim().is_empty() {
                error.message.as_str()
            } else {
                correction.issue.trim()
            };
            let mut request = self.correction_request(session, key, issue);
            request.suggestions = correction
                .suggested_values
                .into_iter()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .collect();
            requests.push(request);
        }
        Ok(requests)
    }

    /// Keyword rules used when the classifier is unavailable.
    ///
    /// Fields whose error keywords occur in the error message are requested again;
    /// no match yields an empty list.
    pub fn fallback_requests(
        &self,
        session: &ReleaseSession,
        error: &PublishError,
    ) -> Vec<DataCollectionRequest> {
        self.catalogue
            .fields_mentioned_in(&error.message)
            .into_iter()
            .map(|spec| self.correction_request(session, spec.field, &error.message))
            .collect()
    }

    /// Runs [`analyze_error`](Self::analyze_error) and falls back on any failure.
    pub async fn analyze_error_or_fallback(
        &self,
        session: &ReleaseSession,
        error: &PublishError,
    ) -> Vec<DataCollectionRequest> {
        match self.analyze_error(session, error).await {
            Ok(requests) => requests,
            Err(AnalysisError::NoGenerator) => self.fallback_requests(session, error),
            Err(err) => {
                tracing::warn!(
                    session_id = %session.id,
                    error = %err,
                    "Error recovery analysis failed, using keyword rules"
                );
                self.fallback_requests(session, error)
            }
        }
    }

    fn correction_request(
        &self,
        session: &ReleaseSession,
        field: &str,
        issue: &str,
    ) -> DataCollectionRequest {
        let mut request = self.catalogue.request_for(field, true);
        let base = request.description.trim_end().trim_end_matches('.').to_string();
        request.description = match session.response(field) {
            Some(current) => format!("{base}. Current value: \"{current}\". Issue: {issue}"),
            None => format!("{base}. Issue: {issue}"),
        };
        request
    }
}
