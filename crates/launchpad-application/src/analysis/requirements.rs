//! RequirementAnalyzer - decides which fields a session still needs from the user.

use super::AnalysisError;
use super::context;
use super::prompts::PromptRenderer;
use super::structured::parse_structured;
use launchpad_core::{
    DataCollectionRequest, FieldCatalogue, ReleaseSession, TextGenerator, fields,
};
use serde::Deserialize;
use std::sync::Arc;

/// Classifier priority of a requested field. Only `High` makes a request required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Deserialize)]
struct FieldRequirement {
    field: String,
    #[serde(default)]
    reason: String,
    priority: FieldPriority,
    #[serde(default, alias = "suggestions")]
    suggested_values: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RequirementReply {
    fields: Vec<FieldRequirement>,
}

/// Produces the list of fields still needed for a release.
pub struct RequirementAnalyzer {
    generator: Option<Arc<dyn TextGenerator>>,
    catalogue: FieldCatalogue,
    prompts: Arc<PromptRenderer>,
}

impl RequirementAnalyzer {
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

    /// Asks the classifier which fields are still needed.
    ///
    /// Requests come back ordered by priority, high first. Fields already collected
    /// are dropped even when the classifier lists them.
    pub async fn analyze(
        &self,
        session: &ReleaseSession,
    ) -> Result<Vec<DataCollectionRequest>, AnalysisError> {
        let generator = self.generator.as_ref().ok_or(AnalysisError::NoGenerator)?;
        let messages = self.prompts.requirements(&context::summarize(session))?;

        tracing::debug!(
            session_id = %session.id,
            generator = generator.name(),
            "Requesting requirement analysis"
        );
        let reply = generator.generate(&messages).await?;
        let parsed: RequirementReply = parse_structured(&reply)?;

        let mut items = parsed.fields;
        items.sort_by_key(|item| item.priority);

        let mut requests: Vec<DataCollectionRequest> = Vec::with_capacity(items.len());
        for item in items {
            let key = item.field.trim();
            let already_requested = requests.iter().any(|r| r.field == key);
            if key.is_empty() || already_requested || session.collected_responses().contains_key(key)
            {
                continue;
            }
            if self.catalogue.lookup(key).is_none() {
                tracing::warn!(session_id = %session.id, field = key, "Classifier requested a field outside the catalogue");
            }

            let mut request = self
                .catalogue
                .request_for(key, item.priority == FieldPriority::High);
            if !item.reason.trim().is_empty() {
                request.description = join_sentences(&request.description, item.reason.trim());
            }
            request.suggestions = distinct(item.suggested_values);
            requests.push(request);
        }

        Ok(requests)
    }

    /// Deterministic requests used when the classifier is unavailable.
    ///
    /// Always the uncollected obligatory fields, required, with suggestions taken from
    /// the release data. When release data is attached the changelog and short
    /// description are offered as optional extras.
    pub fn fallback_requests(&self, session: &ReleaseSession) -> Vec<DataCollectionRequest> {
        let collected = session.collected_responses();
        let mut requests: Vec<DataCollectionRequest> = self
            .catalogue
            .mandatory()
            .filter(|spec| !collected.contains_key(spec.field))
            .map(|spec| {
                spec.to_request(true)
                    .with_suggestions(suggestions_for(spec.field, session))
            })
            .collect();

        if session.release_data().is_some() {
            for field in [fields::WHATS_NEW, fields::SHORT_DESCRIPTION] {
                if collected.contains_key(field) {
                    continue;
                }
                requests.push(
                    self.catalogue
                        .request_for(field, false)
                        .with_suggestions(suggestions_for(field, session)),
                );
            }
        }

        requests
    }

    /// Runs [`analyze`](Self::analyze) and falls back on any failure.
    pub async fn analyze_or_fallback(&self, session: &ReleaseSession) -> Vec<DataCollectionRequest> {
        match self.analyze(session).await {
            Ok(requests) => requests,
            Err(AnalysisError::NoGenerator) => self.fallback_requests(session),
            Err(err) => {
                tracing::warn!(
                    session_id = %session.id,
                    error = %err,
                    "Requirement analysis failed, using fallback rules"
                );
                self.fallback_requests(session)
            }
        }
    }
}

/// Suggested values for `field` derived from the attached release data.
fn suggestions_for(field: &str, session: &ReleaseSession) -> Vec<String> {
    let Some(data) = session.release_data() else {
        return Vec::new();
    };
    let hints = &data.suggestions;
    let project = &data.project;

    let candidates: Vec<String> = match field {
        fields::APP_NAME => [hints.app_name.clone(), Some(project.name.clone())]
            .into_iter()
            .flatten()
            .collect(),
        fields::APP_TYPE => {
            let looks_like_game = project
                .topics
                .iter()
                .any(|topic| topic.to_lowercase().contains("game"));
            let inferred = if looks_like_game { "GAMES" } else { "MAIN" };
            [hints.app_type.clone(), Some(inferred.to_string())]
                .into_iter()
                .flatten()
                .collect()
        }
        fields::CATEGORIES => {
            let mut values = Vec::new();
            if !hints.categories.is_empty() {
                values.push(hints.categories.join(", "));
            }
            if !project.topics.is_empty() {
                values.push(
                    project
                        .topics
                        .iter()
                        .take(2)
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", "),
                );
            }
            values
        }
        fields::AGE_LEGAL => hints.age_legal.iter().cloned().collect(),
        fields::WHATS_NEW => {
            let mut values: Vec<String> = [hints.whats_new.clone(), data.release_notes.clone()]
                .into_iter()
                .flatten()
                .collect();
            let changes: Vec<String> = data
                .recent_commits(context::RECENT_CHANGE_LIMIT)
                .iter()
                .map(|commit| format!("- {}", commit.summary()))
                .collect();
            if !changes.is_empty() {
                values.push(changes.join("\n"));
            }
            values
        }
        fields::SHORT_DESCRIPTION => {
            let limit = FieldCatalogue::store()
                .lookup(fields::SHORT_DESCRIPTION)
                .and_then(|spec| spec.max_length)
                .unwrap_or(usize::MAX);
            [hints.short_description.clone(), project.description.clone()]
                .into_iter()
                .flatten()
                .map(|text| text.chars().take(limit).collect())
                .collect()
        }
        fields::FULL_DESCRIPTION => [hints.full_description.clone(), project.description.clone()]
            .into_iter()
            .flatten()
            .collect(),
        fields::WEBSITE => project.homepage.iter().cloned().collect(),
        _ => Vec::new(),
    };

    distinct(candidates)
}

/// Trimmed, non-empty values in first-seen order.
fn distinct(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

fn join_sentences(first: &str, second: &str) -> String {
    if first.is_empty() {
        return second.to_string();
    }
    let first = first.trim_end();
    if first.ends_with('.') {
        format!("{first} {second}")
    } else {
        format!("{first}. {second}")
    }
}
