//! Release session aggregate.

use super::agent_status::AgentStatus;
use super::request::DataCollectionRequest;
use super::status::SessionStatus;
use crate::catalogue::FieldCatalogue;
use crate::collaborator::PublishError;
use crate::error::{LaunchpadError, Result};
use crate::release::ReleaseData;
use crate::validation::{self, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Key of the source collector in `agent_statuses`.
pub const SOURCE_AGENT: &str = "source";

/// How a session with no pending requests proceeds to publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPath {
    /// After a failed publish the user resubmitted exactly the data of that attempt.
    Reconfirmed,
    /// First completion, or completion with changed data.
    Fresh,
}

/// One end-to-end attempt to assemble and publish a release.
///
/// # Invariants
///
/// - a field name never appears in both `pending_requests` and `collected_responses`
/// - `pending_requests` is unique by field name
/// - `status == Completed` implies `pending_requests` is empty
/// - every status change follows [`SessionStatus::can_transition_to`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseSession {
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Chat the session reports to (routing only).
    pub chat_id: String,
    /// Upstream project the release is collected from.
    pub project_ref: String,
    status: SessionStatus,
    release_data: Option<ReleaseData>,
    pending_requests: Vec<DataCollectionRequest>,
    collected_responses: BTreeMap<String, String>,
    /// Snapshot of `collected_responses` at the last failed publish attempt.
    previous_responses: Option<BTreeMap<String, String>>,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub failed_at_step: Option<String>,
    pub agent_statuses: BTreeMap<String, AgentStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReleaseSession {
    /// Creates a session in `Active` status with the source collector marked running.
    pub fn new(
        user_id: impl Into<String>,
        chat_id: impl Into<String>,
        project_ref: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let mut agent_statuses = BTreeMap::new();
        agent_statuses.insert(
            SOURCE_AGENT.to_string(),
            AgentStatus::started(SOURCE_AGENT, "Collecting release data"),
        );

        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            chat_id: chat_id.into(),
            project_ref: project_ref.into(),
            status: SessionStatus::Active,
            release_data: None,
            pending_requests: Vec::new(),
            collected_responses: BTreeMap::new(),
            previous_responses: None,
            retry_count: 0,
            last_error: None,
            failed_at_step: None,
            agent_statuses,
            created_at: now,
            updated_at: now,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn release_data(&self) -> Option<&ReleaseData> {
        self.release_data.as_ref()
    }

    pub fn pending_requests(&self) -> &[DataCollectionRequest] {
        &self.pending_requests
    }

    pub fn pending_request(&self, field: &str) -> Option<&DataCollectionRequest> {
        self.pending_requests.iter().find(|req| req.field == field)
    }

    pub fn collected_responses(&self) -> &BTreeMap<String, String> {
        &self.collected_responses
    }

    /// Collected value for `field`, ignoring answers that were skipped.
    pub fn response(&self, field: &str) -> Option<&str> {
        self.collected_responses
            .get(field)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn previous_responses(&self) -> Option<&BTreeMap<String, String>> {
        self.previous_responses.as_ref()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Moves to `next` if the transition table allows it.
    pub fn transition_to(&mut self, next: SessionStatus) -> Result<()> {
        let illegal = !self.status.can_transition_to(next)
            || (next == SessionStatus::Completed && !self.pending_requests.is_empty());
        if illegal {
            return Err(LaunchpadError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    pub fn attach_release_data(&mut self, data: ReleaseData) {
        self.release_data = Some(data);
        self.touch();
    }

    /// Replaces the pending requests with `requests`.
    ///
    /// Requests for fields that are already collected are dropped, as are duplicates
    /// (the first request for a field wins). Returns the number of installed requests.
    pub fn install_requests(&mut self, requests: Vec<DataCollectionRequest>) -> usize {
        let mut installed: Vec<DataCollectionRequest> = Vec::with_capacity(requests.len());
        for request in requests {
            let duplicate = installed.iter().any(|r| r.field == request.field);
            if duplicate || self.collected_responses.contains_key(&request.field) {
                continue;
            }
            installed.push(request);
        }
        self.pending_requests = installed;
        self.touch();
        self.pending_requests.len()
    }

    /// Installs corrective requests, re-opening fields that were already collected.
    ///
    /// A re-opened field loses its collected value (it stays in `previous_responses`)
    /// and the old value becomes the first suggestion of its request.
    pub fn reopen_fields(&mut self, requests: Vec<DataCollectionRequest>) -> usize {
        let mut reopened = Vec::with_capacity(requests.len());
        for mut request in requests {
            if reopened
                .iter()
                .any(|r: &DataCollectionRequest| r.field == request.field)
            {
                continue;
            }
            if let Some(old) = self.collected_responses.remove(&request.field) {
                if !old.is_empty() && !request.suggestions.contains(&old) {
                    request.suggestions.insert(0, old);
                }
            }
            reopened.push(request);
        }
        self.pending_requests = reopened;
        self.touch();
        self.pending_requests.len()
    }

    /// Validates `raw_value` for a pending `field` and, when valid, moves it into the
    /// collected responses.
    ///
    /// An invalid value leaves the session untouched. Outside `WaitingUser` no request
    /// is open, so every field is unknown.
    pub fn accept_response(&mut self, field: &str, raw_value: &str) -> Result<ValidationResult> {
        let position = self
            .status
            .accepts_responses()
            .then(|| self.pending_requests.iter().position(|r| r.field == field))
            .flatten();
        let Some(index) = position else {
            return Err(LaunchpadError::unknown_field(&self.id, field));
        };

        let result = validation::validate(raw_value, &self.pending_requests[index]);
        if result.valid {
            let request = self.pending_requests.remove(index);
            self.collected_responses
                .insert(request.field, raw_value.trim().to_string());
            self.touch();
        }
        Ok(result)
    }

    /// Decides how to proceed once nothing is pending; `None` while requests remain.
    pub fn completion_path(&self) -> Option<CompletionPath> {
        if !self.pending_requests.is_empty() {
            return None;
        }
        let reconfirmed = self.retry_count > 0
            && self
                .previous_responses
                .as_ref()
                .is_some_and(|previous| *previous == self.collected_responses);
        Some(if reconfirmed {
            CompletionPath::Reconfirmed
        } else {
            CompletionPath::Fresh
        })
    }

    /// Mandatory catalogue fields without a collected value.
    pub fn missing_mandatory_fields(&self, catalogue: &FieldCatalogue) -> Vec<&'static str> {
        catalogue
            .mandatory()
            .filter(|spec| self.response(spec.field).is_none())
            .map(|spec| spec.field)
            .collect()
    }

    /// Publishable only when every mandatory field has a value, whatever is pending.
    pub fn is_ready_for_publishing(&self, catalogue: &FieldCatalogue) -> bool {
        self.missing_mandatory_fields(catalogue).is_empty()
    }

    /// Records a failed publish attempt and moves to `RetryNeeded`.
    pub fn record_publish_failure(&mut self, error: &PublishError) -> Result<()> {
        self.transition_to(SessionStatus::RetryNeeded)?;
        self.last_error = Some(error.message.clone());
        self.failed_at_step = Some(error.step().to_string());
        self.retry_count += 1;
        self.previous_responses = Some(self.collected_responses.clone());
        Ok(())
    }

    /// Short user-facing summary of the last failure.
    pub fn failure_summary(&self) -> Option<String> {
        let error = self.last_error.as_deref()?;
        let step = self.failed_at_step.as_deref().unwrap_or("publish");
        Some(format!(
            "Publishing failed at step '{step}' (attempt {}): {error}",
            self.retry_count
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Background agent progress
    // ─────────────────────────────────────────────────────────────────────────

    pub fn update_agent(&mut self, name: &str, progress: u8, message: &str) {
        self.agent_statuses
            .entry(name.to_string())
            .or_insert_with(|| AgentStatus::started(name, message))
            .update(progress, message);
        self.touch();
    }

    pub fn complete_agent(&mut self, name: &str, message: &str) {
        if let Some(status) = self.agent_statuses.get_mut(name) {
            status.complete(message);
            self.touch();
        }
    }

    pub fn fail_agent(&mut self, name: &str, message: &str) {
        if let Some(status) = self.agent_statuses.get_mut(name) {
            status.fail(message);
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
