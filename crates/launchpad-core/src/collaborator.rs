//! Interfaces of the external collaborators the workflow calls.
//!
//! - [`TextGenerator`]: the classifier used by the analyzers
//! - [`SourceCollector`]: produces the upstream [`ReleaseData`]
//! - [`PublishTarget`]: the store publishing call
//!
//! Implementations live in `launchpad-interaction`; tests use in-memory doubles.

use crate::payload::PublishPayload;
use crate::release::ReleaseData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Step name recorded when a publish target does not name one.
pub const DEFAULT_PUBLISH_STEP: &str = "publish";

/// Failure of an external call (network, subprocess, malformed reply).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollaboratorError {
    /// The collaborator is not configured or not installed
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    /// The call ran but failed
    #[error("Collaborator call failed: {message}")]
    Process {
        status_code: Option<u16>,
        message: String,
        is_retryable: bool,
    },

    /// The call succeeded but its output could not be used
    #[error("Invalid collaborator response: {0}")]
    InvalidResponse(String),
}

impl CollaboratorError {
    pub fn process(message: impl Into<String>, is_retryable: bool) -> Self {
        Self::Process {
            status_code: None,
            message: message.into(),
            is_retryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Process {
                is_retryable: true,
                ..
            }
        )
    }
}

/// A publish attempt rejected by the store.
///
/// The workflow never inspects the message itself; it is handed verbatim to the
/// error-recovery analyzer.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Publish failed at '{}': {message}", .step.as_deref().unwrap_or(DEFAULT_PUBLISH_STEP))]
pub struct PublishError {
    /// Identifier of the step that failed (e.g. `create_draft`, `upload`, `submit`).
    pub step: Option<String>,
    pub message: String,
}

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            step: None,
            message: message.into(),
        }
    }

    pub fn at_step(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: Some(step.into()),
            message: message.into(),
        }
    }

    pub fn step(&self) -> &str {
        self.step.as_deref().unwrap_or(DEFAULT_PUBLISH_STEP)
    }
}

impl From<CollaboratorError> for PublishError {
    fn from(err: CollaboratorError) -> Self {
        Self::new(err.to_string())
    }
}

/// Role tag of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
}

/// One role-tagged message sent to a [`TextGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }
}

/// Text-generation capability used as the classifier.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Sends `messages` in order and returns the raw reply text.
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, CollaboratorError>;
}

/// Receives progress reports from a running collaborator.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// `progress` is a percentage (0-100).
    async fn report(&self, progress: u8, message: &str);
}

/// Collects release metadata for a project reference.
#[async_trait]
pub trait SourceCollector: Send + Sync {
    async fn collect(
        &self,
        project_ref: &str,
        progress: &dyn ProgressSink,
    ) -> Result<ReleaseData, CollaboratorError>;
}

/// Publishes a release to the store.
#[async_trait]
pub trait PublishTarget: Send + Sync {
    async fn publish(&self, payload: &PublishPayload) -> Result<(), PublishError>;
}

/// Delay before an identical-payload publish retry.
///
/// `attempt` is 1 for the first retry. The delay doubles per attempt and is capped at
/// `max`.
pub fn retry_backoff(attempt: u32, initial: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    initial
        .checked_mul(1u32 << exponent)
        .map_or(max, |delay| delay.min(max))
}
