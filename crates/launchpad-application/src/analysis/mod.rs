//! Classifier-backed analysis of what a session still needs.
//!
//! Both analyzers ask a [`TextGenerator`](launchpad_core::TextGenerator) for a
//! structured reply and fall back to deterministic rules when the generator is
//! missing, fails, or answers with something unparsable.

pub mod context;
pub mod prompts;
pub mod recovery;
pub mod requirements;
pub mod structured;

pub use recovery::ErrorRecoveryAnalyzer;
pub use requirements::{FieldPriority, RequirementAnalyzer};

use launchpad_core::{CollaboratorError, LaunchpadError};
use thiserror::Error;

/// Why a classifier pass produced no usable requests.
///
/// Never surfaced to callers of the workflow; analyzers log it and fall back.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No classifier is configured")]
    NoGenerator,

    #[error(transparent)]
    Generator(#[from] CollaboratorError),

    #[error("Classifier reply contains no structured block")]
    NoStructuredBlock,

    #[error("Classifier reply has an unexpected shape: {0}")]
    Shape(String),

    #[error("Prompt rendering failed: {0}")]
    Prompt(#[from] minijinja::Error),
}

impl From<AnalysisError> for LaunchpadError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Generator(inner) => LaunchpadError::Collaborator(inner),
            other => LaunchpadError::AnalysisParse(other.to_string()),
        }
    }
}
