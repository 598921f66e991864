//! Error types for the Launchpad workflow.

use crate::collaborator::{CollaboratorError, PublishError};
use crate::session::SessionStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Launchpad workflow.
///
/// Field-level validation problems are not errors: they are reported through
/// [`ValidationResult`](crate::validation::ValidationResult). The variants here cover
/// caller misuse, collaborator failures and illegal state changes.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum LaunchpadError {
    /// No session with the given id is held by the store
    #[error("Session not found: '{0}'")]
    SessionNotFound(String),

    /// A response was submitted for a field that has no pending request
    #[error("No pending request for field '{field}' in session '{session_id}'")]
    UnknownField { session_id: String, field: String },

    /// A status change that the transition table does not allow
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    /// The classifier replied in a shape that could not be parsed
    #[error("Analysis parse error: {0}")]
    AnalysisParse(String),

    /// An external collaborator call failed
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// The publish collaborator rejected a release
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// Mandatory fields are still missing
    #[error("Session '{session_id}' is not ready for publishing (missing: {})", .missing.join(", "))]
    NotReady {
        session_id: String,
        missing: Vec<String>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LaunchpadError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a SessionNotFound error
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound(session_id.into())
    }

    /// Creates an UnknownField error
    pub fn unknown_field(session_id: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            session_id: session_id.into(),
            field: field.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a SessionNotFound error
    pub fn is_session_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_))
    }

    /// Check if this is an UnknownField error
    pub fn is_unknown_field(&self) -> bool {
        matches!(self, Self::UnknownField { .. })
    }

    /// Check if this is an InvalidTransition error
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Returns true for errors caused by the caller rather than by a collaborator.
    pub fn is_caller_misuse(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_) | Self::UnknownField { .. } | Self::InvalidTransition { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<serde_json::Error> for LaunchpadError {
    fn from(err: serde_json::Error) -> Self {
        Self::AnalysisParse(err.to_string())
    }
}

/// Conversion from anyhow::Error (used at the binary boundary)
impl From<anyhow::Error> for LaunchpadError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, LaunchpadError>`.
pub type Result<T> = std::result::Result<T, LaunchpadError>;
