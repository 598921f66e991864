//! Domain layer for Launchpad.
//!
//! Holds the release session aggregate, the field catalogue of the target store,
//! the validation engine and the interfaces of external collaborators.

pub mod catalogue;
pub mod collaborator;
pub mod error;
pub mod payload;
pub mod release;
pub mod session;
pub mod validation;

// Re-export common types
pub use catalogue::{FieldCatalogue, FieldSpec, fields};
pub use collaborator::{
    CollaboratorError, ProgressSink, PromptMessage, PromptRole, PublishError, PublishTarget,
    SourceCollector, TextGenerator,
};
pub use error::{LaunchpadError, Result};
pub use payload::PublishPayload;
pub use release::ReleaseData;
pub use session::{
    AgentStatus, CompletionPath, DataCollectionRequest, ReleaseSession, SessionStatus,
    ValidationType,
};
pub use validation::{ValidationResult, validate};
