//! Application layer for Launchpad.
//!
//! Wires the domain types of `launchpad-core` to the collaborator traits: the
//! requirement and error-recovery analyzers, the publish orchestrator and the
//! session state machine (`ReleaseWorkflow`).

pub mod analysis;
pub mod publish;
pub mod session;

pub use analysis::{AnalysisError, ErrorRecoveryAnalyzer, RequirementAnalyzer};
pub use publish::PublishOrchestrator;
pub use session::{ReleaseWorkflow, WorkflowOptions};
