//! Upstream release data.
//!
//! A [`ReleaseData`] snapshot is produced by the source collector and attached to a
//! session once collection finishes. Analyzers read it for context and suggestions;
//! the publish orchestrator uses it as the base of the final payload.

mod model;

pub use model::{CommitRecord, ProjectMetadata, ReleaseAsset, ReleaseData, ReleaseSuggestions};
