//! Collaborator implementations for Launchpad.
//!
//! Text generators (classifier backends), the release source collector and the
//! publish targets. All of them implement the traits declared in
//! `launchpad_core::collaborator`.

pub mod gemini_api_agent;
pub mod local_agents;
pub mod publishers;
pub mod scripted;

pub use gemini_api_agent::{DEFAULT_GEMINI_MODEL, GeminiGenerator};
pub use local_agents::{ClaudeCliGenerator, ClaudeModel, CommandSourceCollector};
pub use publishers::{DryRunPublishTarget, HttpPublishTarget};
pub use scripted::ScriptedGenerator;
