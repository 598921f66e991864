//! Session state machine and its in-memory store.

mod progress;
mod store;
mod workflow;

pub use progress::AgentProgress;
pub use store::{SessionSlot, SessionStore};
pub use workflow::{ReleaseWorkflow, ReleaseWorkflowBuilder, WorkflowOptions};
