use super::store::SessionSlot;
use async_trait::async_trait;
use launchpad_core::ProgressSink;
use std::sync::Arc;

/// Forwards collaborator progress into the session's `agent_statuses`.
pub struct AgentProgress {
    slot: Arc<SessionSlot>,
    agent: &'static str,
}

impl AgentProgress {
    pub fn new(slot: Arc<SessionSlot>, agent: &'static str) -> Self {
        Self { slot, agent }
    }
}

#[async_trait]
impl ProgressSink for AgentProgress {
    async fn report(&self, progress: u8, message: &str) {
        let mut session = self.slot.lock().await;
        // Cancelled and removed sessions are terminal and no longer tracked
        if session.status().is_terminal() {
            return;
        }
        session.update_agent(self.agent, progress, message);
        tracing::debug!(session_id = %session.id, agent = self.agent, progress, "{}", message);
    }
}
