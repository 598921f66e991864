//! ScriptedGenerator - deterministic text generator returning canned replies.
//!
//! Used wherever the live classifier must be replaced by predictable output:
//! tests, demos and offline runs.

use async_trait::async_trait;
use launchpad_core::{CollaboratorError, PromptMessage, TextGenerator};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Replays a queue of replies, one per call.
///
/// When the queue is empty every further call fails with
/// [`CollaboratorError::Unavailable`].
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, CollaboratorError>>>,
    prompts: Mutex<Vec<Vec<PromptMessage>>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator that replies with `replies` in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            ..Self::default()
        }
    }

    /// Queues a successful reply.
    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(reply.into()));
    }

    /// Queues a failing call.
    pub async fn push_error(&self, error: CollaboratorError) {
        self.replies.lock().await.push_back(Err(error));
    }

    /// Number of `generate` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Message lists received so far, in call order.
    pub async fn recorded_prompts(&self) -> Vec<Vec<PromptMessage>> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().await.push(messages.to_vec());
        self.replies.lock().await.pop_front().unwrap_or_else(|| {
            Err(CollaboratorError::Unavailable(
                "scripted generator has no replies left".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_fails() {
        let generator = ScriptedGenerator::with_replies(["first", "second"]);
        let messages = [PromptMessage::user("hi")];

        assert_eq!(generator.generate(&messages).await.unwrap(), "first");
        assert_eq!(generator.generate(&messages).await.unwrap(), "second");
        assert!(generator.generate(&messages).await.is_err());
        assert_eq!(generator.call_count(), 3);
        assert_eq!(generator.recorded_prompts().await.len(), 3);
    }

    #[tokio::test]
    async fn test_queued_error() {
        let generator = ScriptedGenerator::new();
        generator
            .push_error(CollaboratorError::process("timeout", true))
            .await;
        generator.push_reply("ok").await;

        let messages = [PromptMessage::user("hi")];
        assert!(generator.generate(&messages).await.unwrap_err().is_retryable());
        assert_eq!(generator.generate(&messages).await.unwrap(), "ok");
    }
}
