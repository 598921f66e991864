//! ReleaseWorkflow - the session state machine.
//!
//! Drives a session from creation through data collection to publication:
//!
//! 1. `start_session` registers the session and spawns source collection followed by
//!    requirement analysis
//! 2. `process_user_response` validates answers; once nothing is pending the publish
//!    loop is spawned
//! 3. the publish loop submits the payload, runs error recovery on failure and either
//!    asks for corrections or retries with backoff
//!
//! All session mutations happen under the session's lock. Collaborator calls run on
//! snapshots with the lock released; their results are discarded if the session moved
//! on (for example was cancelled) in the meantime.

use super::progress::AgentProgress;
use super::store::{SessionSlot, SessionStore};
use crate::analysis::prompts::PromptRenderer;
use crate::analysis::{ErrorRecoveryAnalyzer, RequirementAnalyzer};
use crate::publish::PublishOrchestrator;
use launchpad_core::collaborator::retry_backoff;
use launchpad_core::session::SOURCE_AGENT;
use launchpad_core::{
    CompletionPath, DataCollectionRequest, FieldCatalogue, LaunchpadError, PublishError,
    PublishTarget, ReleaseSession, Result, SessionStatus, SourceCollector, TextGenerator,
    ValidationResult,
};
use std::sync::Arc;
use std::time::Duration;

const LOG_TARGET: &str = "launchpad::workflow";

/// Retry policy for identical-payload re-attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOptions {
    /// Failed attempts tolerated before the session fails.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(2_000),
            max_backoff: Duration::from_millis(60_000),
        }
    }
}

/// Builder for [`ReleaseWorkflow`].
pub struct ReleaseWorkflowBuilder {
    target: Arc<dyn PublishTarget>,
    generator: Option<Arc<dyn TextGenerator>>,
    collector: Option<Arc<dyn SourceCollector>>,
    catalogue: FieldCatalogue,
    options: WorkflowOptions,
}

impl ReleaseWorkflowBuilder {
    /// Classifier used by both analyzers. Without one they use their fallback rules.
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Upstream release source. Without one every session runs without release data.
    pub fn collector(mut self, collector: Arc<dyn SourceCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn catalogue(mut self, catalogue: FieldCatalogue) -> Self {
        self.catalogue = catalogue;
        self
    }

    pub fn options(mut self, options: WorkflowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<Arc<ReleaseWorkflow>> {
        let prompts = Arc::new(
            PromptRenderer::new(self.catalogue)
                .map_err(|e| LaunchpadError::internal(format!("Invalid prompt template: {e}")))?,
        );
        Ok(Arc::new(ReleaseWorkflow {
            store: SessionStore::new(),
            collector: self.collector,
            requirements: RequirementAnalyzer::new(
                self.generator.clone(),
                self.catalogue,
                Arc::clone(&prompts),
            ),
            recovery: ErrorRecoveryAnalyzer::new(self.generator, self.catalogue, prompts),
            orchestrator: PublishOrchestrator::new(self.target, self.catalogue),
            catalogue: self.catalogue,
            options: self.options,
        }))
    }
}

/// Session state machine service.
///
/// Shared as `Arc<ReleaseWorkflow>`; background work holds its own clone.
pub struct ReleaseWorkflow {
    store: SessionStore,
    collector: Option<Arc<dyn SourceCollector>>,
    requirements: RequirementAnalyzer,
    recovery: ErrorRecoveryAnalyzer,
    orchestrator: PublishOrchestrator,
    catalogue: FieldCatalogue,
    options: WorkflowOptions,
}

impl ReleaseWorkflow {
    pub fn builder(target: Arc<dyn PublishTarget>) -> ReleaseWorkflowBuilder {
        ReleaseWorkflowBuilder {
            target,
            generator: None,
            collector: None,
            catalogue: FieldCatalogue::store(),
            options: WorkflowOptions::default(),
        }
    }

    pub fn catalogue(&self) -> &FieldCatalogue {
        &self.catalogue
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Caller-facing operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Creates a session and starts collecting release data in the background.
    ///
    /// Returns the session as created (`Active`); requests appear once collection and
    /// analysis finish.
    pub async fn start_session(
        self: &Arc<Self>,
        user_id: &str,
        chat_id: &str,
        project_ref: &str,
    ) -> ReleaseSession {
        let session = ReleaseSession::new(user_id, chat_id, project_ref);
        let snapshot = session.clone();
        let slot = self.store.insert(session).await;
        tracing::info!(target: LOG_TARGET, session_id = %snapshot.id, project = project_ref, "Session started");

        let workflow = Arc::clone(self);
        let worker_slot = Arc::clone(&slot);
        let handle = tokio::spawn(async move {
            workflow.collect_and_analyze(worker_slot).await;
        });
        slot.track(handle).await;

        snapshot
    }

    /// Validates and records the user's answer for a pending field.
    ///
    /// An invalid value is returned as a `ValidationResult` and changes nothing. When
    /// the last pending request is answered and the session is publishable, the
    /// publish loop starts in the background.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` for an unknown session
    /// - `UnknownField` when `field` has no pending request
    pub async fn process_user_response(
        self: &Arc<Self>,
        session_id: &str,
        field: &str,
        value: &str,
    ) -> Result<ValidationResult> {
        let slot = self.store.get(session_id).await?;

        let (result, publish) = {
            let mut session = slot.lock().await;
            let result = session.accept_response(field, value)?;
            if !result.valid {
                tracing::debug!(target: LOG_TARGET, session_id, field, "Rejected invalid value");
                return Ok(result);
            }
            let publish = self.on_response_accepted(&mut session)?;
            (result, publish)
        };

        if publish {
            self.spawn_publish_loop(slot).await;
        }
        Ok(result)
    }

    /// Current state of a session.
    pub async fn get_session(&self, session_id: &str) -> Result<ReleaseSession> {
        Ok(self.store.get(session_id).await?.snapshot().await)
    }

    /// Whether every obligatory field of the session has a value.
    pub async fn is_ready_for_publishing(&self, session_id: &str) -> Result<bool> {
        let slot = self.store.get(session_id).await?;
        let session = slot.lock().await;
        Ok(session.is_ready_for_publishing(&self.catalogue))
    }

    /// Moves a session to `status` by external command.
    ///
    /// Only `Cancelled` and `Failed` may be requested; the other statuses are entered
    /// by the workflow alone. Background work still running for the session finishes
    /// on its own and its result is discarded.
    pub async fn complete_session(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<ReleaseSession> {
        let slot = self.store.get(session_id).await?;
        let mut session = slot.lock().await;
        let from = session.status();
        if !status.is_caller_settable() {
            tracing::warn!(target: LOG_TARGET, session_id, %from, to = %status, "Refused caller transition");
            return Err(LaunchpadError::InvalidTransition { from, to: status });
        }
        session.transition_to(status)?;
        tracing::info!(target: LOG_TARGET, session_id, %from, to = %status, "Session completed by caller");
        Ok(session.clone())
    }

    pub async fn cancel_session(&self, session_id: &str) -> Result<ReleaseSession> {
        self.complete_session(session_id, SessionStatus::Cancelled)
            .await
    }

    /// Waits until no background work is running for the session.
    pub async fn settle(&self, session_id: &str) -> Result<ReleaseSession> {
        let slot = self.store.get(session_id).await?;
        slot.settle().await;
        Ok(slot.snapshot().await)
    }

    /// Snapshots of all live sessions, oldest first.
    pub async fn list_sessions(&self) -> Vec<ReleaseSession> {
        let mut sessions = Vec::new();
        for slot in self.store.slots().await {
            sessions.push(slot.snapshot().await);
        }
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }

    /// Drops a session from the store, cancelling it first when it is still live.
    pub async fn remove_session(&self, session_id: &str) -> Result<ReleaseSession> {
        let slot = self.store.remove(session_id).await?;
        let mut session = slot.lock().await;
        if !session.status().is_terminal() {
            session.transition_to(SessionStatus::Cancelled)?;
        }
        tracing::info!(target: LOG_TARGET, session_id, status = %session.status(), "Session removed");
        Ok(session.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Completion check
    // ─────────────────────────────────────────────────────────────────────────

    /// Decides what follows an accepted answer. Returns `true` when the session moved
    /// to `Publishing`.
    fn on_response_accepted(&self, session: &mut ReleaseSession) -> Result<bool> {
        let Some(path) = session.completion_path() else {
            return Ok(false);
        };

        match path {
            CompletionPath::Reconfirmed => tracing::info!(
                target: LOG_TARGET,
                session_id = %session.id,
                attempt = session.retry_count + 1,
                "Unchanged data reconfirmed, publishing without re-analysis"
            ),
            CompletionPath::Fresh => tracing::info!(
                target: LOG_TARGET,
                session_id = %session.id,
                "All requests answered"
            ),
        }

        let missing = session.missing_mandatory_fields(&self.catalogue);
        if !missing.is_empty() {
            tracing::info!(target: LOG_TARGET, session_id = %session.id, ?missing, "Obligatory fields still missing");
            session.reopen_fields(self.mandatory_requests(&missing));
            return Ok(false);
        }

        session.transition_to(SessionStatus::Publishing)?;
        Ok(true)
    }

    fn mandatory_requests(&self, missing: &[&str]) -> Vec<DataCollectionRequest> {
        missing
            .iter()
            .map(|field| self.catalogue.request_for(field, true))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Background work
    // ─────────────────────────────────────────────────────────────────────────

    async fn collect_and_analyze(self: Arc<Self>, slot: Arc<SessionSlot>) {
        let session_id = slot.lock().await.id.clone();
        match self.run_collection(&slot).await {
            Ok(true) => self.run_publish_loop(&slot).await,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(target: LOG_TARGET, session_id = %session_id, "Collection stage failed: {}", e)
            }
        }
    }

    /// Source collection followed by requirement analysis. Returns `true` when the
    /// session went straight to `Publishing`.
    async fn run_collection(&self, slot: &Arc<SessionSlot>) -> Result<bool> {
        let (session_id, project_ref) = {
            let session = slot.lock().await;
            (session.id.clone(), session.project_ref.clone())
        };

        match &self.collector {
            Some(collector) => {
                let progress = AgentProgress::new(Arc::clone(slot), SOURCE_AGENT);
                let collected = collector.collect(&project_ref, &progress).await;
                let mut session = slot.lock().await;
                match collected {
                    Ok(data) => {
                        tracing::info!(
                            target: LOG_TARGET,
                            session_id = %session_id,
                            version = %data.version,
                            "Release data collected"
                        );
                        session.attach_release_data(data);
                        session.complete_agent(SOURCE_AGENT, "Release data collected");
                    }
                    Err(e) => {
                        tracing::warn!(
                            target: LOG_TARGET,
                            session_id = %session_id,
                            "Release collection failed, continuing without release data: {}",
                            e
                        );
                        session.fail_agent(SOURCE_AGENT, &e.to_string());
                    }
                }
            }
            None => {
                slot.lock()
                    .await
                    .fail_agent(SOURCE_AGENT, "No release source configured");
            }
        }

        let snapshot = {
            let session = slot.lock().await;
            if session.status() != SessionStatus::Active {
                tracing::info!(target: LOG_TARGET, session_id = %session_id, status = %session.status(), "Session left active state during collection");
                return Ok(false);
            }
            session.clone()
        };

        let requests = self.requirements.analyze_or_fallback(&snapshot).await;

        let mut session = slot.lock().await;
        if session.status() != SessionStatus::Active {
            tracing::info!(target: LOG_TARGET, session_id = %session_id, status = %session.status(), "Discarding requirement analysis");
            return Ok(false);
        }

        let installed = session.install_requests(requests);
        if installed == 0 && session.is_ready_for_publishing(&self.catalogue) {
            session.transition_to(SessionStatus::Publishing)?;
            return Ok(true);
        }
        if installed == 0 {
            let missing = session.missing_mandatory_fields(&self.catalogue);
            session.install_requests(self.mandatory_requests(&missing));
        }
        session.transition_to(SessionStatus::WaitingUser)?;
        tracing::info!(
            target: LOG_TARGET,
            session_id = %session_id,
            pending = session.pending_requests().len(),
            "Waiting for user input"
        );
        Ok(false)
    }

    async fn spawn_publish_loop(self: &Arc<Self>, slot: Arc<SessionSlot>) {
        let workflow = Arc::clone(self);
        let worker_slot = Arc::clone(&slot);
        let handle = tokio::spawn(async move {
            workflow.run_publish_loop(&worker_slot).await;
        });
        slot.track(handle).await;
    }

    async fn run_publish_loop(&self, slot: &Arc<SessionSlot>) {
        if let Err(e) = self.publish_until_settled(slot).await {
            let session_id = slot.lock().await.id.clone();
            tracing::error!(target: LOG_TARGET, session_id = %session_id, "Publish loop aborted: {}", e);
        }
    }

    /// Publishes until the session completes, fails, waits for corrections or leaves
    /// `Publishing` by external command.
    async fn publish_until_settled(&self, slot: &Arc<SessionSlot>) -> Result<()> {
        loop {
            let snapshot = {
                let mut session = slot.lock().await;
                if session.status() != SessionStatus::Publishing {
                    return Ok(());
                }
                let missing = session.missing_mandatory_fields(&self.catalogue);
                if !missing.is_empty() {
                    tracing::warn!(target: LOG_TARGET, session_id = %session.id, ?missing, "Not publishable, asking for obligatory fields");
                    session.reopen_fields(self.mandatory_requests(&missing));
                    session.transition_to(SessionStatus::WaitingUser)?;
                    return Ok(());
                }
                session.clone()
            };

            let outcome = self.orchestrator.publish(&snapshot).await;

            let (failed, error) = {
                let mut session = slot.lock().await;
                if session.status() != SessionStatus::Publishing {
                    tracing::info!(target: LOG_TARGET, session_id = %session.id, status = %session.status(), "Discarding publish result");
                    return Ok(());
                }
                let error = match outcome {
                    Ok(()) => {
                        session.transition_to(SessionStatus::Completed)?;
                        tracing::info!(target: LOG_TARGET, session_id = %session.id, attempts = session.retry_count + 1, "Release published");
                        return Ok(());
                    }
                    Err(error) => error,
                };

                session.record_publish_failure(&error)?;
                tracing::warn!(
                    target: LOG_TARGET,
                    session_id = %session.id,
                    step = error.step(),
                    attempt = session.retry_count,
                    "Publish attempt failed: {}",
                    error.message
                );
                if session.retry_count > self.options.max_retries {
                    session.transition_to(SessionStatus::Failed)?;
                    tracing::error!(target: LOG_TARGET, session_id = %session.id, "Giving up after {} failed attempts", session.retry_count);
                    return Ok(());
                }
                (session.clone(), error)
            };

            if !self.recover(slot, &failed, &error).await? {
                return Ok(());
            }

            let delay = retry_backoff(
                failed.retry_count,
                self.options.initial_backoff,
                self.options.max_backoff,
            );
            tracing::debug!(target: LOG_TARGET, session_id = %failed.id, ?delay, "Retrying with unchanged data");
            tokio::time::sleep(delay).await;
        }
    }

    /// Runs error recovery for a failed attempt. Returns `true` when the same payload
    /// should be submitted again.
    async fn recover(
        &self,
        slot: &Arc<SessionSlot>,
        failed: &ReleaseSession,
        error: &PublishError,
    ) -> Result<bool> {
        let corrections = self.recovery.analyze_error_or_fallback(failed, error).await;

        let mut session = slot.lock().await;
        if session.status() != SessionStatus::RetryNeeded {
            tracing::info!(target: LOG_TARGET, session_id = %session.id, status = %session.status(), "Discarding error recovery");
            return Ok(false);
        }

        if corrections.is_empty() {
            session.transition_to(SessionStatus::Publishing)?;
            return Ok(true);
        }

        let fields: Vec<String> = corrections.iter().map(|r| r.field.clone()).collect();
        session.reopen_fields(corrections);
        session.transition_to(SessionStatus::WaitingUser)?;
        tracing::info!(target: LOG_TARGET, session_id = %session.id, ?fields, "Asking for corrections");
        Ok(false)
    }
}
