//! End-to-end scenarios for the release workflow with in-memory collaborators.

use async_trait::async_trait;
use launchpad_application::{ReleaseWorkflow, WorkflowOptions};
use launchpad_core::release::{ProjectMetadata, ReleaseData};
use launchpad_core::session::{AgentState, SOURCE_AGENT};
use launchpad_core::{
    CollaboratorError, ProgressSink, PublishError, PublishPayload, PublishTarget, ReleaseSession,
    SessionStatus, SourceCollector, TextGenerator, fields,
};
use launchpad_interaction::ScriptedGenerator;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

const MANDATORY_ANSWERS: [(&str, &str); 4] = [
    (fields::APP_NAME, "Notes"),
    (fields::APP_TYPE, "main"),
    (fields::CATEGORIES, "productivity"),
    (fields::AGE_LEGAL, "0+"),
];

/// Publish target replaying queued outcomes; succeeds once the queue is empty.
#[derive(Default)]
struct ScriptedTarget {
    outcomes: Mutex<VecDeque<Result<(), PublishError>>>,
    payloads: Mutex<Vec<PublishPayload>>,
    gate: Option<Arc<Semaphore>>,
    entered: AtomicUsize,
}

impl ScriptedTarget {
    fn with_outcomes(outcomes: Vec<Result<(), PublishError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Default::default()
        })
    }

    /// Every publish call blocks until a permit is added to `gate`.
    fn gated(gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            gate: Some(gate),
            ..Default::default()
        })
    }

    /// Gated target replaying `outcomes`.
    fn gated_with_outcomes(
        gate: Arc<Semaphore>,
        outcomes: Vec<Result<(), PublishError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            gate: Some(gate),
            ..Default::default()
        })
    }

    fn payloads(&self) -> Vec<PublishPayload> {
        self.payloads.lock().unwrap().clone()
    }

    /// Yields until `count` publish calls have started.
    async fn wait_entered(&self, count: usize) {
        while self.entered.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl PublishTarget for ScriptedTarget {
    async fn publish(&self, payload: &PublishPayload) -> Result<(), PublishError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.payloads.lock().unwrap().push(payload.clone());
        self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

struct StaticCollector {
    data: Option<ReleaseData>,
}

#[async_trait]
impl SourceCollector for StaticCollector {
    async fn collect(
        &self,
        _project_ref: &str,
        progress: &dyn ProgressSink,
    ) -> Result<ReleaseData, CollaboratorError> {
        progress.report(50, "Reading release").await;
        self.data
            .clone()
            .ok_or_else(|| CollaboratorError::Unavailable("repository not reachable".to_string()))
    }
}

fn fast_retries(max_retries: u32) -> WorkflowOptions {
    WorkflowOptions {
        max_retries,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    }
}

fn release_data() -> ReleaseData {
    ReleaseData {
        project: ProjectMetadata {
            name: "notes-app".to_string(),
            description: Some("Fast offline notes".to_string()),
            ..Default::default()
        },
        version: "v1.4.0".to_string(),
        release_notes: Some("Dark mode".to_string()),
        previous_release_notes: None,
        commits: Vec::new(),
        assets: Vec::new(),
        suggestions: Default::default(),
    }
}

fn assert_disjoint(session: &ReleaseSession) {
    for request in session.pending_requests() {
        assert!(
            !session.collected_responses().contains_key(&request.field),
            "{} is both pending and collected",
            request.field
        );
    }
}

fn pending_fields(session: &ReleaseSession) -> Vec<&str> {
    session
        .pending_requests()
        .iter()
        .map(|r| r.field.as_str())
        .collect()
}

async fn start_waiting(workflow: &Arc<ReleaseWorkflow>) -> String {
    let id = workflow.start_session("user-1", "chat-1", "acme/notes").await.id;
    let session = workflow.settle(&id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::WaitingUser);
    assert_disjoint(&session);
    id
}

async fn answer_all(workflow: &Arc<ReleaseWorkflow>, id: &str, answers: &[(&str, &str)]) {
    for (field, value) in answers {
        let result = workflow.process_user_response(id, field, value).await.unwrap();
        assert!(result.valid, "{field}: {:?}", result.error_message);
        assert_disjoint(&workflow.get_session(id).await.unwrap());
    }
}

#[tokio::test]
async fn test_no_upstream_data_falls_back_to_mandatory_fields_then_publishes() {
    let gate = Arc::new(Semaphore::new(0));
    let target = ScriptedTarget::gated(Arc::clone(&gate));
    let workflow = ReleaseWorkflow::builder(target.clone()).build().unwrap();

    let id = start_waiting(&workflow).await;
    let session = workflow.get_session(&id).await.unwrap();
    assert_eq!(
        pending_fields(&session),
        vec![fields::APP_NAME, fields::APP_TYPE, fields::CATEGORIES, fields::AGE_LEGAL]
    );
    assert!(session.pending_requests().iter().all(|r| r.required));
    assert_eq!(session.agent_statuses[SOURCE_AGENT].state, AgentState::Failed);
    assert!(!workflow.is_ready_for_publishing(&id).await.unwrap());

    answer_all(&workflow, &id, &MANDATORY_ANSWERS).await;

    let session = workflow.get_session(&id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Publishing);
    assert!(session.pending_requests().is_empty());
    assert!(workflow.is_ready_for_publishing(&id).await.unwrap());

    gate.add_permits(1);
    let session = workflow.settle(&id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Completed);

    let payloads = target.payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].app_name, "Notes");
    assert_eq!(payloads[0].app_type, "MAIN");
}

#[tokio::test]
async fn test_naming_error_asks_for_app_name_only() {
    let target = ScriptedTarget::with_outcomes(vec![Err(PublishError::at_step(
        "create_draft",
        "Application name is already taken",
    ))]);
    let workflow = ReleaseWorkflow::builder(target.clone()).build().unwrap();

    let id = start_waiting(&workflow).await;
    answer_all(&workflow, &id, &MANDATORY_ANSWERS).await;
    let session = workflow.settle(&id).await.unwrap();

    assert_eq!(session.status(), SessionStatus::WaitingUser);
    assert_eq!(pending_fields(&session), vec![fields::APP_NAME]);
    let request = &session.pending_requests()[0];
    assert!(request.required);
    assert_eq!(request.suggestions.first().map(String::as_str), Some("Notes"));
    assert_eq!(session.retry_count, 1);
    assert_eq!(session.failed_at_step.as_deref(), Some("create_draft"));
    assert_eq!(
        session.failure_summary().as_deref(),
        Some("Publishing failed at step 'create_draft' (attempt 1): Application name is already taken")
    );
    assert_disjoint(&session);

    // A new name is a fresh completion and goes out with the corrected value
    answer_all(&workflow, &id, &[(fields::APP_NAME, "Notes Pro")]).await;
    let session = workflow.settle(&id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Completed);
    let payloads = target.payloads();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[1].app_name, "Notes Pro");
}

#[tokio::test]
async fn test_unattributable_error_retries_with_identical_payload() {
    let target = ScriptedTarget::with_outcomes(vec![Err(PublishError::at_step(
        "upload",
        "Gateway timeout",
    ))]);
    let workflow = ReleaseWorkflow::builder(target.clone())
        .options(fast_retries(3))
        .build()
        .unwrap();

    let id = start_waiting(&workflow).await;
    answer_all(&workflow, &id, &MANDATORY_ANSWERS).await;
    let session = workflow.settle(&id).await.unwrap();

    assert_eq!(session.status(), SessionStatus::Completed);
    assert_eq!(session.retry_count, 1);
    let payloads = target.payloads();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0], payloads[1]);
}

#[tokio::test]
async fn test_retry_cap_fails_the_session() {
    let failure = || Err(PublishError::new("Service unavailable"));
    let target = ScriptedTarget::with_outcomes(vec![failure(), failure(), failure(), failure()]);
    let workflow = ReleaseWorkflow::builder(target.clone())
        .options(fast_retries(2))
        .build()
        .unwrap();

    let id = start_waiting(&workflow).await;
    answer_all(&workflow, &id, &MANDATORY_ANSWERS).await;
    let session = workflow.settle(&id).await.unwrap();

    assert_eq!(session.status(), SessionStatus::Failed);
    assert_eq!(session.retry_count, 3);
    assert_eq!(target.payloads().len(), 3);
    assert_eq!(session.last_error.as_deref(), Some("Service unavailable"));
}

#[tokio::test]
async fn test_reconfirmed_data_skips_requirement_analysis() {
    let generator = Arc::new(ScriptedGenerator::with_replies([
        r#"{"fields": [
            {"field": "app_name", "reason": "Store listing title", "priority": "high", "suggested_values": ["Notes"]},
            {"field": "app_type", "reason": "Section", "priority": "high"},
            {"field": "categories", "reason": "Browse placement", "priority": "high"},
            {"field": "age_legal", "reason": "Rating", "priority": "high"}
        ]}"#,
        r#"```json
{"fields": [{"field": "app_name", "issue": "The store reports the name as taken"}]}
```"#,
    ]));
    let target = ScriptedTarget::with_outcomes(vec![Err(PublishError::new(
        "Application name is already taken",
    ))]);
    let workflow = ReleaseWorkflow::builder(target.clone())
        .generator(generator.clone() as Arc<dyn TextGenerator>)
        .build()
        .unwrap();

    let id = start_waiting(&workflow).await;
    assert_eq!(generator.call_count(), 1);
    answer_all(&workflow, &id, &MANDATORY_ANSWERS).await;

    let session = workflow.settle(&id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::WaitingUser);
    assert_eq!(pending_fields(&session), vec![fields::APP_NAME]);
    assert!(
        session.pending_requests()[0]
            .description
            .contains("Issue: The store reports the name as taken")
    );
    assert_eq!(generator.call_count(), 2);

    // Resubmitting the value of the failed attempt publishes without asking the classifier
    answer_all(&workflow, &id, &[(fields::APP_NAME, "Notes")]).await;
    let session = workflow.settle(&id).await.unwrap();

    assert_eq!(session.status(), SessionStatus::Completed);
    assert_eq!(generator.call_count(), 2);
    let payloads = target.payloads();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0], payloads[1]);
}

#[tokio::test]
async fn test_collected_release_data_is_used() {
    let target = ScriptedTarget::with_outcomes(Vec::new());
    let workflow = ReleaseWorkflow::builder(target.clone())
        .collector(Arc::new(StaticCollector {
            data: Some(release_data()),
        }))
        .build()
        .unwrap();

    let id = start_waiting(&workflow).await;
    let session = workflow.get_session(&id).await.unwrap();

    assert_eq!(session.agent_statuses[SOURCE_AGENT].state, AgentState::Completed);
    assert_eq!(session.agent_statuses[SOURCE_AGENT].progress, 100);
    assert_eq!(
        pending_fields(&session),
        vec![
            fields::APP_NAME,
            fields::APP_TYPE,
            fields::CATEGORIES,
            fields::AGE_LEGAL,
            fields::WHATS_NEW,
            fields::SHORT_DESCRIPTION
        ]
    );
    assert_eq!(session.pending_requests()[0].suggestions, vec!["notes-app"]);

    answer_all(&workflow, &id, &MANDATORY_ANSWERS).await;
    // Optional questions can be skipped with an empty answer
    answer_all(&workflow, &id, &[(fields::WHATS_NEW, ""), (fields::SHORT_DESCRIPTION, "")]).await;
    let session = workflow.settle(&id).await.unwrap();

    assert_eq!(session.status(), SessionStatus::Completed);
    let payload = &target.payloads()[0];
    assert_eq!(payload.version.as_deref(), Some("v1.4.0"));
    assert_eq!(payload.whats_new.as_deref(), Some("Dark mode"));
}

#[tokio::test]
async fn test_failed_collection_continues_degraded() {
    let workflow = ReleaseWorkflow::builder(ScriptedTarget::with_outcomes(Vec::new()))
        .collector(Arc::new(StaticCollector { data: None }))
        .build()
        .unwrap();

    let id = start_waiting(&workflow).await;
    let session = workflow.get_session(&id).await.unwrap();

    let source = &session.agent_statuses[SOURCE_AGENT];
    assert_eq!(source.state, AgentState::Failed);
    assert!(source.message.contains("repository not reachable"));
    assert!(session.release_data().is_none());
    assert_eq!(session.pending_requests().len(), 4);
}

#[tokio::test]
async fn test_invalid_value_changes_nothing() {
    let workflow = ReleaseWorkflow::builder(ScriptedTarget::with_outcomes(Vec::new()))
        .build()
        .unwrap();
    let id = start_waiting(&workflow).await;
    let before = workflow.get_session(&id).await.unwrap();

    let result = workflow
        .process_user_response(&id, fields::APP_TYPE, "utilities")
        .await
        .unwrap();

    assert!(!result.valid);
    assert_eq!(result.suggestions, vec!["GAMES", "MAIN"]);
    let after = workflow.get_session(&id).await.unwrap();
    assert_eq!(after.pending_requests(), before.pending_requests());
    assert_eq!(after.collected_responses(), before.collected_responses());
}

#[tokio::test]
async fn test_caller_misuse_is_surfaced() {
    let workflow = ReleaseWorkflow::builder(ScriptedTarget::with_outcomes(Vec::new()))
        .build()
        .unwrap();
    let id = start_waiting(&workflow).await;

    let err = workflow
        .process_user_response(&id, fields::PRICE, "100")
        .await
        .unwrap_err();
    assert!(err.is_unknown_field());

    let err = workflow
        .process_user_response("missing-session", fields::APP_NAME, "Notes")
        .await
        .unwrap_err();
    assert!(err.is_session_not_found());
    assert!(workflow.get_session("missing-session").await.unwrap_err().is_session_not_found());
}

#[tokio::test]
async fn test_cancel_during_publish_discards_result() {
    let gate = Arc::new(Semaphore::new(0));
    let target = ScriptedTarget::gated(Arc::clone(&gate));
    let workflow = ReleaseWorkflow::builder(target.clone()).build().unwrap();

    let id = start_waiting(&workflow).await;
    answer_all(&workflow, &id, &MANDATORY_ANSWERS).await;
    target.wait_entered(1).await;

    let cancelled = workflow.cancel_session(&id).await.unwrap();
    assert_eq!(cancelled.status(), SessionStatus::Cancelled);

    gate.add_permits(1);
    let session = workflow.settle(&id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Cancelled);
    assert_eq!(target.payloads().len(), 1);

    let err = workflow.cancel_session(&id).await.unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn test_list_and_remove_sessions() {
    let workflow = ReleaseWorkflow::builder(ScriptedTarget::with_outcomes(Vec::new()))
        .build()
        .unwrap();
    let first = start_waiting(&workflow).await;
    let second = start_waiting(&workflow).await;

    let ids: Vec<String> = workflow.list_sessions().await.into_iter().map(|s| s.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first) && ids.contains(&second));

    let removed = workflow.remove_session(&first).await.unwrap();
    assert_eq!(removed.status(), SessionStatus::Cancelled);
    assert_eq!(workflow.list_sessions().await.len(), 1);
    assert!(workflow.get_session(&first).await.unwrap_err().is_session_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_are_independent() {
    let workflow = ReleaseWorkflow::builder(ScriptedTarget::with_outcomes(Vec::new()))
        .build()
        .unwrap();

    let mut handles = Vec::new();
    for user in 0..8 {
        let workflow = Arc::clone(&workflow);
        handles.push(tokio::spawn(async move {
            let id = workflow
                .start_session(&format!("user-{user}"), "chat", "acme/notes")
                .await
                .id;
            workflow.settle(&id).await.unwrap();
            for (field, value) in MANDATORY_ANSWERS {
                workflow.process_user_response(&id, field, value).await.unwrap();
            }
            workflow.settle(&id).await.unwrap()
        }));
    }

    for handle in handles {
        let session = handle.await.unwrap();
        assert_eq!(session.status(), SessionStatus::Completed);
    }
}

#[tokio::test]
async fn test_snake_case_key_in_error_asks_for_that_field() {
    let target = ScriptedTarget::with_outcomes(vec![Err(PublishError::new(
        "app_type must be GAMES or MAIN",
    ))]);
    let workflow = ReleaseWorkflow::builder(target.clone())
        .options(fast_retries(2))
        .build()
        .unwrap();

    let id = start_waiting(&workflow).await;
    answer_all(&workflow, &id, &MANDATORY_ANSWERS).await;
    let session = workflow.settle(&id).await.unwrap();

    assert_eq!(session.status(), SessionStatus::WaitingUser);
    assert_eq!(pending_fields(&session), vec![fields::APP_TYPE]);
    assert_eq!(target.payloads().len(), 1);

    answer_all(&workflow, &id, &[(fields::APP_TYPE, "games")]).await;
    let session = workflow.settle(&id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Completed);
    let payloads = target.payloads();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[1].app_type, "GAMES");
}

#[tokio::test]
async fn test_caller_cannot_complete_while_publish_in_flight() {
    let gate = Arc::new(Semaphore::new(0));
    let target = ScriptedTarget::gated_with_outcomes(
        Arc::clone(&gate),
        vec![Err(PublishError::at_step("upload", "Gateway timeout"))],
    );
    let workflow = ReleaseWorkflow::builder(target.clone())
        .options(fast_retries(3))
        .build()
        .unwrap();

    let id = start_waiting(&workflow).await;
    answer_all(&workflow, &id, &MANDATORY_ANSWERS).await;
    target.wait_entered(1).await;

    let err = workflow
        .complete_session(&id, SessionStatus::Completed)
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
    assert_eq!(
        workflow.get_session(&id).await.unwrap().status(),
        SessionStatus::Publishing
    );

    // The first attempt fails, so completion needs the identical retry to succeed
    gate.add_permits(2);
    let session = workflow.settle(&id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Completed);
    assert_eq!(session.retry_count, 1);
    assert_eq!(target.payloads().len(), 2);
}

#[tokio::test]
async fn test_caller_fail_during_publish_discards_the_attempt() {
    let gate = Arc::new(Semaphore::new(0));
    let target = ScriptedTarget::gated(Arc::clone(&gate));
    let workflow = ReleaseWorkflow::builder(target.clone()).build().unwrap();

    let id = start_waiting(&workflow).await;
    answer_all(&workflow, &id, &MANDATORY_ANSWERS).await;
    target.wait_entered(1).await;

    let session = workflow
        .complete_session(&id, SessionStatus::Failed)
        .await
        .unwrap();
    assert_eq!(session.status(), SessionStatus::Failed);

    gate.add_permits(1);
    let session = workflow.settle(&id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Failed);
    assert_eq!(target.payloads().len(), 1);
}

#[tokio::test]
async fn test_caller_cannot_enter_workflow_owned_statuses() {
    let target = ScriptedTarget::with_outcomes(Vec::new());
    let workflow = ReleaseWorkflow::builder(target.clone()).build().unwrap();
    let id = start_waiting(&workflow).await;

    for status in [
        SessionStatus::Active,
        SessionStatus::WaitingUser,
        SessionStatus::Publishing,
        SessionStatus::RetryNeeded,
        SessionStatus::Completed,
        // Only a publish attempt can fail
        SessionStatus::Failed,
    ] {
        let err = workflow.complete_session(&id, status).await.unwrap_err();
        assert!(err.is_invalid_transition(), "{status}: {err}");
    }

    let session = workflow.settle(&id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::WaitingUser);
    assert_eq!(session.pending_requests().len(), 4);
    assert!(target.payloads().is_empty());

    // The session still makes progress through answers
    answer_all(&workflow, &id, &MANDATORY_ANSWERS).await;
    let session = workflow.settle(&id).await.unwrap();
    assert_eq!(session.status(), SessionStatus::Completed);
    assert_eq!(target.payloads().len(), 1);
}
