//! PublishOrchestrator - builds the store payload and hands it to the publish target.

use launchpad_core::{
    FieldCatalogue, LaunchpadError, PublishError, PublishPayload, PublishTarget, ReleaseSession,
    fields,
};
use std::sync::Arc;

/// Step reported when the payload cannot be assembled.
pub const BUILD_PAYLOAD_STEP: &str = "build_payload";

pub struct PublishOrchestrator {
    target: Arc<dyn PublishTarget>,
    catalogue: FieldCatalogue,
}

impl PublishOrchestrator {
    pub fn new(target: Arc<dyn PublishTarget>, catalogue: FieldCatalogue) -> Self {
        Self { target, catalogue }
    }

    /// Merges release data and collected answers into a store payload.
    ///
    /// Collected answers always win over upstream suggestions. Skipped answers count
    /// as absent. Fails with `NotReady` while an obligatory field has no value.
    pub fn build_payload(&self, session: &ReleaseSession) -> Result<PublishPayload, LaunchpadError> {
        let missing = session.missing_mandatory_fields(&self.catalogue);
        if !missing.is_empty() {
            return Err(LaunchpadError::NotReady {
                session_id: session.id.clone(),
                missing: missing.into_iter().map(str::to_string).collect(),
            });
        }

        let data = session.release_data();
        let hints = data.map(|d| &d.suggestions);
        let project = data.map(|d| &d.project);
        let answer = |field: &str| session.response(field).map(str::to_string);

        let price = answer(fields::PRICE).and_then(|raw| match raw.parse::<i64>() {
            Ok(price) => Some(price),
            Err(err) => {
                tracing::warn!(session_id = %session.id, value = %raw, error = %err, "Dropping unparsable price");
                None
            }
        });

        Ok(PublishPayload {
            app_name: answer(fields::APP_NAME).unwrap_or_default(),
            app_type: self.canonical(fields::APP_TYPE, session),
            categories: answer(fields::CATEGORIES)
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            age_legal: self.canonical(fields::AGE_LEGAL, session),
            version: data.map(|d| d.version.clone()),
            short_description: answer(fields::SHORT_DESCRIPTION)
                .or_else(|| hints.and_then(|h| h.short_description.clone())),
            full_description: answer(fields::FULL_DESCRIPTION)
                .or_else(|| hints.and_then(|h| h.full_description.clone()))
                .or_else(|| project.and_then(|p| p.description.clone())),
            whats_new: answer(fields::WHATS_NEW)
                .or_else(|| hints.and_then(|h| h.whats_new.clone()))
                .or_else(|| data.and_then(|d| d.release_notes.clone())),
            moderator_comment: answer(fields::MODERATOR_COMMENT),
            price,
            website: answer(fields::WEBSITE).or_else(|| project.and_then(|p| p.homepage.clone())),
            artifact_url: data
                .and_then(|d| d.primary_asset())
                .map(|asset| asset.download_url.clone()),
        })
    }

    /// Submits the session's payload. Target errors are returned unchanged.
    pub async fn publish(&self, session: &ReleaseSession) -> Result<(), PublishError> {
        let payload = self
            .build_payload(session)
            .map_err(|err| PublishError::at_step(BUILD_PAYLOAD_STEP, err.to_string()))?;

        tracing::info!(
            session_id = %session.id,
            app = %payload.app_name,
            attempt = session.retry_count + 1,
            "Publishing release"
        );
        self.target.publish(&payload).await
    }

    /// Enum answers are stored as typed; the payload carries the catalogue spelling.
    fn canonical(&self, field: &str, session: &ReleaseSession) -> String {
        let value = session.response(field).unwrap_or_default();
        self.catalogue
            .lookup(field)
            .and_then(|spec| {
                spec.valid_values
                    .iter()
                    .find(|candidate| candidate.eq_ignore_ascii_case(value))
            })
            .map(|canonical| canonical.to_string())
            .unwrap_or_else(|| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use launchpad_core::SessionStatus;
    use launchpad_core::release::{ProjectMetadata, ReleaseAsset, ReleaseData, ReleaseSuggestions};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTarget {
        payloads: Mutex<Vec<PublishPayload>>,
        failure: Option<PublishError>,
    }

    #[async_trait]
    impl PublishTarget for RecordingTarget {
        async fn publish(&self, payload: &PublishPayload) -> Result<(), PublishError> {
            self.payloads.lock().unwrap().push(payload.clone());
            match &self.failure {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    fn session_with(answers: &[(&str, &str)], data: Option<ReleaseData>) -> ReleaseSession {
        let catalogue = FieldCatalogue::store();
        let mut session = ReleaseSession::new("u", "c", "acme/notes");
        if let Some(data) = data {
            session.attach_release_data(data);
        }
        session.install_requests(
            answers
                .iter()
                .map(|(field, _)| catalogue.request_for(field, false))
                .collect(),
        );
        session.transition_to(SessionStatus::WaitingUser).unwrap();
        for (field, value) in answers {
            assert!(session.accept_response(field, value).unwrap().valid, "{field}");
        }
        session
    }

    fn mandatory_answers() -> Vec<(&'static str, &'static str)> {
        vec![
            (fields::APP_NAME, "Notes"),
            (fields::APP_TYPE, "main"),
            (fields::CATEGORIES, "productivity, tools"),
            (fields::AGE_LEGAL, "12+"),
        ]
    }

    fn release_data() -> ReleaseData {
        ReleaseData {
            project: ProjectMetadata {
                name: "notes-app".to_string(),
                description: Some("Fast offline notes".to_string()),
                homepage: Some("https://notes.example.com".to_string()),
                ..Default::default()
            },
            version: "v1.4.0".to_string(),
            release_notes: Some("Dark mode".to_string()),
            previous_release_notes: None,
            commits: Vec::new(),
            assets: vec![
                ReleaseAsset {
                    name: "checksums.txt".to_string(),
                    download_url: "https://cdn.example.com/checksums.txt".to_string(),
                    size_bytes: 120,
                },
                ReleaseAsset {
                    name: "notes.apk".to_string(),
                    download_url: "https://cdn.example.com/notes.apk".to_string(),
                    size_bytes: 4_000_000,
                },
            ],
            suggestions: ReleaseSuggestions {
                whats_new: Some("Suggested changelog".to_string()),
                ..Default::default()
            },
        }
    }

    fn orchestrator(target: Arc<RecordingTarget>) -> PublishOrchestrator {
        PublishOrchestrator::new(target, FieldCatalogue::store())
    }

    #[test]
    fn test_build_payload_merges_answers_over_suggestions() {
        let mut answers = mandatory_answers();
        answers.push((fields::WHATS_NEW, "Typed by the user"));
        answers.push((fields::PRICE, "199"));
        let session = session_with(&answers, Some(release_data()));

        let payload = orchestrator(Arc::default()).build_payload(&session).unwrap();

        assert_eq!(payload.app_name, "Notes");
        assert_eq!(payload.app_type, "MAIN");
        assert_eq!(payload.categories, vec!["productivity", "tools"]);
        assert_eq!(payload.age_legal, "12+");
        assert_eq!(payload.version.as_deref(), Some("v1.4.0"));
        assert_eq!(payload.whats_new.as_deref(), Some("Typed by the user"));
        assert_eq!(payload.full_description.as_deref(), Some("Fast offline notes"));
        assert_eq!(payload.website.as_deref(), Some("https://notes.example.com"));
        assert_eq!(payload.price, Some(199));
        assert_eq!(
            payload.artifact_url.as_deref(),
            Some("https://cdn.example.com/notes.apk")
        );
    }

    #[test]
    fn test_build_payload_uses_suggestions_when_not_collected() {
        let session = session_with(&mandatory_answers(), Some(release_data()));
        let payload = orchestrator(Arc::default()).build_payload(&session).unwrap();
        assert_eq!(payload.whats_new.as_deref(), Some("Suggested changelog"));
        assert_eq!(payload.price, None);
    }

    #[test]
    fn test_build_payload_not_ready() {
        let session = session_with(&[(fields::APP_NAME, "Notes")], None);
        let err = orchestrator(Arc::default()).build_payload(&session).unwrap_err();
        match err {
            LaunchpadError::NotReady { missing, .. } => {
                assert_eq!(missing, vec!["app_type", "categories", "age_legal"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_returns_target_error_verbatim() {
        let failure = PublishError::at_step("create_draft", "appName already exists");
        let target = Arc::new(RecordingTarget {
            failure: Some(failure.clone()),
            ..Default::default()
        });
        let session = session_with(&mandatory_answers(), None);

        let err = orchestrator(target.clone()).publish(&session).await.unwrap_err();

        assert_eq!(err, failure);
        assert_eq!(target.payloads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_not_ready_never_reaches_target() {
        let target = Arc::new(RecordingTarget::default());
        let session = session_with(&[(fields::APP_NAME, "Notes")], None);

        let err = orchestrator(target.clone()).publish(&session).await.unwrap_err();

        assert_eq!(err.step(), BUILD_PAYLOAD_STEP);
        assert!(target.payloads.lock().unwrap().is_empty());
    }
}
