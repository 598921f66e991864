//! Builds the workflow and its collaborators from the loaded configuration.

use std::sync::Arc;

use anyhow::Result;
use launchpad_application::{ReleaseWorkflow, WorkflowOptions};
use launchpad_core::{PublishTarget, TextGenerator};
use launchpad_infrastructure::{GeneratorBackend, LaunchpadConfig};
use launchpad_interaction::{
    ClaudeCliGenerator, ClaudeModel, CommandSourceCollector, DEFAULT_GEMINI_MODEL,
    DryRunPublishTarget, GeminiGenerator, HttpPublishTarget,
};

/// Installs the tracing subscriber. Logs go to stderr so the prompt stays readable.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "launchpad=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn build_workflow(config: &LaunchpadConfig) -> Result<Arc<ReleaseWorkflow>> {
    let mut builder = ReleaseWorkflow::builder(publish_target(config))
        .options(WorkflowOptions {
            max_retries: config.retry.max_retries,
            initial_backoff: config.retry.initial_backoff(),
            max_backoff: config.retry.max_backoff(),
        });

    if let Some(generator) = text_generator(config) {
        tracing::info!("Using classifier backend '{}'", generator.name());
        builder = builder.generator(generator);
    }

    match &config.source {
        Some(source) => {
            builder = builder.collector(Arc::new(
                CommandSourceCollector::new(source.command.clone()).with_args(source.args.clone()),
            ));
        }
        None => tracing::warn!("No [source] configured, sessions start without release data"),
    }

    Ok(builder.build()?)
}

fn text_generator(config: &LaunchpadConfig) -> Option<Arc<dyn TextGenerator>> {
    let generator = &config.generator;
    match generator.backend {
        GeneratorBackend::Gemini => {
            let api_key = generator.api_key.clone()?;
            let model = generator
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
            Some(Arc::new(GeminiGenerator::new(api_key, model)))
        }
        GeneratorBackend::ClaudeCli => {
            let mut cli = match &generator.claude_path {
                Some(path) => ClaudeCliGenerator::with_path(path.clone()),
                None => ClaudeCliGenerator::new(),
            };
            if let Some(model) = &generator.model {
                cli = cli.with_model(ClaudeModel::from_name(model));
            }
            Some(Arc::new(cli))
        }
        GeneratorBackend::None => None,
    }
}

fn publish_target(config: &LaunchpadConfig) -> Arc<dyn PublishTarget> {
    let publisher = &config.publisher;
    match (&publisher.endpoint, publisher.is_dry_run()) {
        (Some(endpoint), false) => {
            let mut target = HttpPublishTarget::new(endpoint.clone());
            if let Some(token) = &publisher.token {
                target = target.with_token(token.clone());
            }
            Arc::new(target)
        }
        _ => {
            tracing::info!("Publishing in dry-run mode");
            Arc::new(DryRunPublishTarget)
        }
    }
}
