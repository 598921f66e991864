mod helper;
mod setup;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;

use helper::CliHelper;
use launchpad_application::ReleaseWorkflow;
use launchpad_core::{DataCollectionRequest, ReleaseSession, SessionStatus};
use launchpad_infrastructure::LaunchpadConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "launchpad")]
#[command(about = "Launchpad - publish a release to the app store step by step", long_about = None)]
struct Cli {
    /// Upstream project to release (passed to the source collector)
    #[arg(short, long)]
    project: String,

    /// Configuration file (defaults to ~/.config/launchpad/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User the session belongs to
    #[arg(short, long, default_value = "local")]
    user: String,
}

/// What the REPL does after handling one line of input.
enum Flow {
    Continue,
    Exit,
}

/// Runs one release session interactively:
/// 1. loads the configuration and wires the collaborators
/// 2. starts the session and waits for release data and the first questions
/// 3. asks each pending question until the session is published, fails or is cancelled
#[tokio::main]
async fn main() -> Result<()> {
    setup::init_tracing();
    let cli = Cli::parse();

    let config = LaunchpadConfig::load(cli.config.as_deref())?;
    config.validate()?;
    let workflow = setup::build_workflow(&config)?;

    println!("{}", "=== Launchpad ===".bright_magenta().bold());
    println!(
        "{}",
        "Answer each question, pick a suggestion by number, or use /status, /skip, /cancel, /quit."
            .bright_black()
    );
    println!();

    let session = workflow.start_session(&cli.user, "terminal", &cli.project).await;
    let session_id = session.id;
    println!("{}", format!("Collecting release data for {}...", cli.project).yellow());

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));
    let mut reported_failures = 0;

    loop {
        let session = workflow.settle(&session_id).await?;
        match session.status() {
            SessionStatus::Completed => {
                println!("{}", "Release published.".bright_green().bold());
                break;
            }
            SessionStatus::Failed => {
                let summary = session
                    .failure_summary()
                    .unwrap_or_else(|| "Publishing failed.".to_string());
                println!("{}", summary.red());
                break;
            }
            SessionStatus::Cancelled => {
                println!("{}", "Session cancelled.".yellow());
                break;
            }
            SessionStatus::WaitingUser => {}
            // Background work is still settling
            _ => {
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
        }

        if session.retry_count > reported_failures {
            reported_failures = session.retry_count;
            if let Some(summary) = session.failure_summary() {
                println!("{}", summary.red());
                println!("{}", "Please correct the following.".yellow());
            }
        }
        let Some(request) = session.pending_requests().first().cloned() else {
            continue;
        };
        print_request(&request, session.pending_requests().len());

        let prompt = format!("{}> ", request.field);
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = rl.add_history_entry(&line);
                }
                match handle_input(&workflow, &session, &request, trimmed).await? {
                    Flow::Continue => {}
                    Flow::Exit => break,
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}

async fn handle_input(
    workflow: &Arc<ReleaseWorkflow>,
    session: &ReleaseSession,
    request: &DataCollectionRequest,
    input: &str,
) -> Result<Flow> {
    let value = match input {
        helper::QUIT => {
            println!("{}", "Leaving the session as it is. Goodbye!".bright_green());
            return Ok(Flow::Exit);
        }
        helper::CANCEL => {
            workflow.cancel_session(&session.id).await?;
            return Ok(Flow::Continue);
        }
        helper::STATUS => {
            print_status(session);
            return Ok(Flow::Continue);
        }
        helper::SKIP => String::new(),
        other => pick_suggestion(request, other).unwrap_or_else(|| other.to_string()),
    };

    let result = workflow
        .process_user_response(&session.id, &request.field, &value)
        .await?;
    if result.valid {
        println!("{}", format!("✓ {}", request.display_name).green());
    } else {
        let message = result
            .error_message
            .unwrap_or_else(|| "Invalid value".to_string());
        println!("{}", message.red());
        for suggestion in &result.suggestions {
            println!("  {}", format!("- {}", suggestion).yellow());
        }
    }
    Ok(Flow::Continue)
}

/// A bare number selects one of the request's suggestions.
fn pick_suggestion(request: &DataCollectionRequest, input: &str) -> Option<String> {
    let index: usize = input.parse().ok()?;
    request.suggestions.get(index.checked_sub(1)?).cloned()
}

fn print_request(request: &DataCollectionRequest, remaining: usize) {
    println!();
    let marker = if request.required {
        "required".bright_red()
    } else {
        "optional, /skip to leave empty".bright_black()
    };
    println!(
        "{} {} ({} left)",
        request.display_name.bright_blue().bold(),
        format!("[{}]", marker),
        remaining
    );
    if !request.description.is_empty() {
        println!("{}", request.description.bright_black());
    }
    if !request.valid_values.is_empty() {
        println!("{}", format!("Allowed: {}", request.valid_values.join(", ")).bright_black());
    }
    for (i, suggestion) in request.suggestions.iter().enumerate() {
        let first_line = suggestion.lines().next().unwrap_or_default();
        println!("  {}", format!("{}. {}", i + 1, first_line).yellow());
    }
}

fn print_status(session: &ReleaseSession) {
    println!("{}", format!("Session {} [{}]", session.id, session.status()).bright_magenta());
    for (name, agent) in &session.agent_statuses {
        println!(
            "  {}",
            format!("{name}: {:?} {}% {}", agent.state, agent.progress, agent.message).bright_black()
        );
    }
    for (field, value) in session.collected_responses() {
        let shown = if value.is_empty() { "(skipped)" } else { value.as_str() };
        println!("  {}", format!("{field} = {shown}").green());
    }
    for request in session.pending_requests() {
        println!("  {}", format!("{} (pending)", request.field).yellow());
    }
    if let Some(summary) = session.failure_summary() {
        println!("  {}", summary.red());
    }
}
