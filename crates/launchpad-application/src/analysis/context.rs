//! Plain-text session context handed to the classifier.

use launchpad_core::ReleaseSession;
use std::fmt::Write;

/// Number of change records included in the context.
pub const RECENT_CHANGE_LIMIT: usize = 3;

/// Summarizes project metadata, release notes, suggested changelog, collected
/// answers and the most recent changes of `session`.
pub fn summarize(session: &ReleaseSession) -> String {
    let mut out = String::new();

    match session.release_data() {
        Some(data) => {
            let project = &data.project;
            let _ = writeln!(out, "Project: {} ({})", project.name, data.version);
            if let Some(description) = &project.description {
                let _ = writeln!(out, "Description: {description}");
            }
            if let Some(homepage) = &project.homepage {
                let _ = writeln!(out, "Homepage: {homepage}");
            }
            if !project.topics.is_empty() {
                let _ = writeln!(out, "Topics: {}", project.topics.join(", "));
            }
            if let Some(language) = &project.language {
                let _ = writeln!(out, "Language: {language}");
            }
            if let Some(notes) = &data.previous_release_notes {
                let _ = writeln!(out, "\nPrevious release notes:\n{}", notes.trim());
            }
            if let Some(notes) = &data.release_notes {
                let _ = writeln!(out, "\nRelease notes:\n{}", notes.trim());
            }
            if let Some(changelog) = &data.suggestions.whats_new {
                let _ = writeln!(out, "\nSuggested changelog:\n{}", changelog.trim());
            }

            let recent = data.recent_commits(RECENT_CHANGE_LIMIT);
            if !recent.is_empty() {
                out.push_str("\nRecent changes:\n");
                for commit in recent {
                    let sha: String = commit.sha.chars().take(7).collect();
                    let _ = writeln!(out, "- {sha} {}", commit.summary());
                }
            }
        }
        None => {
            let _ = writeln!(
                out,
                "Project: {} (no upstream release data is available)",
                session.project_ref
            );
        }
    }

    out.push_str("\nAlready collected:\n");
    if session.collected_responses().is_empty() {
        out.push_str("(nothing yet)\n");
    }
    for (field, value) in session.collected_responses() {
        let shown = if value.is_empty() { "(skipped)" } else { value };
        let _ = writeln!(out, "- {field}: {shown}");
    }

    out
}
