//! Show the current fast.

use anyhow::Result;
use fast_client::{FastingController, FastingStore, SessionSnapshot};
use fast_core::{FastProgress, FastState};
use fast_types::FastingContent;
use serde::Serialize;
use std::fmt::Write;

const BAR_WIDTH: usize = 20;

/// JSON shape of `status --json`.
#[derive(Debug, Serialize)]
struct StatusJson<'a> {
    session: &'a fast_types::FastingSession,
    stale: bool,
    progress: Option<FastProgress>,
}

/// Run the status command.
pub async fn run<S: FastingStore + 'static>(
    controller: &FastingController<S>,
    json: bool,
) -> Result<()> {
    let snapshot = controller.refresh_progress().await?;
    let progress = controller.progress().await?;

    if json {
        let out = StatusJson {
            session: &snapshot.session,
            stale: snapshot.stale,
            progress,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let content = controller.content().await?;
    print!("{}", render(&snapshot, progress.as_ref(), content));
    Ok(())
}

/// Human-readable status of `snapshot`.
pub fn render(
    snapshot: &SessionSnapshot,
    progress: Option<&FastProgress>,
    content: &FastingContent,
) -> String {
    let mut out = String::new();

    match (&snapshot.state, progress) {
        (FastState::InProgress { .. }, Some(p)) => {
            let _ = writeln!(out, "Fasting: {} / {}h", p.elapsed, p.goal_hours);
            let _ = writeln!(out, "{} {:.0}%", bar(p.percent), p.percent);
            if p.goal_reached {
                let _ = writeln!(out, "Goal reached! Complete with: unplugged complete");
            }
            if let Some(message) = p.encouragement_index.and_then(|i| content.encouragement(i)) {
                let _ = writeln!(out);
                let _ = writeln!(out, "{message}");
            }
        }
        (FastState::Completed, _) => {
            let _ = writeln!(
                out,
                "Last fast completed (goal {}h).",
                snapshot.session.goal_hours
            );
            if !snapshot.session.reflection_journal.is_empty() {
                let _ = writeln!(out, "Reflection: {}", snapshot.session.reflection_journal);
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", content.completion_encouragement);
        }
        _ => {
            let _ = writeln!(out, "No fast in progress.");
            let _ = writeln!(out, "Start one with: unplugged start --goal <hours>");
        }
    }

    if !content.scripture_references.is_empty() {
        let refs: Vec<String> = content
            .scripture_references
            .iter()
            .map(ToString::to_string)
            .collect();
        let _ = writeln!(out);
        let _ = writeln!(out, "Scripture: {}", refs.join("; "));
    }

    if snapshot.stale {
        let _ = writeln!(out, "(store unreachable: showing last known state)");
    }
    out
}

fn bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}
