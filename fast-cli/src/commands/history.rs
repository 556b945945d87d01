//! List completed fasts.

use anyhow::Result;
use chrono::{DateTime, Utc};
use fast_client::{FastingController, FastingStore};
use fast_types::{FastHistory, Time};
use std::fmt::Write;

/// Run the history command.
pub async fn run<S: FastingStore + 'static>(controller: &FastingController<S>) -> Result<()> {
    let entries = controller.history().await?;
    print!("{}", render(&entries));
    Ok(())
}

/// One line per entry, oldest first, reflections indented below.
pub fn render(entries: &[FastHistory]) -> String {
    if entries.is_empty() {
        return "No completed fasts yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "=== {} completed fasts ===", entries.len());
    for entry in entries {
        let _ = writeln!(
            out,
            "{}  {}h of {}h",
            format_time(entry.end_time),
            entry.duration_hours(),
            entry.goal_hours
        );
        if !entry.reflection_journal.is_empty() {
            let _ = writeln!(out, "    {}", entry.reflection_journal);
        }
    }
    out
}

/// Format a store time as a UTC date and minute.
pub fn format_time(time: Time) -> String {
    i64::try_from(time.as_secs())
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown time".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(start_secs: u64, hours: u64, goal: u32, reflection: &str) -> FastHistory {
        let start = Time::from_secs(start_secs);
        let end = start.plus(Duration::from_secs(hours * 3600));
        FastHistory {
            start_time: start,
            end_time: end,
            goal_hours: goal,
            timestamp: end,
            reflection_journal: reflection.to_string(),
        }
    }

    #[test]
    fn empty_history() {
        assert_eq!(render(&[]), "No completed fasts yet.\n");
    }

    #[test]
    fn format_time_is_utc() {
        assert_eq!(format_time(Time::from_secs(0)), "1970-01-01 00:00 UTC");
        assert_eq!(
            format_time(Time::from_secs(1_700_000_000)),
            "2023-11-14 22:13 UTC"
        );
    }

    #[test]
    fn renders_entries_in_order() {
        let text = render(&[
            entry(1_700_000_000, 8, 8, "Grateful"),
            entry(1_700_100_000, 3, 12, ""),
        ]);

        assert!(text.starts_with("=== 2 completed fasts ==="));
        let first = text.find("8h of 8h").unwrap();
        let second = text.find("3h of 12h").unwrap();
        assert!(first < second);
        assert!(text.contains("    Grateful"));
    }
}
