//! Daily reminder preferences.

use anyhow::Result;
use std::path::Path;

use crate::config::ReminderSettings;

/// Requested changes to the reminder settings.
#[derive(Debug, Default, Clone)]
pub struct ReminderChange {
    /// Turn the reminder on (`Some(true)`) or off (`Some(false)`).
    pub enabled: Option<bool>,
    /// New time of day, `HH:MM`.
    pub time: Option<String>,
}

/// Run the reminders command.
///
/// Without changes, prints the current settings.
pub async fn run(data_dir: &Path, change: ReminderChange) -> Result<ReminderSettings> {
    let mut settings = ReminderSettings::load(data_dir).await?;

    let changed = change.enabled.is_some() || change.time.is_some();
    if let Some(enabled) = change.enabled {
        settings.enabled = enabled;
    }
    if let Some(time) = &change.time {
        settings.set_time(time)?;
    }
    if changed {
        settings.save(data_dir).await?;
    }

    if settings.enabled {
        println!("Daily reminder: on at {}", settings.time);
    } else {
        println!("Daily reminder: off (time {})", settings.time);
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn shows_defaults_without_writing() {
        let dir = tempdir().unwrap();
        let settings = run(dir.path(), ReminderChange::default()).await.unwrap();

        assert_eq!(settings, ReminderSettings::default());
        assert!(!dir.path().join("reminders.json").exists());
    }

    #[tokio::test]
    async fn enable_with_time_persists() {
        let dir = tempdir().unwrap();
        run(
            dir.path(),
            ReminderChange {
                enabled: Some(true),
                time: Some("07:15".to_string()),
            },
        )
        .await
        .unwrap();

        let loaded = ReminderSettings::load(dir.path()).await.unwrap();
        assert!(loaded.enabled);
        assert_eq!(loaded.time, "07:15");
    }

    #[tokio::test]
    async fn invalid_time_changes_nothing() {
        let dir = tempdir().unwrap();
        let result = run(
            dir.path(),
            ReminderChange {
                enabled: Some(true),
                time: Some("7pm".to_string()),
            },
        )
        .await;

        assert!(result.is_err());
        assert!(!dir.path().join("reminders.json").exists());
    }

    #[tokio::test]
    async fn disable_keeps_time() {
        let dir = tempdir().unwrap();
        run(
            dir.path(),
            ReminderChange {
                enabled: Some(true),
                time: Some("21:00".to_string()),
            },
        )
        .await
        .unwrap();

        let settings = run(
            dir.path(),
            ReminderChange {
                enabled: Some(false),
                time: None,
            },
        )
        .await
        .unwrap();

        assert!(!settings.enabled);
        assert_eq!(settings.time, "21:00");
    }
}
