//! Local configuration for the unplugged CLI.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use fast_types::UserId;
use serde::{Deserialize, Serialize};
use std::path::Path;

const USER_FILE: &str = "user.json";
const REMINDERS_FILE: &str = "reminders.json";

/// Format of reminder times.
pub const REMINDER_TIME_FORMAT: &str = "%H:%M";

/// Identity stored locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Caller identity sent with every store request.
    pub user_id: String,
    /// Unix seconds when the identity was created.
    pub created_at: i64,
}

impl UserConfig {
    /// Create a fresh random identity.
    pub fn generate() -> Self {
        Self {
            user_id: UserId::random().to_string(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// The identity as a [`UserId`].
    pub fn user_id(&self) -> Result<UserId> {
        self.user_id
            .parse::<UserId>()
            .context("Invalid user id in user.json")
    }

    /// Load the identity from a directory.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(USER_FILE);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .context("Not initialized. Run 'unplugged init' first.")?;
        serde_json::from_str(&contents).context("Invalid user configuration")
    }

    /// Save the identity to a directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(USER_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save user configuration")?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }

    /// Check if an identity exists.
    pub async fn exists(data_dir: &Path) -> bool {
        data_dir.join(USER_FILE).exists()
    }
}

/// Daily reminder preferences.
///
/// Kept on this device only; the store never sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    /// Whether the daily reminder is on.
    pub enabled: bool,
    /// Local time of day, `HH:MM`.
    pub time: String,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            time: "09:00".to_string(),
        }
    }
}

impl ReminderSettings {
    /// Load settings, falling back to defaults when none were saved.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(REMINDERS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = tokio::fs::read_to_string(&path)
            .await
            .context("Failed to read reminder settings")?;
        let settings: Self =
            serde_json::from_str(&contents).context("Invalid reminder settings")?;
        settings.time()?;
        Ok(settings)
    }

    /// Save settings to a directory.
    pub async fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join(REMINDERS_FILE);
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, contents)
            .await
            .context("Failed to save reminder settings")?;
        set_file_permissions_0600(&path).await?;
        Ok(())
    }

    /// Set the reminder time after checking it parses as `HH:MM`.
    pub fn set_time(&mut self, time: &str) -> Result<()> {
        let parsed = parse_reminder_time(time)?;
        self.time = parsed.format(REMINDER_TIME_FORMAT).to_string();
        Ok(())
    }

    /// The reminder time of day.
    pub fn time(&self) -> Result<NaiveTime> {
        parse_reminder_time(&self.time)
    }
}

fn parse_reminder_time(time: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(time, REMINDER_TIME_FORMAT)
        .with_context(|| format!("Invalid reminder time '{time}', expected HH:MM"))
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
