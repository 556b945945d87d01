//! SQLite storage backend for fast-store.

use super::FastStorage;
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use fast_types::{FastHistory, FastStatus, FastingSession, Time, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

const STATUS_NOT_STARTED: &str = "notStarted";
const STATUS_IN_PROGRESS: &str = "inProgress";
const STATUS_COMPLETED: &str = "completed";

/// SQLite-based session storage.
///
/// Uses WAL mode for concurrent reads/writes. Times are stored as
/// nanoseconds since the Unix epoch.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database path.
    ///
    /// Creates the database file if it doesn't exist.
    pub async fn new(path: &Path) -> StorageResult<Self> {
        let url = path.to_str().ok_or_else(|| StorageError::InvalidPath {
            path: path.to_path_buf(),
        })?;
        let options = SqliteConnectOptions::from_str(url)
            .map_err(StorageError::Database)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Create an in-memory SQLite storage (for testing).
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(":memory:").map_err(StorageError::Database)?;

        // A second connection would open a second, empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    async fn run_migrations(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fasting_sessions (
                user_id BLOB PRIMARY KEY,
                status TEXT NOT NULL,
                elapsed_hours INTEGER NOT NULL DEFAULT 0,
                goal_hours INTEGER NOT NULL,
                start_time INTEGER,
                timestamp INTEGER NOT NULL,
                reflection_journal TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fast_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id BLOB NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                goal_hours INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                reflection_journal TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_history_user ON fast_history(user_id, id)")
            .execute(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_status ON fasting_sessions(status)")
            .execute(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(())
    }
}

fn time_to_db(time: Time) -> i64 {
    i64::try_from(time.as_nanos()).unwrap_or(i64::MAX)
}

fn time_from_db(nanos: i64) -> Time {
    Time::from_nanos(nanos.max(0) as u64)
}

fn status_columns(status: FastStatus) -> (&'static str, i64) {
    match status {
        FastStatus::NotStarted => (STATUS_NOT_STARTED, 0),
        FastStatus::InProgress { elapsed_hours } => {
            (STATUS_IN_PROGRESS, i64::try_from(elapsed_hours).unwrap_or(i64::MAX))
        }
        FastStatus::Completed => (STATUS_COMPLETED, 0),
    }
}

#[async_trait]
impl FastStorage for SqliteStorage {
    async fn load_session(&self, user: &UserId) -> StorageResult<Option<FastingSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT user_id, status, elapsed_hours, goal_hours, start_time, timestamp, reflection_journal
            FROM fasting_sessions
            WHERE user_id = ?1
            "#,
        )
        .bind(user.as_bytes().as_slice())
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        match row {
            Some(r) => Ok(Some(r.try_into()?)),
            None => Ok(None),
        }
    }

    async fn save_session(&self, user: &UserId, session: &FastingSession) -> StorageResult<()> {
        let (status, elapsed) = status_columns(session.status);

        sqlx::query(
            r#"
            INSERT INTO fasting_sessions
                (user_id, status, elapsed_hours, goal_hours, start_time, timestamp, reflection_journal)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id) DO UPDATE SET
                status = ?2,
                elapsed_hours = ?3,
                goal_hours = ?4,
                start_time = ?5,
                timestamp = ?6,
                reflection_journal = ?7
            "#,
        )
        .bind(user.as_bytes().as_slice())
        .bind(status)
        .bind(elapsed)
        .bind(i64::from(session.goal_hours))
        .bind(session.start_time.map(time_to_db))
        .bind(time_to_db(session.timestamp))
        .bind(&session.reflection_journal)
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(())
    }

    async fn commit_completion(
        &self,
        user: &UserId,
        session: &FastingSession,
        entry: &FastHistory,
    ) -> StorageResult<()> {
        let (status, elapsed) = status_columns(session.status);
        let mut tx = self.pool.begin().await.map_err(StorageError::Database)?;

        sqlx::query(
            r#"
            UPDATE fasting_sessions
            SET status = ?2, elapsed_hours = ?3, timestamp = ?4, reflection_journal = ?5
            WHERE user_id = ?1
            "#,
        )
        .bind(user.as_bytes().as_slice())
        .bind(status)
        .bind(elapsed)
        .bind(time_to_db(session.timestamp))
        .bind(&session.reflection_journal)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Database)?;

        sqlx::query(
            r#"
            INSERT INTO fast_history
                (user_id, start_time, end_time, goal_hours, timestamp, reflection_journal)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(user.as_bytes().as_slice())
        .bind(time_to_db(entry.start_time))
        .bind(time_to_db(entry.end_time))
        .bind(i64::from(entry.goal_hours))
        .bind(time_to_db(entry.timestamp))
        .bind(&entry.reflection_journal)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::Database)?;

        tx.commit().await.map_err(StorageError::Database)?;
        Ok(())
    }

    async fn history(&self, user: &UserId) -> StorageResult<Vec<FastHistory>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT start_time, end_time, goal_hours, timestamp, reflection_journal
            FROM fast_history
            WHERE user_id = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(user.as_bytes().as_slice())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(rows.into_iter().map(FastHistory::from).collect())
    }

    async fn in_progress_users(&self) -> StorageResult<Vec<UserId>> {
        let rows: Vec<Vec<u8>> =
            sqlx::query_scalar("SELECT user_id FROM fasting_sessions WHERE status = ?1")
                .bind(STATUS_IN_PROGRESS)
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::Database)?;

        rows.iter()
            .map(|bytes| {
                UserId::from_bytes(bytes).ok_or_else(|| StorageError::Corrupt {
                    user: format!("{} bytes", bytes.len()),
                    reason: "user id has the wrong length".to_string(),
                })
            })
            .collect()
    }

    async fn count_in_progress(&self) -> StorageResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM fasting_sessions WHERE status = ?1")
                .bind(STATUS_IN_PROGRESS)
                .fetch_one(&self.pool)
                .await
                .map_err(StorageError::Database)?;

        Ok(count as u64)
    }

    async fn count_history(&self) -> StorageResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fast_history")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(count as u64)
    }
}

/// Internal row type for session queries.
#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: Vec<u8>,
    status: String,
    elapsed_hours: i64,
    goal_hours: i64,
    start_time: Option<i64>,
    timestamp: i64,
    reflection_journal: String,
}

impl TryFrom<SessionRow> for FastingSession {
    type Error = StorageError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StorageError::Corrupt {
            user: UserId::from_bytes(&row.user_id)
                .map(|u| u.to_string())
                .unwrap_or_else(|| "<invalid>".to_string()),
            reason,
        };

        let status = match row.status.as_str() {
            STATUS_NOT_STARTED => FastStatus::NotStarted,
            STATUS_IN_PROGRESS => FastStatus::InProgress {
                elapsed_hours: row.elapsed_hours.max(0) as u64,
            },
            STATUS_COMPLETED => FastStatus::Completed,
            other => return Err(corrupt(format!("unknown status {other:?}"))),
        };
        let goal_hours = u32::try_from(row.goal_hours)
            .map_err(|_| corrupt(format!("goal hours {} out of range", row.goal_hours)))?;

        let session = FastingSession {
            status,
            goal_hours,
            start_time: row.start_time.map(time_from_db),
            timestamp: time_from_db(row.timestamp),
            reflection_journal: row.reflection_journal.clone(),
        };
        session.validate().map_err(|e| corrupt(e.to_string()))?;
        Ok(session)
    }
}

/// Internal row type for history queries.
#[derive(sqlx::FromRow)]
struct HistoryRow {
    start_time: i64,
    end_time: i64,
    goal_hours: i64,
    timestamp: i64,
    reflection_journal: String,
}

impl From<HistoryRow> for FastHistory {
    fn from(row: HistoryRow) -> Self {
        FastHistory {
            start_time: time_from_db(row.start_time),
            end_time: time_from_db(row.end_time),
            goal_hours: row.goal_hours.clamp(0, i64::from(u32::MAX)) as u32,
            timestamp: time_from_db(row.timestamp),
            reflection_journal: row.reflection_journal,
        }
    }
}
