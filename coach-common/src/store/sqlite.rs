//! SQLite session store
//!
//! Session metadata lives in `coach_sessions`; chunk records are appended to
//! `chunk_feedback`, whose autoincrement `seq` preserves arrival order.
//! Questions, records and reports are stored as JSON text.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use super::SessionStore;
use crate::models::{
    ChunkFeedback, NewSession, Question, Session, SessionReport, SessionSummary,
};
use crate::{Error, Result};

pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Wrap an existing pool, creating tables if needed
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        init_tables(&pool).await?;
        Ok(Self { pool })
    }

    /// Open (or create) the database file at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // mode=rwc: read, write, create
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("Connecting to session database: {}", db_url);

        let pool = SqlitePool::connect(&db_url).await?;
        Self::new(pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_chunks(&self, session_id: &str) -> Result<BTreeMap<String, Vec<ChunkFeedback>>> {
        let rows = sqlx::query(
            "SELECT question_id, record FROM chunk_feedback WHERE session_id = ? ORDER BY seq",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        let mut chunks: BTreeMap<String, Vec<ChunkFeedback>> = BTreeMap::new();
        for row in rows {
            let question_id: String = row.get("question_id");
            let record: String = row.get("record");
            chunks
                .entry(question_id)
                .or_default()
                .push(serde_json::from_str(&record)?);
        }
        Ok(chunks)
    }
}

/// Create the session tables if they don't exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coach_sessions (
            session_id TEXT PRIMARY KEY,
            user_id TEXT,
            title TEXT NOT NULL,
            questions TEXT NOT NULL DEFAULT '[]',
            completed INTEGER NOT NULL DEFAULT 0,
            aggregated TEXT,
            created_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunk_feedback (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL REFERENCES coach_sessions(session_id),
            question_id TEXT NOT NULL,
            record TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chunk_feedback_session ON chunk_feedback(session_id, seq)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Session tables initialized (coach_sessions, chunk_feedback)");

    Ok(())
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", field, e)))
}

fn parse_session_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Failed to parse session_id: {}", e)))
}

/// Session row without its chunk map
fn session_from_row(row: &SqliteRow) -> Result<Session> {
    let session_id: String = row.get("session_id");
    let questions: String = row.get("questions");
    let questions: Vec<Question> = serde_json::from_str(&questions)?;

    let aggregated: Option<String> = row.get("aggregated");
    let aggregated: Option<SessionReport> = aggregated
        .map(|s| serde_json::from_str(&s))
        .transpose()?;

    let created_at: String = row.get("created_at");
    let completed_at: Option<String> = row.get("completed_at");

    Ok(Session {
        id: parse_session_id(&session_id)?,
        user_id: row.get("user_id"),
        title: row.get("title"),
        questions,
        chunks: BTreeMap::new(),
        completed: row.get::<i64, _>("completed") != 0,
        aggregated,
        created_at: parse_timestamp(&created_at, "created_at")?,
        completed_at: completed_at
            .map(|s| parse_timestamp(&s, "completed_at"))
            .transpose()?,
    })
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn create(&self, new: NewSession) -> Result<Session> {
        let session = Session::new(new);
        let questions = serde_json::to_string(&session.questions)?;

        sqlx::query(
            r#"
            INSERT INTO coach_sessions (session_id, user_id, title, questions, completed, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(session.id.to_string())
        .bind(&session.user_id)
        .bind(&session.title)
        .bind(&questions)
        .bind(format_timestamp(&session.created_at))
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<Session>> {
        let id = session_id.to_string();
        let row = sqlx::query(
            r#"
            SELECT session_id, user_id, title, questions, completed, aggregated,
                   created_at, completed_at
            FROM coach_sessions
            WHERE session_id = ?
            "#,
        )
        .bind(&id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut session = session_from_row(&row)?;
                session.chunks = self.load_chunks(&id).await?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn append_chunk(
        &self,
        session_id: Uuid,
        question_id: &str,
        record: ChunkFeedback,
    ) -> Result<()> {
        let id = session_id.to_string();
        let record = serde_json::to_string(&record)?;

        // Single statement: existence check and insert are atomic
        let result = sqlx::query(
            r#"
            INSERT INTO chunk_feedback (session_id, question_id, record)
            SELECT ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM coach_sessions WHERE session_id = ?)
            "#,
        )
        .bind(&id)
        .bind(question_id)
        .bind(&record)
        .bind(&id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::SessionNotFound(id));
        }
        Ok(())
    }

    async fn complete(&self, session_id: Uuid, report: SessionReport) -> Result<Session> {
        let id = session_id.to_string();
        let aggregated = serde_json::to_string(&report)?;

        let result = sqlx::query(
            r#"
            UPDATE coach_sessions
            SET completed = 1, aggregated = ?, completed_at = ?
            WHERE session_id = ?
            "#,
        )
        .bind(&aggregated)
        .bind(format_timestamp(&Utc::now()))
        .bind(&id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::SessionNotFound(id));
        }

        self.get(session_id)
            .await?
            .ok_or_else(|| Error::Persistence(format!("Session vanished after completion: {}", id)))
    }

    async fn list(&self) -> Result<Vec<SessionSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT s.session_id, s.user_id, s.title, s.questions, s.completed, s.created_at,
                   (SELECT COUNT(*) FROM chunk_feedback c WHERE c.session_id = s.session_id)
                       AS chunk_count
            FROM coach_sessions s
            ORDER BY s.created_at, s.session_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<SessionSummary> {
                let session_id: String = row.get("session_id");
                let questions: String = row.get("questions");
                let questions: Vec<Question> = serde_json::from_str(&questions)?;
                let created_at: String = row.get("created_at");

                Ok(SessionSummary {
                    id: parse_session_id(&session_id)?,
                    user_id: row.get("user_id"),
                    title: row.get("title"),
                    question_count: questions.len(),
                    chunk_count: row.get::<i64, _>("chunk_count") as usize,
                    completed: row.get::<i64, _>("completed") != 0,
                    created_at: parse_timestamp(&created_at, "created_at")?,
                })
            })
            .collect()
    }
}
