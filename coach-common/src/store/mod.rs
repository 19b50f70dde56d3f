//! Session storage
//!
//! `SessionStore` is the only way the rest of the system touches session
//! state. Two backends share the contract:
//! - [`InMemorySessionStore`]: process-lifetime map, per-session locking
//! - [`SqliteSessionStore`]: durable SQLite tables, same semantics

mod memory;
mod sqlite;

pub use memory::InMemorySessionStore;
pub use sqlite::SqliteSessionStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{ChunkFeedback, NewSession, Session, SessionReport, SessionSummary};
use crate::Result;

/// Keyed storage of sessions, their questions and chunk records
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Allocate a new session with an empty chunk map
    async fn create(&self, new: NewSession) -> Result<Session>;

    /// Point-in-time snapshot of a session, `None` when the id is unknown
    async fn get(&self, session_id: Uuid) -> Result<Option<Session>>;

    /// Append a record to `chunks[question_id]`, creating the group if absent
    ///
    /// Concurrent appends to the same session never lose records.
    /// Fails with `SessionNotFound` for an unknown session.
    async fn append_chunk(
        &self,
        session_id: Uuid,
        question_id: &str,
        record: ChunkFeedback,
    ) -> Result<()>;

    /// Mark the session completed and store (or overwrite) its report
    ///
    /// Fails with `SessionNotFound` for an unknown session.
    async fn complete(&self, session_id: Uuid, report: SessionReport) -> Result<Session>;

    /// Summaries of all sessions, oldest first
    async fn list(&self) -> Result<Vec<SessionSummary>>;
}
