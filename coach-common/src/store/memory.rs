//! In-memory session store
//!
//! Sessions live for the process lifetime; nothing is evicted. The outer map
//! lock is held only to find or insert a session; each session has its own
//! mutex so appends to one session serialize without blocking others.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::SessionStore;
use crate::models::{ChunkFeedback, NewSession, Session, SessionReport, SessionSummary};
use crate::{Error, Result};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, session_id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&session_id).cloned()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, new: NewSession) -> Result<Session> {
        let session = Session::new(new);
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(Mutex::new(session.clone())));
        Ok(session)
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<Session>> {
        match self.entry(session_id).await {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn append_chunk(
        &self,
        session_id: Uuid,
        question_id: &str,
        record: ChunkFeedback,
    ) -> Result<()> {
        let entry = self
            .entry(session_id)
            .await
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        let mut session = entry.lock().await;
        session
            .chunks
            .entry(question_id.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn complete(&self, session_id: Uuid, report: SessionReport) -> Result<Session> {
        let entry = self
            .entry(session_id)
            .await
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        let mut session = entry.lock().await;
        session.completed = true;
        session.aggregated = Some(report);
        session.completed_at = Some(Utc::now());
        Ok(session.clone())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>> {
        let entries: Vec<Arc<Mutex<Session>>> =
            self.sessions.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            summaries.push(entry.lock().await.summary());
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }
}
