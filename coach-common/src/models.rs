//! Session, question and feedback records
//!
//! A session owns an ordered question list (fixed at creation) and a map of
//! question id to the chunk feedback records received for that question, in
//! arrival order. Once aggregated, the session also carries its report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Emotion label to probability-like score in [0,1]
///
/// Ordered map so serialized records and reports are byte-stable.
pub type EmotionScores = BTreeMap<String, f64>;

/// Provenance tag of a question (informational only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    General,
    Domain,
    Resume,
    GeneralAi,
    DomainAi,
}

/// One interview question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique within a session's question list
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Where an enrichment signal (transcript, emotions) came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Produced by the external collaborator
    Analyzed,
    /// Not requested (e.g. nothing to classify)
    Skipped,
    /// Collaborator failed; documented fallback applied
    #[default]
    Fallback,
}

/// Where a clarity/confidence score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Supplied by the upstream analyzer
    Analyzer,
    /// Derived by the score estimator
    Estimated,
    /// No signal at all; neutral default
    #[default]
    Default,
}

/// Provenance of every field of a chunk record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChunkProvenance {
    pub transcript: SignalSource,
    pub emotions: SignalSource,
    pub clarity: ScoreSource,
    pub confidence: ScoreSource,
}

/// Feedback for one uploaded audio chunk
///
/// Created once by the ingestion handler and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFeedback {
    /// Caller-supplied ordering hint; preserved, never used to reorder storage
    pub chunk_index: i64,
    #[serde(default)]
    pub chunk_start_time: Option<i64>,
    #[serde(default)]
    pub chunk_end_time: Option<i64>,
    /// Empty when transcription failed
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub clarity_score: Option<f64>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub emotions: EmotionScores,
    /// Opaque locator of the stored audio artifact
    pub audio_reference: String,
    pub saved_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    #[serde(default)]
    pub provenance: ChunkProvenance,
}

/// Input to `SessionStore::create`
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub user_id: Option<String>,
    pub title: String,
    pub questions: Vec<Question>,
}

/// One interview-practice attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub title: String,
    pub questions: Vec<Question>,
    /// question id -> chunk records in arrival order
    pub chunks: BTreeMap<String, Vec<ChunkFeedback>>,
    pub completed: bool,
    pub aggregated: Option<SessionReport>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Fresh session with an empty chunk map
    pub fn new(new: NewSession) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            questions: new.questions,
            chunks: BTreeMap::new(),
            completed: false,
            aggregated: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.values().map(Vec::len).sum()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            user_id: self.user_id.clone(),
            title: self.title.clone(),
            question_count: self.questions.len(),
            chunk_count: self.chunk_count(),
            completed: self.completed,
            created_at: self.created_at,
        }
    }
}

/// Listing row for `SessionStore::list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub title: String,
    pub question_count: usize,
    pub chunk_count: usize,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Transcript fragment of one chunk, in storage order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub chunk_index: i64,
    pub text: String,
}

/// Aggregated feedback for one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReport {
    pub question_id: String,
    pub chunks: Vec<ChunkFeedback>,
    pub transcripts: Vec<TranscriptFragment>,
    pub avg_clarity: Option<f64>,
    pub avg_confidence: Option<f64>,
    pub avg_emotions: EmotionScores,
    /// round(avg_clarity * 100)
    pub performance: Option<i64>,
    pub recommendations: Vec<String>,
}

/// Session-level metrics (mean of per-question means)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OverallMetrics {
    pub avg_clarity: Option<f64>,
    pub avg_confidence: Option<f64>,
    pub recommendations: Vec<String>,
}

/// Aggregated report of a completed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    /// Session question order, then orphan groups
    pub questions: Vec<QuestionReport>,
    pub overall: OverallMetrics,
}

impl SessionReport {
    pub fn question(&self, question_id: &str) -> Option<&QuestionReport> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_kind_wire_names() {
        let q: Question = serde_json::from_str(
            r#"{"id":"g-1","text":"Tell me about yourself.","type":"general-ai"}"#,
        )
        .unwrap();
        assert_eq!(q.kind, QuestionKind::GeneralAi);
        assert_eq!(q.domain, None);

        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["type"], "general-ai");
        assert_eq!(
            serde_json::to_value(QuestionKind::DomainAi).unwrap(),
            "domain-ai"
        );
    }

    #[test]
    fn test_chunk_record_tolerates_missing_optional_fields() {
        let record: ChunkFeedback = serde_json::from_str(
            r#"{
                "chunk_index": 3,
                "audio_reference": "/uploads/a.webm",
                "saved_at": "2025-01-01T00:00:00Z",
                "processed_at": "2025-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(record.transcript, "");
        assert!(record.clarity_score.is_none());
        assert!(record.emotions.is_empty());
        assert_eq!(record.provenance, ChunkProvenance::default());
    }

    #[test]
    fn test_new_session_starts_empty() {
        let session = Session::new(NewSession {
            user_id: Some("u-1".to_string()),
            title: "Practice".to_string(),
            questions: vec![],
        });
        assert!(!session.completed);
        assert!(session.aggregated.is_none());
        assert!(session.completed_at.is_none());
        assert_eq!(session.chunk_count(), 0);
        assert_eq!(session.summary().title, "Practice");
    }
}
