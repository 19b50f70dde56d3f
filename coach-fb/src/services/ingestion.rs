//! Chunk ingestion
//!
//! One uploaded audio chunk becomes one immutable [`ChunkFeedback`] record:
//! 1. Session must exist (`SessionNotFound` otherwise)
//! 2. Audio is stored, yielding the artifact reference
//! 3. Transcription (failure: empty transcript)
//! 4. Emotion classification of a non-empty transcript (failure: no emotions)
//! 5. Missing clarity/confidence are estimated locally
//! 6. Record is appended to the session; a failed write fails the request
//!    and the stored audio is removed

use chrono::{DateTime, Utc};
use coach_common::models::{ChunkFeedback, ChunkProvenance};
use coach_common::scoring::{resolve_clarity, resolve_confidence};
use coach_common::{Error, Result, SessionStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::audio_storage::{chunk_file_name, AudioStorage};
use crate::analysis::{
    enrich, AudioClip, EmotionAnalysis, EmotionClassifier, Enrichment, Transcriber,
};

/// Validated upload of one chunk
#[derive(Debug, Clone)]
pub struct ChunkUpload {
    pub session_id: Uuid,
    pub question_id: String,
    pub chunk_index: i64,
    /// Milliseconds from answer start, caller supplied
    pub chunk_start_time: Option<i64>,
    pub chunk_end_time: Option<i64>,
    pub audio: AudioClip,
}

pub struct IngestionService {
    store: Arc<dyn SessionStore>,
    storage: Arc<dyn AudioStorage>,
    transcriber: Arc<dyn Transcriber>,
    classifier: Arc<dyn EmotionClassifier>,
    analysis_timeout: Duration,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        storage: Arc<dyn AudioStorage>,
        transcriber: Arc<dyn Transcriber>,
        classifier: Arc<dyn EmotionClassifier>,
        analysis_timeout: Duration,
    ) -> Self {
        Self {
            store,
            storage,
            transcriber,
            classifier,
            analysis_timeout,
        }
    }

    pub fn transcriber_name(&self) -> &'static str {
        self.transcriber.name()
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    async fn transcribe(&self, clip: &AudioClip) -> Enrichment<String> {
        enrich(
            self.transcriber.name(),
            self.analysis_timeout,
            String::new(),
            self.transcriber.transcribe(clip),
        )
        .await
    }

    async fn classify(&self, transcript: &str) -> Enrichment<EmotionAnalysis> {
        if transcript.trim().is_empty() {
            return Enrichment::Skipped(EmotionAnalysis::default());
        }
        enrich(
            self.classifier.name(),
            self.analysis_timeout,
            EmotionAnalysis::default(),
            self.classifier.classify(transcript),
        )
        .await
    }

    /// Process one chunk and append its record to the session
    pub async fn ingest(&self, upload: ChunkUpload) -> Result<ChunkFeedback> {
        let session_id = upload.session_id;

        if self.store.get(session_id).await?.is_none() {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }

        let audio_reference = self
            .storage
            .store(&chunk_file_name(&upload.audio.file_name), &upload.audio.bytes)
            .await?;
        let saved_at: DateTime<Utc> = Utc::now();

        let transcript = self.transcribe(&upload.audio).await;
        let transcript_source = transcript.source();
        let transcript = transcript.into_value();

        let analysis = self.classify(&transcript).await;
        let emotions_source = analysis.source();
        let analysis = analysis.into_value();

        let (clarity, clarity_source) = resolve_clarity(analysis.clarity_score, &transcript);
        let (confidence, confidence_source) =
            resolve_confidence(analysis.confidence_score, &analysis.emotions);

        let record = ChunkFeedback {
            chunk_index: upload.chunk_index,
            chunk_start_time: upload.chunk_start_time,
            chunk_end_time: upload.chunk_end_time,
            transcript,
            clarity_score: Some(clarity),
            confidence_score: Some(confidence),
            emotions: analysis.emotions,
            audio_reference,
            saved_at,
            processed_at: Utc::now(),
            provenance: ChunkProvenance {
                transcript: transcript_source,
                emotions: emotions_source,
                clarity: clarity_source,
                confidence: confidence_source,
            },
        };

        if let Err(e) = self
            .store
            .append_chunk(session_id, &upload.question_id, record.clone())
            .await
        {
            // No record points at the stored audio
            if let Err(cleanup) = self.storage.remove(&record.audio_reference).await {
                warn!(
                    audio_reference = %record.audio_reference,
                    error = %cleanup,
                    "Orphaned audio left in uploads"
                );
            }
            return Err(match e {
                e @ Error::SessionNotFound(_) => e,
                other => Error::Persistence(format!("Failed to persist chunk feedback: {}", other)),
            });
        }

        info!(
            session_id = %session_id,
            question_id = %upload.question_id,
            chunk_index = upload.chunk_index,
            clarity = clarity,
            confidence = confidence,
            "Chunk feedback recorded"
        );

        Ok(record)
    }
}
