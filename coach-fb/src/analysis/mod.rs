//! External analyzer contracts
//!
//! Transcription and emotion classification run outside the aggregation core.
//! Both are optional enrichment: a failed call never fails the request. The
//! outcome of every call is an explicit [`Enrichment`] so the fallback path is
//! visible to callers and recorded as provenance on the chunk record.
//!
//! # Adapters
//! - [`HttpTranscriber`]: OpenAI-compatible transcription endpoint
//! - [`HttpEmotionClassifier`]: text-classification endpoint
//! - [`DisabledTranscriber`] / [`DisabledEmotionClassifier`]: no endpoint configured

mod http_emotion;
mod http_transcriber;

pub use http_emotion::HttpEmotionClassifier;
pub use http_transcriber::HttpTranscriber;

use coach_common::models::{EmotionScores, SignalSource};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Uploaded audio for one chunk
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Client-supplied file name (used for the extension only)
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Typed result of emotion analysis
///
/// Some analyzers also return clarity/confidence; when present they take
/// precedence over the local estimates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionAnalysis {
    pub emotions: EmotionScores,
    pub clarity_score: Option<f64>,
    pub confidence_score: Option<f64>,
}

/// External analyzer failure
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No endpoint configured for this analyzer
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Network failure or non-success status
    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),

    /// Call exceeded the configured timeout
    #[error("Analyzer timed out after {0:?}")]
    Timeout(Duration),

    /// Response body could not be interpreted
    #[error("Invalid analyzer response: {0}")]
    InvalidResponse(String),
}

impl AnalysisError {
    /// Map a reqwest failure, distinguishing timeouts
    pub(crate) fn from_request(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            AnalysisError::Timeout(timeout)
        } else if err.is_decode() {
            AnalysisError::InvalidResponse(err.to_string())
        } else {
            AnalysisError::Unavailable(err.to_string())
        }
    }
}

/// Speech-to-text collaborator
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// Analyzer name for logging
    fn name(&self) -> &'static str;

    async fn transcribe(&self, clip: &AudioClip) -> Result<String, AnalysisError>;
}

/// Text emotion classifier collaborator
#[async_trait::async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// Analyzer name for logging
    fn name(&self) -> &'static str;

    async fn classify(&self, text: &str) -> Result<EmotionAnalysis, AnalysisError>;
}

/// Transcriber used when no endpoint is configured
pub struct DisabledTranscriber;

#[async_trait::async_trait]
impl Transcriber for DisabledTranscriber {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn transcribe(&self, _clip: &AudioClip) -> Result<String, AnalysisError> {
        Err(AnalysisError::NotConfigured("transcriber"))
    }
}

/// Classifier used when no endpoint is configured
pub struct DisabledEmotionClassifier;

#[async_trait::async_trait]
impl EmotionClassifier for DisabledEmotionClassifier {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn classify(&self, _text: &str) -> Result<EmotionAnalysis, AnalysisError> {
        Err(AnalysisError::NotConfigured("emotion classifier"))
    }
}

/// Outcome of an optional enrichment call
#[derive(Debug)]
pub enum Enrichment<T> {
    /// Value produced by the collaborator
    Analyzed(T),
    /// Call not made; value is the documented default
    Skipped(T),
    /// Call failed; value is the documented fallback
    Fallback { value: T, reason: AnalysisError },
}

impl<T> Enrichment<T> {
    pub fn into_value(self) -> T {
        match self {
            Enrichment::Analyzed(value) | Enrichment::Skipped(value) => value,
            Enrichment::Fallback { value, .. } => value,
        }
    }

    pub fn source(&self) -> SignalSource {
        match self {
            Enrichment::Analyzed(_) => SignalSource::Analyzed,
            Enrichment::Skipped(_) => SignalSource::Skipped,
            Enrichment::Fallback { .. } => SignalSource::Fallback,
        }
    }
}

/// Run an enrichment call under `timeout`, substituting `fallback` on failure
///
/// Failures are logged at warn and never propagated.
pub async fn enrich<T, F>(analyzer: &str, timeout: Duration, fallback: T, call: F) -> Enrichment<T>
where
    F: Future<Output = Result<T, AnalysisError>>,
{
    let reason = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => return Enrichment::Analyzed(value),
        Ok(Err(err)) => err,
        Err(_) => AnalysisError::Timeout(timeout),
    };

    match &reason {
        // Expected in deployments without that analyzer
        AnalysisError::NotConfigured(_) => {
            tracing::debug!(analyzer, "{}; using fallback", reason);
        }
        _ => {
            warn!(analyzer, error = %reason, "Enrichment failed; using fallback");
        }
    }

    Enrichment::Fallback {
        value: fallback,
        reason,
    }
}
