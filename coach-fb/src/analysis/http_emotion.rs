//! Text-classification client for emotion scores
//!
//! Sends `{"inputs": text}` and normalizes the response into
//! [`EmotionAnalysis`]. Accepted response shapes:
//! - `[[{"label","score"}, ...]]` (pipeline output, first entry used)
//! - `[{"label","score"}, ...]`
//! - `{"emotions": {...} | [...], "clarity_score"?, "confidence_score"?}`
//!
//! Shape handling stays in this adapter; the rest of the service only sees
//! the typed result.

use coach_common::models::EmotionScores;
use coach_common::scoring::supplied_score;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

use super::{AnalysisError, EmotionAnalysis, EmotionClassifier};

const USER_AGENT: &str = concat!("interview-coach/", env!("CARGO_PKG_VERSION"));

/// Classifier input limit in characters
pub const MAX_INPUT_CHARS: usize = 512;

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmotionPayload {
    Map(BTreeMap<String, f64>),
    List(Vec<LabelScore>),
}

#[derive(Debug, Deserialize)]
struct AnalysisObject {
    #[serde(default, alias = "emotion")]
    emotions: Option<EmotionPayload>,
    #[serde(default, alias = "clarity")]
    clarity_score: Option<f64>,
    #[serde(default, alias = "confidence")]
    confidence_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifierResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Object(AnalysisObject),
}

fn scores_from_pairs(pairs: impl IntoIterator<Item = (String, f64)>) -> EmotionScores {
    pairs
        .into_iter()
        .filter(|(_, score)| score.is_finite())
        .map(|(label, score)| (label.trim().to_lowercase(), score.clamp(0.0, 1.0)))
        .collect()
}

fn scores_from_list(list: Vec<LabelScore>) -> EmotionScores {
    scores_from_pairs(list.into_iter().map(|ls| (ls.label, ls.score)))
}

impl ClassifierResponse {
    fn normalize(self) -> Result<EmotionAnalysis, AnalysisError> {
        match self {
            ClassifierResponse::Nested(outer) => Ok(EmotionAnalysis {
                emotions: outer.into_iter().next().map(scores_from_list).unwrap_or_default(),
                ..Default::default()
            }),
            ClassifierResponse::Flat(list) => Ok(EmotionAnalysis {
                emotions: scores_from_list(list),
                ..Default::default()
            }),
            ClassifierResponse::Object(obj) => {
                if obj.emotions.is_none()
                    && obj.clarity_score.is_none()
                    && obj.confidence_score.is_none()
                {
                    return Err(AnalysisError::InvalidResponse(
                        "response carries no emotions or scores".to_string(),
                    ));
                }
                let emotions = match obj.emotions {
                    Some(EmotionPayload::Map(map)) => scores_from_pairs(map),
                    Some(EmotionPayload::List(list)) => scores_from_list(list),
                    None => EmotionScores::new(),
                };
                Ok(EmotionAnalysis {
                    emotions,
                    clarity_score: supplied_score(obj.clarity_score),
                    confidence_score: supplied_score(obj.confidence_score),
                })
            }
        }
    }
}

/// First `MAX_INPUT_CHARS` characters of `text`
fn truncate_input(text: &str) -> &str {
    match text.char_indices().nth(MAX_INPUT_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub struct HttpEmotionClassifier {
    http_client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpEmotionClassifier {
    pub fn new(url: String, api_key: Option<String>, timeout: Duration) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            url,
            api_key,
            timeout,
        })
    }
}

#[async_trait::async_trait]
impl EmotionClassifier for HttpEmotionClassifier {
    fn name(&self) -> &'static str {
        "http-emotion"
    }

    async fn classify(&self, text: &str) -> Result<EmotionAnalysis, AnalysisError> {
        let input = truncate_input(text);
        tracing::debug!(chars = input.chars().count(), "Requesting emotion classification");

        let mut request = self
            .http_client
            .post(&self.url)
            .json(&json!({ "inputs": input }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AnalysisError::from_request(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Unavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let body: ClassifierResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

        body.normalize()
    }
}
