//! OpenAI-compatible transcription client
//!
//! Uploads the chunk audio as multipart (`file`, `model`) and reads `{"text"}`
//! from the response.

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use super::{AnalysisError, AudioClip, Transcriber};

const USER_AGENT: &str = concat!("interview-coach/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

pub struct HttpTranscriber {
    http_client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpTranscriber {
    pub fn new(
        url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            url,
            model,
            api_key,
            timeout,
        })
    }

    fn audio_part(clip: &AudioClip) -> Result<Part, AnalysisError> {
        let part = Part::bytes(clip.bytes.clone()).file_name(clip.file_name.clone());
        match &clip.content_type {
            Some(mime) => part
                .mime_str(mime)
                .map_err(|e| AnalysisError::Unavailable(format!("Invalid content type: {}", e))),
            None => Ok(part),
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for HttpTranscriber {
    fn name(&self) -> &'static str {
        "http-transcriber"
    }

    async fn transcribe(&self, clip: &AudioClip) -> Result<String, AnalysisError> {
        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", Self::audio_part(clip)?);

        tracing::debug!(
            bytes = clip.bytes.len(),
            file_name = %clip.file_name,
            "Requesting transcription"
        );

        let mut request = self.http_client.post(&self.url).multipart(form);
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

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

        Ok(body.text.trim().to_string())
    }
}
