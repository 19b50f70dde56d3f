//! HTTP API handlers for coach-fb

pub mod feedback;
pub mod files;
pub mod health;
pub mod sessions;

pub use feedback::feedback_routes;
pub use files::file_routes;
pub use health::health_routes;
pub use sessions::session_routes;

use axum::extract::Multipart;
use std::collections::HashMap;
use uuid::Uuid;

use crate::analysis::AudioClip;
use crate::error::ApiResult;

/// Session ids are UUIDs; anything else cannot name an existing session
pub(crate) fn parse_session_id(raw: &str) -> coach_common::Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| coach_common::Error::SessionNotFound(raw.to_string()))
}

/// Multipart body with at most one file part plus text fields
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub file: Option<AudioClip>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Read the whole body; the first part named in `file_fields` is the file
    pub async fn read(mut multipart: Multipart, file_fields: &[&str]) -> ApiResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if file_fields.contains(&name.as_str()) && form.file.is_none() {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                form.file = Some(AudioClip {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else if file_fields.contains(&name.as_str()) {
                // Extra file parts are ignored
                field.bytes().await?;
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Trimmed text field, `None` when absent or blank
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
