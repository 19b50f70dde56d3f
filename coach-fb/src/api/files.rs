//! POST /files/upload
//!
//! Generic upload (résumés, full recordings). Stored as
//! `<sid>__<qid>__chunk<idx>__<8 hex><ext>` and served under `/uploads`.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use super::UploadForm;
use crate::error::{ApiError, ApiResult};
use crate::services::audio_storage::upload_file_name;
use crate::AppState;

/// POST /files/upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: String,
    pub file_url: String,
    pub session_id: Option<String>,
    pub question_id: Option<String>,
    pub chunk_index: Option<String>,
}

/// POST /files/upload
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let form = UploadForm::read(multipart?, &["file"]).await?;
    let file = form
        .file
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    let session_id = form.text("session_id").map(str::to_string);
    let question_id = form.text("question_id").map(str::to_string);
    let chunk_index = form.text("chunk_index").map(str::to_string);

    let file_name = upload_file_name(
        session_id.as_deref(),
        question_id.as_deref(),
        chunk_index.as_deref(),
        &file.file_name,
    );
    let file_url = state.storage.store(&file_name, &file.bytes).await?;

    tracing::info!(file_url = %file_url, bytes = file.bytes.len(), "File uploaded");

    Ok(Json(UploadResponse {
        status: "ok".to_string(),
        file_url,
        session_id,
        question_id,
        chunk_index,
    }))
}

/// Build file upload routes
pub fn file_routes() -> Router<AppState> {
    Router::new().route("/files/upload", post(upload_file))
}
