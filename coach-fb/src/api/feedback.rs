//! POST /feedback/analyze
//!
//! Multipart fields:
//! - `audio` (or `file`): chunk audio
//! - `session_id`, `question_id`, `chunk_index`: required
//! - `chunk_start_time`, `chunk_end_time`: optional, milliseconds

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    routing::post,
    Json, Router,
};
use coach_common::models::ChunkFeedback;
use coach_common::Error;

use super::{parse_session_id, UploadForm};
use crate::error::ApiResult;
use crate::services::ChunkUpload;
use crate::AppState;

const AUDIO_FIELDS: &[&str] = &["audio", "file"];

fn required<'a>(form: &'a UploadForm, name: &str) -> coach_common::Result<&'a str> {
    form.text(name)
        .ok_or_else(|| Error::MalformedInput(format!("missing required field '{}'", name)))
}

fn integer(form: &UploadForm, name: &str) -> coach_common::Result<Option<i64>> {
    form.text(name)
        .map(|raw| {
            raw.parse::<i64>().map_err(|_| {
                Error::MalformedInput(format!("field '{}' must be an integer, got '{}'", name, raw))
            })
        })
        .transpose()
}

/// Validate the form into an upload; runs before any store or analyzer call
fn chunk_upload(form: UploadForm) -> coach_common::Result<ChunkUpload> {
    let session_id = required(&form, "session_id")?;
    let question_id = required(&form, "question_id")?.to_string();
    let chunk_index = integer(&form, "chunk_index")?
        .ok_or_else(|| Error::MalformedInput("missing required field 'chunk_index'".to_string()))?;
    let chunk_start_time = integer(&form, "chunk_start_time")?;
    let chunk_end_time = integer(&form, "chunk_end_time")?;
    let session_id = parse_session_id(session_id)?;

    let audio = form
        .file
        .ok_or_else(|| Error::MalformedInput("missing audio file".to_string()))?;

    Ok(ChunkUpload {
        session_id,
        question_id,
        chunk_index,
        chunk_start_time,
        chunk_end_time,
        audio,
    })
}

/// POST /feedback/analyze
///
/// Returns the stored chunk record. Analyzer failures degrade to fallback
/// values; only a failed store write fails the request.
pub async fn analyze_chunk(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ChunkFeedback>> {
    let form = UploadForm::read(multipart?, AUDIO_FIELDS).await?;
    let upload = chunk_upload(form)?;
    let record = state.ingestion.ingest(upload).await?;
    Ok(Json(record))
}

/// Build feedback routes
pub fn feedback_routes() -> Router<AppState> {
    Router::new().route("/feedback/analyze", post(analyze_chunk))
}
