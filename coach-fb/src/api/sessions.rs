//! Session API handlers
//!
//! POST /sessions, GET /sessions, GET /sessions/:id,
//! POST /sessions/:id/complete, GET /sessions/:id/report

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use coach_common::models::{NewSession, Question, Session, SessionReport, SessionSummary};
use coach_common::{complete_session, Error};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parse_session_id;
use crate::error::{ApiError, ApiResult};
use crate::services::QuestionPlan;
use crate::AppState;

fn default_title() -> Option<String> {
    Some("Interview Session".to_string())
}

fn default_count() -> usize {
    3
}

/// POST /sessions request
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_title")]
    pub title: Option<String>,
    /// Selects domain-bank questions
    #[serde(default)]
    pub domain: Option<String>,
    /// Enables résumé-based questions when non-empty
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default = "default_count")]
    pub num_general: usize,
    #[serde(default = "default_count")]
    pub num_domain: usize,
    #[serde(default = "default_count")]
    pub num_resume: usize,
}

/// POST /sessions response
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub id: Uuid,
    pub questions: Vec<Question>,
}

/// POST /sessions
///
/// Compose the question list and create the session. Returns 201.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<CreateSessionResponse>)> {
    let plan = QuestionPlan {
        domain: request.domain,
        resume_text: request.resume_text,
        num_general: request.num_general,
        num_domain: request.num_domain,
        num_resume: request.num_resume,
    };
    let questions = state.planner.compose(&plan);

    let title = request
        .title
        .filter(|t| !t.trim().is_empty())
        .or_else(default_title)
        .unwrap_or_default();

    let session = state
        .store
        .create(NewSession {
            user_id: request.user_id,
            title,
            questions,
        })
        .await?;

    tracing::info!(
        session_id = %session.id,
        questions = session.questions.len(),
        "Session created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            id: session.id,
            questions: session.questions,
        }),
    ))
}

/// GET /sessions
pub async fn list_sessions(State(state): State<AppState>) -> ApiResult<Json<Vec<SessionSummary>>> {
    Ok(Json(state.store.list().await?))
}

async fn load_session(state: &AppState, raw_id: &str) -> ApiResult<Session> {
    let session_id = parse_session_id(raw_id)?;
    state
        .store
        .get(session_id)
        .await?
        .ok_or_else(|| Error::SessionNotFound(session_id.to_string()).into())
}

/// GET /sessions/:id
///
/// Full session: questions, chunk records and the report once completed.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Session>> {
    Ok(Json(load_session(&state, &session_id).await?))
}

/// POST /sessions/:id/complete
///
/// Aggregate all chunk records into the session report and store it.
/// Calling again re-aggregates and overwrites the stored report.
pub async fn complete(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionReport>> {
    let session_id = parse_session_id(&session_id)?;
    let report = complete_session(state.store.as_ref(), session_id, &state.thresholds).await?;
    Ok(Json(report))
}

/// GET /sessions/:id/report
///
/// Stored report; 409 until the session has been completed.
pub async fn get_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionReport>> {
    let session = load_session(&state, &session_id).await?;
    session.aggregated.map(Json).ok_or_else(|| {
        ApiError::Conflict(format!("Session {} has not been completed", session.id))
    })
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/complete", post(complete))
        .route("/sessions/:id/report", get(get_report))
}
