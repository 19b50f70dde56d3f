//! coach-fb library interface
//!
//! Router, shared state and service components of the feedback service.
//! Exposed as a library for integration testing.

pub mod analysis;
pub mod api;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use coach_common::{SessionStore, Thresholds};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::analysis::{EmotionClassifier, Transcriber};
use crate::services::{
    AudioStorage, IngestionService, QuestionPlanner, QuestionSource, StaticQuestionBank,
};

/// HTTP-level settings taken from configuration
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Served at `/uploads`
    pub uploads_dir: PathBuf,
    /// Origins allowed by CORS
    pub frontend_origins: Vec<String>,
    pub max_upload_bytes: usize,
    /// Per-call limit for external analyzers
    pub analysis_timeout: Duration,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub storage: Arc<dyn AudioStorage>,
    pub ingestion: Arc<IngestionService>,
    pub planner: Arc<QuestionPlanner>,
    pub thresholds: Thresholds,
    pub settings: Arc<HttpSettings>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        storage: Arc<dyn AudioStorage>,
        transcriber: Arc<dyn Transcriber>,
        classifier: Arc<dyn EmotionClassifier>,
        settings: HttpSettings,
    ) -> Self {
        let ingestion = IngestionService::new(
            Arc::clone(&store),
            Arc::clone(&storage),
            transcriber,
            classifier,
            settings.analysis_timeout,
        );

        Self {
            store,
            storage,
            ingestion: Arc::new(ingestion),
            planner: Arc::new(QuestionPlanner::new(Arc::new(StaticQuestionBank::new()))),
            thresholds: Thresholds::default(),
            settings: Arc::new(settings),
            startup_time: Utc::now(),
        }
    }

    /// Replace the question source (e.g. a seeded bank)
    pub fn with_question_source(mut self, source: Arc<dyn QuestionSource>) -> Self {
        self.planner = Arc::new(QuestionPlanner::new(source));
        self
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // Credentials rule out wildcard methods/headers; mirror the request instead
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let settings = Arc::clone(&state.settings);

    Router::new()
        .merge(api::health_routes())
        .merge(api::session_routes())
        .merge(api::feedback_routes())
        .merge(api::file_routes())
        .nest_service("/uploads", ServeDir::new(&settings.uploads_dir))
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        .layer(cors_layer(&settings.frontend_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
