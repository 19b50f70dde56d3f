//! coach-fb - Interview coach feedback service
//!
//! Creates practice sessions, ingests recorded answer chunks (transcription,
//! emotion scoring, clarity/confidence estimation) and aggregates each
//! completed session into a feedback report.

use anyhow::{Context, Result};
use clap::Parser;
use coach_common::config::{
    default_config_path, load_toml_config, RootFolderInitializer, RootFolderResolver,
    StoreBackend, TomlConfig, FRONTEND_ORIGINS_ENV,
};
use coach_common::{InMemorySessionStore, SessionStore, SqliteSessionStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coach_fb::analysis::{
    DisabledEmotionClassifier, DisabledTranscriber, EmotionClassifier, HttpEmotionClassifier,
    HttpTranscriber, Transcriber,
};
use coach_fb::services::FsAudioStorage;
use coach_fb::{AppState, HttpSettings};

const MODULE_NAME: &str = "coach-fb";

/// Command-line arguments for coach-fb
#[derive(Parser, Debug)]
#[command(name = "coach-fb")]
#[command(about = "Interview coach feedback service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "COACH_PORT")]
    port: Option<u16>,

    /// Root folder for uploads and the session database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,
}

fn init_tracing(level: &str) {
    let default_filter = format!(
        "coach_fb={level},coach_common={level},tower_http={level}",
        level = level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn open_store(
    config: &TomlConfig,
    initializer: &RootFolderInitializer,
) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(InMemorySessionStore::new()),
        StoreBackend::Sqlite => {
            let db_path = initializer.database_path();
            info!("Database: {}", db_path.display());
            Arc::new(
                SqliteSessionStore::open(&db_path)
                    .await
                    .context("Failed to open session database")?,
            )
        }
    };
    info!("Session store: {}", store.name());
    Ok(store)
}

fn build_analyzers(
    config: &TomlConfig,
) -> Result<(Arc<dyn Transcriber>, Arc<dyn EmotionClassifier>)> {
    let analysis = &config.analysis;
    let timeout = Duration::from_millis(analysis.timeout_ms);

    let transcriber: Arc<dyn Transcriber> = match &analysis.transcriber_url {
        Some(url) => {
            info!("Transcriber: {} (model {})", url, analysis.transcriber_model);
            Arc::new(HttpTranscriber::new(
                url.clone(),
                analysis.transcriber_model.clone(),
                analysis.api_key.clone(),
                timeout,
            )?)
        }
        None => {
            info!("Transcriber not configured; transcripts will be empty");
            Arc::new(DisabledTranscriber)
        }
    };

    let classifier: Arc<dyn EmotionClassifier> = match &analysis.emotion_url {
        Some(url) => {
            info!("Emotion classifier: {}", url);
            Arc::new(HttpEmotionClassifier::new(
                url.clone(),
                analysis.api_key.clone(),
                timeout,
            )?)
        }
        None => {
            info!("Emotion classifier not configured; emotions will be empty");
            Arc::new(DisabledEmotionClassifier)
        }
    };

    Ok((transcriber, classifier))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is loaded before tracing so the configured level applies
    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path(MODULE_NAME));
    let mut config = match &config_path {
        Some(path) => load_toml_config(path)?,
        None => TomlConfig::default(),
    };
    config.merge_env_origins(std::env::var(FRONTEND_ORIGINS_ENV).ok().as_deref());
    if let Some(port) = args.port {
        config.port = port;
    }

    init_tracing(&config.logging.level);

    info!("Starting coach-fb (Interview Coach Feedback) service");
    info!(
        "Version: {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => info!("Config file not found at {}; using defaults", path.display()),
        None => info!("No config directory available; using defaults"),
    }

    // Resolve and create root folder
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let store = open_store(&config, &initializer).await?;
    let (transcriber, classifier) = build_analyzers(&config)?;

    let uploads_dir = initializer.uploads_dir();
    let settings = HttpSettings {
        uploads_dir: uploads_dir.clone(),
        frontend_origins: config.frontend_origins.clone(),
        max_upload_bytes: config.max_upload_bytes,
        analysis_timeout: Duration::from_millis(config.analysis.timeout_ms),
    };
    info!("CORS origins: {}", settings.frontend_origins.join(", "));

    let state = AppState::new(
        store,
        Arc::new(FsAudioStorage::new(uploads_dir)),
        transcriber,
        classifier,
        settings,
    );
    let app = coach_fb::build_router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
