//! Interviewer - AI-graded mock interview service
//!
//! A Rust backend driving each interview through a routed turn state
//! machine: question, answer, evaluation, follow-up, final report.

mod api;
mod db;
mod document;
mod generator;
mod interview;
mod llm;
mod runtime;

use api::{create_router, AppState};
use db::Database;
use generator::ContentGenerator;
use llm::{LlmConfig, ModelRegistry};
use runtime::{DatabaseStore, RegistryLlmClient, SessionManager};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interviewer=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("INTERVIEWER_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.interviewer/interviewer.db")
    });

    let port: u16 = std::env::var("INTERVIEWER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let default_max_followups: u32 = std::env::var("INTERVIEWER_MAX_FOLLOWUPS")
        .ok()
        .and_then(|n| n.parse().ok())
        .unwrap_or(runtime::DEFAULT_MAX_FOLLOWUPS);

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path)?;

    // Initialize LLM registry
    let llm_config = LlmConfig::from_env();
    let llm_registry = Arc::new(ModelRegistry::new(&llm_config));

    if llm_registry.has_models() {
        tracing::info!(
            provider = %llm_registry.provider(),
            model = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!(
            "No LLM configured. Set GOOGLE_API_KEY, or LLM_PROVIDER=ollama with OLLAMA_BASE_URL."
        );
    }

    let generator = ContentGenerator::new(Arc::new(RegistryLlmClient::new(Arc::clone(
        &llm_registry,
    ))));
    let sessions = SessionManager::new(DatabaseStore::new(db), generator)
        .with_default_max_followups(default_max_followups);
    let state = AppState::new(sessions, llm_registry);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Interviewer server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
