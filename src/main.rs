use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use dinnerline::config::AppConfig;
use dinnerline::db;
use dinnerline::handlers;
use dinnerline::services::ai::ollama::OllamaProvider;
use dinnerline::services::ai::openai::OpenAiProvider;
use dinnerline::services::ai::LlmProvider;
use dinnerline::services::booking::http::HttpBookingBackend;
use dinnerline::services::booking::sqlite::SqliteBookingBackend;
use dinnerline::services::booking::BookingBackend;
use dinnerline::services::messaging::twilio::TwilioSmsProvider;
use dinnerline::services::sessions::SessionStore;
use dinnerline::state::AppState;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let llm: Box<dyn LlmProvider> = match config.llm_provider.as_str() {
        "ollama" => {
            tracing::info!("using Ollama LLM provider (url: {}, model: {})", config.ollama_url, config.ollama_model);
            Box::new(OllamaProvider::new(config.ollama_url.clone(), config.ollama_model.clone()))
        }
        _ => {
            if config.openai_api_key.is_empty() {
                // Calls are answered with an apology until a key is set.
                tracing::error!("OPENAI_API_KEY is not set, calls will be refused");
            }
            tracing::info!("using OpenAI-compatible LLM provider (model: {})", config.openai_model);
            Box::new(OpenAiProvider::new(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
                config.openai_base_url.clone(),
            ))
        }
    };

    let booking: Box<dyn BookingBackend> = match config.booking_backend.as_str() {
        "http" => {
            anyhow::ensure!(!config.booking_url.is_empty(), "BOOKING_URL must be set when BOOKING_BACKEND=http");
            tracing::info!("using HTTP booking backend ({})", config.booking_url);
            Box::new(HttpBookingBackend::new(config.booking_url.clone()))
        }
        _ => {
            let conn = db::open_shared(&config.database_url)?;
            tracing::info!(
                "using SQLite booking backend ({}, {} covers per slot)",
                config.database_url,
                config.slot_capacity
            );
            Box::new(SqliteBookingBackend::new(conn, config.slot_capacity))
        }
    };

    let messaging = TwilioSmsProvider::new(
        config.twilio_account_sid.clone(),
        config.twilio_auth_token.clone(),
        config.twilio_phone_number.clone(),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        llm,
        booking,
        messaging: Box::new(messaging),
        sessions: SessionStore::new(chrono::Duration::minutes(config.session_ttl_minutes)),
    });

    let purge_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            purge_state
                .sessions
                .purge_expired(chrono::Utc::now().naive_utc());
        }
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/voice", post(handlers::voice::voice_webhook))
        .route("/voice/status", post(handlers::voice::status_callback))
        .route("/api/dev/turn", post(handlers::dev::send_turn))
        .route("/api/dev/sessions/:call_id", get(handlers::dev::get_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
