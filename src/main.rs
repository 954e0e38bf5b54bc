use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod codegen;
mod config;
mod error;
mod handlers;
mod models;
mod service;
mod store;
mod validator;

use config::{AppConfig, StoreBackend};
use service::{RankingEngine, RedirectResolver, ShortenService};
use store::{KeyValueStore, MemoryStore, RedisStore};

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub config: AppConfig,
    pub shortener: ShortenService,
    pub ranking: RankingEngine,
    pub resolver: RedirectResolver,
}

impl AppState {
    /// Wire every service to the same store handle.
    pub fn new(config: AppConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            config,
            shortener: ShortenService::new(store.clone()),
            ranking: RankingEngine::new(store.clone()),
            resolver: RedirectResolver::new(store),
        }
    }
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent, env vars may already be set)
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hashlink=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting hashlink on {}:{}", config.host, config.port);
    if let Some(base_url) = &config.base_url {
        tracing::info!("Base URL: {}", base_url);
    }

    let store = open_store(&config).await?;
    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::new(config, store));

    // ── Serve ──────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; links are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redis => {
            let store = RedisStore::connect(&config.redis_url).await?;
            tracing::info!("Connected to Redis at {}", config.redis_url);
            Ok(Arc::new(store))
        }
    }
}

// ── Router ─────────────────────────────────────────────────────────────────

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            get(|| async { "hashlink: POST a URL to /submit as `path`" }),
        )
        .route("/health", get(|| async { axum::http::StatusCode::OK }))
        .route("/submit", post(handlers::api::submit))
        .route("/new10", get(handlers::api::newest))
        .route("/top10", get(handlers::api::top))
        .route("/hits/:code", get(handlers::api::hits))
        .route(
            handlers::redirect::NOT_FOUND_PATH,
            get(handlers::redirect::not_found),
        )
        // Short-code redirect; static routes above take priority
        .route("/:code", get(handlers::redirect::redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
