use axum::{middleware, routing::get, Router};
use clap::Parser;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nt_store::Collection;

mod api;
mod error;
mod tours;

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(name = "nt-hub", version = "0.1.0", about = "Natours tours API")]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,

    /// Path to config file
    #[arg(long, default_value = "nt-hub.toml")]
    config: PathBuf,

    /// JSON file of tours to load at startup (overrides `data.seed_path`)
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Error rendering mode (overrides `server.environment`)
    #[arg(long, value_enum)]
    env: Option<Environment>,
}

// =============================================================================
// Config
// =============================================================================

#[derive(Deserialize, Default, Clone)]
struct Config {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    data: DataConfig,
}

#[derive(Deserialize, Default, Clone)]
struct ServerConfig {
    #[serde(default)]
    environment: Environment,
}

#[derive(Deserialize, Clone)]
struct DataConfig {
    #[serde(default)]
    seed_path: Option<PathBuf>,
    #[serde(default = "default_id_prefix")]
    id_prefix: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            id_prefix: default_id_prefix(),
        }
    }
}

fn default_id_prefix() -> String {
    "tour".into()
}

/// Development responses carry error details, production ones do not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

// =============================================================================
// Application State
// =============================================================================

pub struct AppState {
    tours: Collection,
    environment: Environment,
}

impl AppState {
    pub fn new(tours: Collection, environment: Environment) -> Self {
        Self { tours, environment }
    }
}

fn load_config(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(path).map(|content| toml::from_str(&content)) {
        Ok(Ok(config)) => config,
        Ok(Err(e)) => {
            tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
            Config::default()
        }
        Err(e) => {
            tracing::warn!("Failed to read config {:?}: {}", path, e);
            Config::default()
        }
    }
}

async fn load_seed(tours: &Collection, path: &Path) -> Result<usize, String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("failed to read {:?}: {}", path, e))?;
    let seed: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| format!("invalid JSON in {:?}: {}", path, e))?;
    tours::import(tours, seed).await
}

fn router(state: Arc<AppState>) -> Router {
    with_middleware(routes(), state)
}

fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/v1/tours",
            get(api::get_all_tours).post(api::create_tour),
        )
        // Fixed paths before the `:id` capture
        .route("/api/v1/tours/top-5-cheap", get(api::top_five_cheap))
        .route("/api/v1/tours/tour-stats", get(api::get_tour_stats))
        .route("/api/v1/tours/monthly-plan/:year", get(api::get_monthly_plan))
        .route(
            "/api/v1/tours/:id",
            get(api::get_tour)
                .patch(api::update_tour)
                .delete(api::delete_tour),
        )
}

fn with_middleware(routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    routes
        .fallback(api::not_found)
        // Panics are caught inside the error renderer so they get a JSend body
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::render_errors,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "nt_hub=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = load_config(&args.config);

    let environment = args.env.unwrap_or(config.server.environment);

    let tours = Collection::new("tours")
        .with_id_prefix(config.data.id_prefix.clone())
        .with_unique("name");

    if let Some(path) = args.seed.as_ref().or(config.data.seed_path.as_ref()) {
        match load_seed(&tours, path).await {
            Ok(count) => tracing::info!("Loaded {} tours from {:?}", count, path),
            Err(e) => {
                tracing::error!("Failed to load seed data: {}", e);
                std::process::exit(1);
            }
        }
    }

    let state = Arc::new(AppState::new(tours, environment));
    let app = router(state);

    let addr: SocketAddr = match args.bind.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid bind address {}: {}", args.bind, e);
            std::process::exit(1);
        }
    };

    tracing::info!("╔══════════════════════════════════════════╗");
    tracing::info!("║  NATOURS: Tours API                      ║");
    tracing::info!("╠══════════════════════════════════════════╣");
    tracing::info!("║  http://{}                   ", addr);
    tracing::info!("║  environment: {:?}", environment);
    tracing::info!("╚══════════════════════════════════════════╝");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
