//! War Thunder Catalog Backend
//!
//! REST catalog of ground vehicles with moderated edits and aggregate statistics,
//! persisted in SQLite.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod moderation;
mod stats;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::DocumentStore;
use moderation::ModerationWorkflow;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub workflow: Arc<ModerationWorkflow>,
}

impl AppState {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        let workflow = Arc::new(ModerationWorkflow::new(store.clone()));
        Self { store, workflow }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting War Thunder Catalog Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let store = Arc::new(DocumentStore::new(pool));

    match config.admin_key.as_deref() {
        Some(key) => {
            let admin = store.upsert_bootstrap_actor(&config.admin_label, key).await?;
            tracing::info!("Bootstrap actor ready: {}", admin.label);
        }
        None => {
            tracing::warn!("No admin key configured (WT_ADMIN_KEY). Only existing actors can sign in!");
        }
    }

    if let Some(seed_file) = &config.seed_file {
        db::import_seed(&store, seed_file).await?;
    }

    // Build router
    let app = create_router(AppState::new(store));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Read-only catalog and statistics (no auth required)
    let public_routes = Router::new()
        .route("/tanks", get(api::list_tanks))
        .route("/tanks/{id}", get(api::get_tank))
        .route("/tanks/nation/{nation}", get(api::list_tanks_by_nation))
        .route("/stats", get(api::get_stats))
        .route("/stats/top", get(api::get_top))
        .route("/stats/ranges", get(api::get_ranges))
        .route("/stats/by-rating", get(api::get_ranges_by_rating))
        .route("/stats/fields/{field}", get(api::get_field_summary));

    let store = state.store.clone();

    let protected_routes = Router::new()
        // Catalog mutations
        .route("/tanks", post(api::create_tank))
        .route("/tanks/{id}", put(api::update_tank))
        .route("/tanks/{id}", delete(api::delete_tank))
        // Review queue
        .route("/pending", get(api::list_pending))
        .route("/pending/mine", get(api::list_own_pending))
        .route("/pending/{id}", get(api::get_pending))
        .route("/pending/{id}/review", post(api::review_pending))
        // Actors
        .route("/actors", post(api::create_actor))
        .route("/actors/me", get(api::current_actor))
        // Resolve the caller before any protected handler runs
        .layer(middleware::from_fn(move |req, next| {
            auth::actor_auth_layer(store.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
