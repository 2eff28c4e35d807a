//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;

use axum::{
    extract::State, middleware::from_fn_with_state, routing::get, Json, Router,
};
use dashmap::DashMap;
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{admin, auth, billing, catalog, config::Config, flashcards};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Server configuration
    pub config: Arc<Config>,
    /// Open course-editor sessions, one mutex per operator session
    pub editor_sessions: Arc<DashMap<Uuid, Arc<Mutex<catalog::EditorSession>>>>,
    /// HTTP client for the external billing service
    pub http: reqwest::Client,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            editor_sessions: Arc::new(DashMap::new()),
            http: reqwest::Client::new(),
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Back-office surfaces sit behind the admin resolver.
    let back_office = catalog::router()
        .merge(flashcards::router())
        .layer(from_fn_with_state(state.clone(), admin::require_admin));

    // Protected routes that require authentication
    let protected_routes = Router::new()
        .nest("/api", back_office)
        .nest("/api/admin", admin::router(state.clone()))
        .nest("/api/me", billing::router())
        .layer(from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Auth routes (pass state for middleware)
        .nest("/auth", auth::router(state.clone()))
        // Protected back-office and account routes
        .merge(protected_routes)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Open editor sessions
    editor_sessions: usize,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        editor_sessions: state.editor_sessions.len(),
    })
}
