//! Catalog error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::store::StoreError;

/// Catalog API error type.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Editor session not found (expired or never opened).
    #[error("Editor session not found")]
    SessionNotFound,

    /// Validation error.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A reorder was applied locally but could not be fully persisted.
    ///
    /// Kept distinct from other store failures: silent loss of ordering is
    /// higher-severity, and the operator must reload the editor because the
    /// optimistic local tree is NOT rolled back.
    #[error("Reordering could not be fully saved")]
    ReorderPersistence(#[source] StoreError),

    /// Remote store failure.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Database error from a direct query.
    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": "not_found", "message": format!("{what} not found") }),
            ),
            Self::SessionNotFound => (
                StatusCode::NOT_FOUND,
                serde_json::json!({
                    "error": "session_not_found",
                    "message": "Editor session not found; open the course editor again",
                }),
            ),
            Self::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "validation", "message": msg }),
            ),
            Self::ReorderPersistence(e) => {
                tracing::error!(error = %e, "Reorder persistence failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({
                        "error": "reorder_not_saved",
                        "message": "Reordering could not be fully saved; refresh the course editor before continuing",
                    }),
                )
            }
            Self::Store(StoreError::NotFound(what)) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": "not_found", "message": format!("{what} not found") }),
            ),
            Self::Store(e) => {
                tracing::error!(error = %e, "Catalog store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "store", "message": "Remote store error" }),
                )
            }
            Self::Database(e) => {
                tracing::error!(error = %e, "Catalog database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "database", "message": "Database error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
