//! Admin module types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::resolver::PrincipalDiagnostics;

/// Authenticated admin injected into request extensions once the resolver
/// grants access.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Admin API error type.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Resolver denied access.
    #[error("Admin privileges required")]
    NotAdmin,

    /// Resolver hit its deadline before reaching a verdict.
    #[error("Admin authorization check timed out")]
    CheckTimedOut(PrincipalDiagnostics),

    /// Self-service grants are disabled on this install.
    #[error("Self-service admin grant is disabled")]
    SelfGrantDisabled,

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Validation error.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Database error.
    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::NotAdmin => (
                StatusCode::FORBIDDEN,
                serde_json::json!({
                    "error": "not_admin",
                    "message": "Admin privileges required",
                    // Actionable next steps: the self-service grant screen
                    // and signing out, mirroring the access-denied view.
                    "grant_url": "/api/admin/self-grant",
                    "sign_out_url": "/auth/logout",
                }),
            ),
            Self::CheckTimedOut(diagnostics) => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "error": "admin_check_timeout",
                    "message": "Admin authorization check timed out; retry or reload",
                    "diagnostics": diagnostics,
                }),
            ),
            Self::SelfGrantDisabled => (
                StatusCode::FORBIDDEN,
                serde_json::json!({
                    "error": "self_grant_disabled",
                    "message": "Self-service admin grant is disabled",
                }),
            ),
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({
                    "error": "not_found",
                    "message": format!("{what} not found"),
                }),
            ),
            Self::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "validation", "message": msg }),
            ),
            Self::Database(e) => {
                tracing::error!(error = %e, "Admin database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "database", "message": "Database error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

// Request/response types

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    /// Maximum number of items to return.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Number of items to skip.
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Generic paginated response wrapper.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// User summary for admin listing.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Directly-attached admin flag.
    pub is_admin: bool,
    /// Whether an explicit grant row exists.
    pub has_grant: bool,
}

/// Violation listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ViolationParams {
    /// Only return unresolved violations.
    #[serde(default)]
    pub unresolved: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Headline counts for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub users: i64,
    pub courses: i64,
    pub unresolved_violations: i64,
}
