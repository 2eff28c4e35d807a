//! Admin API handlers.
//!
//! User/role administration, the security-violation dashboard, headline
//! stats, and the self-service admin-grant diagnostic endpoint. All routes
//! except `/status` and `/self-grant` sit behind [`super::require_admin`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::db::{self, SecurityViolation};

use super::resolver::{resolve_admin, AdminDecision, PgDirectory};
use super::types::{
    AdminError, AdminStats, AdminUser, PaginatedResponse, PaginationParams, UserSummary,
    ViolationParams,
};

// ============================================================================
// Status
// ============================================================================

/// Get the resolver's decision for the current principal.
///
/// `GET /api/admin/status`
///
/// Available to any authenticated user; this is how the front-end decides
/// between the admin UI, the access-denied view, and the timeout view.
#[tracing::instrument(skip(state))]
pub async fn get_admin_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Json<AdminDecision> {
    let directory = PgDirectory::new(state.db.clone());
    let decision = resolve_admin(&auth, &directory, state.config.admin_check_timeout()).await;
    Json(decision)
}

// ============================================================================
// Users & roles
// ============================================================================

/// List users with their admin flags.
///
/// `GET /api/admin/users`
#[tracing::instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<UserSummary>>, AdminError> {
    let limit = params.limit.clamp(1, 200);

    let items = sqlx::query_as::<_, UserSummary>(
        r"
        SELECT
            u.id, u.username, u.display_name, u.email, u.created_at, u.is_admin,
            EXISTS(SELECT 1 FROM admin_grants g WHERE g.user_id = u.id) AS has_grant
        FROM users u
        ORDER BY u.created_at DESC
        LIMIT $1 OFFSET $2
        ",
    )
    .bind(limit)
    .bind(params.offset)
    .fetch_all(&state.db)
    .await?;

    let total = db::count_users(&state.db).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        limit,
        offset: params.offset,
    }))
}

/// Grant the platform admin role to a user.
///
/// `POST /api/admin/users/{id}/admin`
#[tracing::instrument(skip(state))]
pub async fn grant_admin_role(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AdminError> {
    if db::find_user_by_id(&state.db, user_id).await?.is_none() {
        return Err(AdminError::NotFound("User".to_string()));
    }

    db::grant_admin(&state.db, user_id, admin.user_id).await?;
    tracing::info!(target_id = %user_id, granted_by = %admin.user_id, "Admin role granted");

    Ok(StatusCode::NO_CONTENT)
}

/// Revoke the platform admin role from a user.
///
/// `DELETE /api/admin/users/{id}/admin`
#[tracing::instrument(skip(state))]
pub async fn revoke_admin_role(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AdminError> {
    if !db::revoke_admin(&state.db, user_id).await? {
        return Err(AdminError::NotFound("Admin grant".to_string()));
    }
    tracing::info!(target_id = %user_id, revoked_by = %admin.user_id, "Admin role revoked");

    Ok(StatusCode::NO_CONTENT)
}

/// Grant the admin role to the calling user.
///
/// `POST /api/admin/self-grant`
///
/// The back-end of the self-service grant screen linked from the
/// access-denied view. Only honored when `ADMIN_ALLOW_SELF_GRANT` is set;
/// production installs leave it off.
#[tracing::instrument(skip(state))]
pub async fn self_grant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<StatusCode, AdminError> {
    if !state.config.admin_allow_self_grant {
        return Err(AdminError::SelfGrantDisabled);
    }

    db::grant_admin(&state.db, auth.id, auth.id).await?;
    tracing::info!(user_id = %auth.id, "Self-service admin grant");

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Security violations
// ============================================================================

/// List security violations.
///
/// `GET /api/admin/violations`
#[tracing::instrument(skip(state))]
pub async fn list_violations(
    State(state): State<AppState>,
    Query(params): Query<ViolationParams>,
) -> Result<Json<Vec<SecurityViolation>>, AdminError> {
    let limit = params.limit.clamp(1, 200);
    let violations =
        db::list_violations(&state.db, params.unresolved, limit, params.offset).await?;
    Ok(Json(violations))
}

/// Mark a violation as resolved.
///
/// `POST /api/admin/violations/{id}/resolve`
#[tracing::instrument(skip(state))]
pub async fn resolve_violation(
    State(state): State<AppState>,
    Path(violation_id): Path<Uuid>,
) -> Result<Json<SecurityViolation>, AdminError> {
    let violation = db::resolve_violation(&state.db, violation_id)
        .await?
        .ok_or_else(|| AdminError::NotFound("Violation".to_string()))?;

    Ok(Json(violation))
}

// ============================================================================
// Stats
// ============================================================================

/// Headline counts for the dashboard.
///
/// `GET /api/admin/stats`
#[tracing::instrument(skip(state))]
pub async fn get_admin_stats(
    State(state): State<AppState>,
) -> Result<Json<AdminStats>, AdminError> {
    let users = db::count_users(&state.db).await?;

    let courses: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM courses")
        .fetch_one(&state.db)
        .await?;

    let unresolved: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM security_violations WHERE resolved_at IS NULL")
            .fetch_one(&state.db)
            .await?;

    Ok(Json(AdminStats {
        users,
        courses: courses.0,
        unresolved_violations: unresolved.0,
    }))
}
