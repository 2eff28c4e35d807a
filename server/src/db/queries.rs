//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! All query functions include error context logging to aid debugging.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::models::{SecurityViolation, Session, Subscription, User};

/// Log and return a database error with context.
///
/// This helper ensures all database errors are logged with relevant context
/// before being propagated, making production debugging easier.
macro_rules! db_error {
    ($query:expr) => {
        |e| {
            error!(query = $query, error = %e, "Database query failed");
            e
        }
    };
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

// ============================================================================
// User Queries
// ============================================================================

/// Find user by ID.
pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_id", user_id = %id))
}

/// Find user by username.
pub async fn find_user_by_username(pool: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_username", username = %username))
}

/// Check if username exists.
pub async fn username_exists(pool: &PgPool, username: &str) -> sqlx::Result<bool> {
    let result: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(pool)
        .await?;

    Ok(result.0)
}

/// Check if email exists.
pub async fn email_exists(pool: &PgPool, email: &str) -> sqlx::Result<bool> {
    let result: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(result.0)
}

/// Create a new user together with its empty profile row.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    display_name: &str,
    email: Option<&str>,
    password_hash: &str,
) -> sqlx::Result<User> {
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r"
        INSERT INTO users (id, username, display_name, email, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(username)
    .bind(display_name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_error!("create_user", username = %username))?;

    sqlx::query("INSERT INTO profiles (user_id) VALUES ($1)")
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .map_err(db_error!("create_user_profile", user_id = %user.id))?;

    tx.commit().await?;
    Ok(user)
}

/// Update a user's display name and email.
pub async fn update_user_profile(
    pool: &PgPool,
    user_id: Uuid,
    display_name: Option<&str>,
    email: Option<&str>,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        r"
        UPDATE users
        SET display_name = COALESCE($2, display_name),
            email = COALESCE($3, email),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        ",
    )
    .bind(user_id)
    .bind(display_name)
    .bind(email)
    .fetch_one(pool)
    .await
    .map_err(db_error!("update_user_profile", user_id = %user_id))
}

/// Count all users.
pub async fn count_users(pool: &PgPool) -> sqlx::Result<i64> {
    let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users").fetch_one(pool).await?;
    Ok(result.0)
}

/// List users ordered by creation, newest first.
pub async fn list_users(pool: &PgPool, limit: i64, offset: i64) -> sqlx::Result<Vec<User>> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(db_error!("list_users", limit = limit, offset = offset))
}

// ============================================================================
// Session Queries
// ============================================================================

/// Create a refresh-token session.
pub async fn create_session(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> sqlx::Result<Session> {
    sqlx::query_as::<_, Session>(
        r"
        INSERT INTO sessions (id, user_id, token_hash, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        ",
    )
    .bind(id)
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(pool)
    .await
    .map_err(db_error!("create_session", user_id = %user_id))
}

/// Find a live session by refresh-token hash.
pub async fn find_session_by_token_hash(
    pool: &PgPool,
    token_hash: &str,
) -> sqlx::Result<Option<Session>> {
    sqlx::query_as::<_, Session>(
        "SELECT * FROM sessions WHERE token_hash = $1 AND expires_at > NOW()",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("find_session_by_token_hash"))
}

/// Delete a session by refresh-token hash. Returns whether a row existed.
pub async fn delete_session_by_token_hash(pool: &PgPool, token_hash: &str) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await
        .map_err(db_error!("delete_session_by_token_hash"))?;

    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Admin Role Queries
// ============================================================================

/// Fetch the `profiles.is_admin` flag for a user.
pub async fn profile_is_admin(pool: &PgPool, user_id: Uuid) -> sqlx::Result<bool> {
    let result: Option<(bool,)> =
        sqlx::query_as("SELECT is_admin FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(db_error!("profile_is_admin", user_id = %user_id))?;

    Ok(result.is_some_and(|(flag,)| flag))
}

/// Invoke the `is_platform_admin` database function.
pub async fn call_is_platform_admin(pool: &PgPool, user_id: Uuid) -> sqlx::Result<bool> {
    let result: (bool,) = sqlx::query_as("SELECT is_platform_admin($1)")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(db_error!("call_is_platform_admin", user_id = %user_id))?;

    Ok(result.0)
}

/// Grant the platform admin role. Idempotent.
pub async fn grant_admin(pool: &PgPool, user_id: Uuid, granted_by: Uuid) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
        INSERT INTO admin_grants (user_id, granted_by)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO NOTHING
        ",
    )
    .bind(user_id)
    .bind(granted_by)
    .execute(&mut *tx)
    .await
    .map_err(db_error!("grant_admin", user_id = %user_id))?;

    // Keep the profile flag in step so the cheaper cascade checks agree.
    sqlx::query("UPDATE profiles SET is_admin = TRUE, updated_at = NOW() WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error!("grant_admin_profile", user_id = %user_id))?;

    tx.commit().await
}

/// Revoke the platform admin role. Returns whether a grant existed.
pub async fn revoke_admin(pool: &PgPool, user_id: Uuid) -> sqlx::Result<bool> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM admin_grants WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error!("revoke_admin", user_id = %user_id))?;

    sqlx::query("UPDATE profiles SET is_admin = FALSE, updated_at = NOW() WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error!("revoke_admin_profile", user_id = %user_id))?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Security Violation Queries
// ============================================================================

/// Record a security violation for the admin dashboard.
pub async fn record_violation(
    pool: &PgPool,
    user_id: Option<Uuid>,
    kind: &str,
    detail: &str,
) -> sqlx::Result<SecurityViolation> {
    sqlx::query_as::<_, SecurityViolation>(
        r"
        INSERT INTO security_violations (id, user_id, kind, detail)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(kind)
    .bind(detail)
    .fetch_one(pool)
    .await
    .map_err(db_error!("record_violation", kind = %kind))
}

/// List security violations, newest first.
pub async fn list_violations(
    pool: &PgPool,
    unresolved_only: bool,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<SecurityViolation>> {
    sqlx::query_as::<_, SecurityViolation>(
        r"
        SELECT * FROM security_violations
        WHERE ($1 = FALSE OR resolved_at IS NULL)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        ",
    )
    .bind(unresolved_only)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(db_error!("list_violations"))
}

/// Mark a violation resolved. Returns the updated row if it existed.
pub async fn resolve_violation(
    pool: &PgPool,
    id: Uuid,
) -> sqlx::Result<Option<SecurityViolation>> {
    sqlx::query_as::<_, SecurityViolation>(
        r"
        UPDATE security_violations
        SET resolved_at = NOW()
        WHERE id = $1 AND resolved_at IS NULL
        RETURNING *
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("resolve_violation", violation_id = %id))
}

// ============================================================================
// Subscription Queries
// ============================================================================

/// Find a user's subscription, if any.
pub async fn find_subscription(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_subscription", user_id = %user_id))
}
