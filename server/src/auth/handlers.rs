//! Authentication HTTP Handlers

use std::sync::LazyLock;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use validator::Validate;

use super::error::{AuthError, AuthResult};
use super::jwt::{generate_token_pair, validate_refresh_token};
use super::middleware::AuthUser;
use super::password::{hash_password, verify_password};
use crate::api::AppState;
use crate::db::{
    self, create_session, create_user, delete_session_by_token_hash, email_exists,
    find_session_by_token_hash, find_user_by_id, find_user_by_username, update_user_profile,
    username_exists,
};

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-z0-9_]+$").expect("valid username regex"));

// ============================================================================
// Request/Response Types
// ============================================================================

/// Registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username (3-32 lowercase alphanumeric + underscore).
    #[validate(length(min = 3, max = 32), regex(path = *USERNAME_REGEX))]
    pub username: String,
    /// Email address (optional).
    #[validate(email)]
    pub email: Option<String>,
    /// Password (8-128 characters).
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    /// Display name (optional, defaults to username).
    #[validate(length(max = 64))]
    pub display_name: Option<String>,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Token refresh request.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token.
    pub refresh_token: String,
}

/// Logout request.
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    /// Refresh token to invalidate.
    pub refresh_token: String,
}

/// Authentication response with tokens.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Access token (short-lived).
    pub access_token: String,
    /// Refresh token (long-lived).
    pub refresh_token: String,
    /// Access token expiry in seconds.
    pub expires_in: i64,
    /// Token type (always "Bearer").
    pub token_type: String,
}

/// User profile response.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    /// User ID.
    pub id: Uuid,
    /// Username.
    pub username: String,
    /// Display name.
    pub display_name: String,
    /// Email (if set).
    pub email: Option<String>,
}

/// Profile update request.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// New display name.
    #[validate(length(min = 1, max = 64))]
    pub display_name: Option<String>,
    /// New email address.
    #[validate(email)]
    pub email: Option<String>,
}

// ============================================================================
// Helpers
// ============================================================================

/// SHA-256 hex digest of a refresh token for session storage.
fn hash_refresh_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn validation_error(e: &validator::ValidationErrors) -> AuthError {
    AuthError::Validation(e.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new user.
///
/// `POST /auth/register`
#[tracing::instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AuthResult<(StatusCode, Json<AuthResponse>)> {
    body.validate().map_err(|e| validation_error(&e))?;

    if username_exists(&state.db, &body.username).await? {
        return Err(AuthError::UserAlreadyExists);
    }
    if let Some(ref email) = body.email {
        if email_exists(&state.db, email).await? {
            return Err(AuthError::UserAlreadyExists);
        }
    }

    let password_hash = hash_password(&body.password)?;
    let display_name = body.display_name.as_deref().unwrap_or(&body.username);

    let user = create_user(
        &state.db,
        &body.username,
        display_name,
        body.email.as_deref(),
        &password_hash,
    )
    .await?;

    let response = issue_tokens(&state, user.id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with username and password.
///
/// `POST /auth/login`
#[tracing::instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AuthResult<Json<AuthResponse>> {
    let Some(user) = find_user_by_username(&state.db, &body.username).await? else {
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(&body.password, &user.password_hash)? {
        // Feed the security-violation dashboard; the login failure itself
        // is still reported to the caller as a plain credentials error.
        if let Err(e) = db::record_violation(
            &state.db,
            Some(user.id),
            "failed_login",
            &format!("Failed password login for '{}'", user.username),
        )
        .await
        {
            tracing::warn!(error = %e, "Failed to record login violation");
        }
        return Err(AuthError::InvalidCredentials);
    }

    let response = issue_tokens(&state, user.id).await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new token pair.
///
/// `POST /auth/refresh`
#[tracing::instrument(skip(state, body))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AuthResult<Json<AuthResponse>> {
    let claims = validate_refresh_token(&body.refresh_token, &state.config.jwt_secret)?;
    let user_id: Uuid = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

    let token_hash = hash_refresh_token(&body.refresh_token);
    let Some(_session) = find_session_by_token_hash(&state.db, &token_hash).await? else {
        // Cryptographically valid token with no live session: either it was
        // rotated already (token reuse) or it was revoked. Surface it.
        if let Err(e) = db::record_violation(
            &state.db,
            Some(user_id),
            "refresh_token_reuse",
            "Refresh token presented after rotation or revocation",
        )
        .await
        {
            tracing::warn!(error = %e, "Failed to record token-reuse violation");
        }
        return Err(AuthError::InvalidToken);
    };

    // Rotate: invalidate the old session before minting a new pair.
    delete_session_by_token_hash(&state.db, &token_hash).await?;

    let response = issue_tokens(&state, user_id).await?;
    Ok(Json(response))
}

/// Invalidate the presented refresh token.
///
/// `POST /auth/logout`
#[tracing::instrument(skip(state, body))]
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<LogoutRequest>,
) -> AuthResult<StatusCode> {
    let token_hash = hash_refresh_token(&body.refresh_token);
    delete_session_by_token_hash(&state.db, &token_hash).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the current user's profile.
///
/// `GET /auth/me`
#[tracing::instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> AuthResult<Json<UserProfile>> {
    let user = find_user_by_id(&state.db, auth.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(UserProfile {
        id: user.id,
        username: user.username,
        display_name: user.display_name,
        email: user.email,
    }))
}

/// Update the current user's profile.
///
/// `POST /auth/me`
#[tracing::instrument(skip(state, body))]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> AuthResult<Json<UserProfile>> {
    body.validate().map_err(|e| validation_error(&e))?;

    if let Some(ref email) = body.email {
        if email_exists(&state.db, email).await? {
            return Err(AuthError::UserAlreadyExists);
        }
    }

    let user = update_user_profile(
        &state.db,
        auth.id,
        body.display_name.as_deref(),
        body.email.as_deref(),
    )
    .await?;

    Ok(Json(UserProfile {
        id: user.id,
        username: user.username,
        display_name: user.display_name,
        email: user.email,
    }))
}

/// Mint a token pair and persist the refresh session.
async fn issue_tokens(state: &AppState, user_id: Uuid) -> AuthResult<AuthResponse> {
    let tokens = generate_token_pair(
        user_id,
        &state.config.jwt_secret,
        state.config.jwt_access_expiry,
        state.config.jwt_refresh_expiry,
    )?;

    let expires_at = Utc::now() + Duration::seconds(state.config.jwt_refresh_expiry);
    create_session(
        &state.db,
        tokens.refresh_token_id,
        user_id,
        &hash_refresh_token(&tokens.refresh_token),
        expires_at,
    )
    .await?;

    Ok(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.access_expires_in,
        token_type: "Bearer".to_string(),
    })
}
