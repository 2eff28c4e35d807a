//! Account Billing API
//!
//! Subscription lookup plus checkout/portal session creation. The payment
//! backend is an external service; this module only relays the narrow
//! request/response contract (`POST` with the user id, expect `{ url }`).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::db;

// ============================================================================
// Types
// ============================================================================

/// Current subscription view for the account settings screen.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SubscriptionView {
    pub plan: Option<String>,
    pub status: Option<db::SubscriptionStatus>,
    pub current_period_end: Option<chrono::DateTime<chrono::Utc>>,
}

/// `{ url }` relayed from the billing service.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct BillingSessionResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
struct BillingSessionRequest<'a> {
    user_id: &'a str,
    email: Option<&'a str>,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Billing is not configured on this install")]
    NotConfigured,
    #[error("Billing service error")]
    Upstream(#[from] reqwest::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for BillingError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            Self::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "BILLING_NOT_CONFIGURED",
                "Billing is not configured on this install",
            ),
            Self::Upstream(err) => {
                tracing::error!(error = %err, "Billing service call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "BILLING_UPSTREAM",
                    "Billing service error",
                )
            }
            Self::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Database error",
                )
            }
        };
        (
            status,
            Json(serde_json::json!({ "error": code, "message": message })),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/me/subscription - Current subscription, if any
#[utoipa::path(
    get,
    path = "/api/me/subscription",
    tag = "billing",
    responses((status = 200, description = "Subscription state", body = SubscriptionView)),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state))]
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SubscriptionView>, BillingError> {
    let subscription = db::find_subscription(&state.db, auth.id).await?;

    Ok(Json(subscription.map_or(
        SubscriptionView {
            plan: None,
            status: None,
            current_period_end: None,
        },
        |s| SubscriptionView {
            plan: Some(s.plan),
            status: Some(s.status),
            current_period_end: s.current_period_end,
        },
    )))
}

/// POST /api/me/billing/checkout - Create a checkout session
#[utoipa::path(
    post,
    path = "/api/me/billing/checkout",
    tag = "billing",
    responses((status = 200, description = "Checkout session", body = BillingSessionResponse)),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<BillingSessionResponse>, BillingError> {
    call_billing(&state, &auth, "checkout-session").await.map(Json)
}

/// POST /api/me/billing/portal - Create a billing portal session
#[utoipa::path(
    post,
    path = "/api/me/billing/portal",
    tag = "billing",
    responses((status = 200, description = "Portal session", body = BillingSessionResponse)),
    security(("bearer_auth" = [])),
)]
#[tracing::instrument(skip(state))]
pub async fn create_portal_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<BillingSessionResponse>, BillingError> {
    call_billing(&state, &auth, "portal-session").await.map(Json)
}

/// POST to the external billing service and relay its `{ url }`.
async fn call_billing(
    state: &AppState,
    auth: &AuthUser,
    endpoint: &str,
) -> Result<BillingSessionResponse, BillingError> {
    let (Some(base_url), Some(api_key)) = (
        state.config.billing_api_url.as_deref(),
        state.config.billing_api_key.as_deref(),
    ) else {
        return Err(BillingError::NotConfigured);
    };

    let user_id = auth.id.to_string();
    let response = state
        .http
        .post(format!("{}/{endpoint}", base_url.trim_end_matches('/')))
        .bearer_auth(api_key)
        .json(&BillingSessionRequest {
            user_id: &user_id,
            email: auth.email.as_deref(),
        })
        .send()
        .await?
        .error_for_status()?
        .json::<BillingSessionResponse>()
        .await?;

    Ok(response)
}

// ============================================================================
// Router
// ============================================================================

/// Create the billing router. Mounted behind auth middleware only; any
/// signed-in user manages their own subscription.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscription", get(get_subscription))
        .route("/billing/checkout", post(create_checkout_session))
        .route("/billing/portal", post(create_portal_session))
}
