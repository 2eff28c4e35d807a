//! Admin Back-Office Module
//!
//! The authorization resolver cascade that gates every admin screen, plus
//! the admin-only endpoints: user/role administration, the
//! security-violation dashboard, and headline stats.

pub mod handlers;
pub mod middleware;
pub mod resolver;
pub mod types;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::api::AppState;

pub use middleware::require_admin;
pub use resolver::{resolve_admin, AdminDecision, AdminDirectory, PgDirectory};
pub use types::{AdminError, AdminUser};

/// Create the admin router.
///
/// Most routes require the resolver to grant access (applied via
/// middleware). `/status` and `/self-grant` are reachable by any
/// authenticated user: the first reports the resolver's decision, the
/// second is the self-service grant screen's backend (no-op unless enabled
/// in config).
pub fn router(state: AppState) -> Router<AppState> {
    let admin_routes = Router::new()
        .route("/stats", get(handlers::get_admin_stats))
        .route("/users", get(handlers::list_users))
        .route(
            "/users/{id}/admin",
            post(handlers::grant_admin_role).delete(handlers::revoke_admin_role),
        )
        .route("/violations", get(handlers::list_violations))
        .route("/violations/{id}/resolve", post(handlers::resolve_violation))
        .layer(from_fn_with_state(state, require_admin));

    Router::new()
        .route("/status", get(handlers::get_admin_status))
        .route("/self-grant", post(handlers::self_grant))
        .merge(admin_routes)
}
