//! Admin authorization middleware.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::resolver::{resolve_admin, AdminDecision, PgDirectory};
use super::types::{AdminError, AdminUser};
use crate::api::AppState;
use crate::auth::AuthUser;

/// Middleware that requires the principal to pass the admin resolver.
///
/// Runs after `require_auth`; an absent principal means the auth layer was
/// skipped and is treated as not-admin. A timed-out cascade is reported
/// distinctly so the operator gets a retry affordance instead of a denial.
#[tracing::instrument(skip(state, request, next))]
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AdminError> {
    let principal = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AdminError::NotAdmin)?;

    let directory = PgDirectory::new(state.db.clone());
    let decision =
        resolve_admin(&principal, &directory, state.config.admin_check_timeout()).await;

    match decision {
        AdminDecision::Admin => {
            let admin_user = AdminUser {
                user_id: principal.id,
                username: principal.username,
            };
            request.extensions_mut().insert(admin_user);
            Ok(next.run(request).await)
        }
        AdminDecision::NotAdmin => Err(AdminError::NotAdmin),
        AdminDecision::TimedOut { diagnostics } => Err(AdminError::CheckTimedOut(diagnostics)),
    }
}
