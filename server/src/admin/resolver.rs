//! Admin authorization resolution.
//!
//! Decides whether a signed-in principal may use the admin back-office by
//! running an ordered cascade of increasingly expensive checks,
//! short-circuiting on the first success:
//!
//! 1. Primary admin flag in the principal's metadata bag
//! 2. Legacy admin flag in the metadata bag
//! 3. Admin flag attached directly to the principal
//! 4. Profile-table admin flag (lookup errors fall through)
//! 5. The `is_platform_admin` procedure — its result, or error, is final
//!
//! Steps 1-3 are free (no I/O) and cover the common case; steps 4-5 exist
//! because the metadata bag can lag the authoritative store after an
//! out-of-band promotion. The whole cascade runs under a hard deadline so a
//! hung store can never leave the operator on an indefinite spinner; the
//! deadline is a UX safety valve, not a security boundary. Every failure
//! path resolves to `NotAdmin` (fail closed) and nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::db;

/// Primary metadata key carrying an admin flag.
pub const ADMIN_FLAG_KEY: &str = "is_admin";

/// Legacy metadata key still honored for accounts promoted by older tooling.
pub const LEGACY_ADMIN_FLAG_KEY: &str = "admin";

/// Error from a directory lookup.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Database error.
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    /// Directory backend unavailable.
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Remote checks consulted when the principal's own data is inconclusive.
///
/// A trait seam so tests can drive the cascade with scripted directories
/// instead of a live store.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Profile-table admin flag (cascade step 4).
    async fn profile_is_admin(&self, user_id: Uuid) -> Result<bool, DirectoryError>;

    /// Authoritative "is this user an admin" procedure (cascade step 5).
    async fn is_platform_admin(&self, user_id: Uuid) -> Result<bool, DirectoryError>;
}

/// `PostgreSQL`-backed directory used in production.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminDirectory for PgDirectory {
    async fn profile_is_admin(&self, user_id: Uuid) -> Result<bool, DirectoryError> {
        Ok(db::profile_is_admin(&self.pool, user_id).await?)
    }

    async fn is_platform_admin(&self, user_id: Uuid) -> Result<bool, DirectoryError> {
        Ok(db::call_is_platform_admin(&self.pool, user_id).await?)
    }
}

/// Diagnostic snapshot of the principal, surfaced when the cascade times
/// out so the operator can troubleshoot manually.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalDiagnostics {
    pub id: Uuid,
    pub email: Option<String>,
    pub metadata: Value,
}

impl From<&AuthUser> for PrincipalDiagnostics {
    fn from(principal: &AuthUser) -> Self {
        Self {
            id: principal.id,
            email: principal.email.clone(),
            metadata: principal.metadata.clone(),
        }
    }
}

/// Terminal authorization decision.
///
/// The original tri-state's `Unknown` is the not-yet-resolved future and
/// has no variant here.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AdminDecision {
    /// Principal may use the admin back-office.
    Admin,
    /// Principal is not an admin (or every check failed).
    NotAdmin,
    /// The deadline fired before any check concluded.
    TimedOut {
        diagnostics: PrincipalDiagnostics,
    },
}

impl AdminDecision {
    /// Whether this decision grants access.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Interpret a metadata value as an admin flag.
///
/// The bag is written by assorted tooling, so `true`, `"true"`, `"1"` and
/// nonzero integers all count.
fn metadata_flag(metadata: &Value, key: &str) -> bool {
    match metadata.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(s)) => s == "true" || s == "1",
        Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
        _ => false,
    }
}

/// Resolve the principal's admin status.
///
/// Local checks run synchronously before any directory future is polled, so
/// a principal with a metadata flag resolves without touching the store.
/// The deadline covers the remote cascade as a whole.
pub async fn resolve_admin<D: AdminDirectory + ?Sized>(
    principal: &AuthUser,
    directory: &D,
    deadline: Duration,
) -> AdminDecision {
    if metadata_flag(&principal.metadata, ADMIN_FLAG_KEY)
        || metadata_flag(&principal.metadata, LEGACY_ADMIN_FLAG_KEY)
        || principal.is_admin
    {
        return AdminDecision::Admin;
    }

    match tokio::time::timeout(deadline, remote_cascade(principal.id, directory)).await {
        Ok(decision) => decision,
        Err(_elapsed) => {
            tracing::warn!(
                user_id = %principal.id,
                deadline_secs = deadline.as_secs(),
                "Admin authorization check timed out"
            );
            AdminDecision::TimedOut {
                diagnostics: PrincipalDiagnostics::from(principal),
            }
        }
    }
}

/// Cascade steps 4-5.
async fn remote_cascade<D: AdminDirectory + ?Sized>(user_id: Uuid, directory: &D) -> AdminDecision {
    match directory.profile_is_admin(user_id).await {
        Ok(true) => return AdminDecision::Admin,
        Ok(false) => {}
        Err(e) => {
            // The profile row is a cache of the authoritative grant; a
            // lookup failure falls through to the final procedure.
            tracing::warn!(user_id = %user_id, error = %e, "Profile admin lookup failed");
        }
    }

    match directory.is_platform_admin(user_id).await {
        Ok(flag) => {
            if flag {
                AdminDecision::Admin
            } else {
                AdminDecision::NotAdmin
            }
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Admin procedure failed; denying");
            AdminDecision::NotAdmin
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    const DEADLINE: Duration = Duration::from_secs(8);

    /// Scripted directory: `None` hangs forever, `Some(Err)` fails,
    /// `Some(Ok(flag))` answers. Counts calls per step.
    struct ScriptedDirectory {
        profile: Option<Result<bool, ()>>,
        procedure: Option<Result<bool, ()>>,
        profile_calls: AtomicUsize,
        procedure_calls: AtomicUsize,
    }

    impl ScriptedDirectory {
        fn new(profile: Option<Result<bool, ()>>, procedure: Option<Result<bool, ()>>) -> Self {
            Self {
                profile,
                procedure,
                profile_calls: AtomicUsize::new(0),
                procedure_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> (usize, usize) {
            (
                self.profile_calls.load(Ordering::SeqCst),
                self.procedure_calls.load(Ordering::SeqCst),
            )
        }
    }

    #[async_trait]
    impl AdminDirectory for ScriptedDirectory {
        async fn profile_is_admin(&self, _user_id: Uuid) -> Result<bool, DirectoryError> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            match self.profile {
                Some(Ok(flag)) => Ok(flag),
                Some(Err(())) => Err(DirectoryError::Unavailable("profile".into())),
                None => futures::future::pending().await,
            }
        }

        async fn is_platform_admin(&self, _user_id: Uuid) -> Result<bool, DirectoryError> {
            self.procedure_calls.fetch_add(1, Ordering::SeqCst);
            match self.procedure {
                Some(Ok(flag)) => Ok(flag),
                Some(Err(())) => Err(DirectoryError::Unavailable("procedure".into())),
                None => futures::future::pending().await,
            }
        }
    }

    fn principal(metadata: Value, is_admin: bool) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: "operator".to_string(),
            display_name: "Operator".to_string(),
            email: Some("operator@example.com".to_string()),
            metadata,
            is_admin,
        }
    }

    #[tokio::test]
    async fn test_primary_metadata_flag_short_circuits_without_network() {
        let directory = ScriptedDirectory::new(Some(Ok(false)), Some(Ok(false)));
        let principal = principal(json!({ "is_admin": true }), false);

        let decision = resolve_admin(&principal, &directory, DEADLINE).await;

        assert!(decision.is_admin());
        assert_eq!(directory.calls(), (0, 0));
    }

    #[tokio::test]
    async fn test_legacy_metadata_flag_grants() {
        let directory = ScriptedDirectory::new(Some(Ok(false)), Some(Ok(false)));
        let principal = principal(json!({ "admin": true }), false);

        let decision = resolve_admin(&principal, &directory, DEADLINE).await;

        assert!(decision.is_admin());
        assert_eq!(directory.calls(), (0, 0));
    }

    #[tokio::test]
    async fn test_direct_attribute_grants() {
        let directory = ScriptedDirectory::new(Some(Ok(false)), Some(Ok(false)));
        let principal = principal(json!({}), true);

        let decision = resolve_admin(&principal, &directory, DEADLINE).await;

        assert!(decision.is_admin());
        assert_eq!(directory.calls(), (0, 0));
    }

    #[tokio::test]
    async fn test_string_true_metadata_counts() {
        let directory = ScriptedDirectory::new(Some(Ok(false)), Some(Ok(false)));
        let principal = principal(json!({ "is_admin": "true" }), false);

        assert!(resolve_admin(&principal, &directory, DEADLINE).await.is_admin());
    }

    #[tokio::test]
    async fn test_falsy_metadata_does_not_grant() {
        let directory = ScriptedDirectory::new(Some(Ok(false)), Some(Ok(false)));
        let principal = principal(
            json!({ "is_admin": false, "admin": "no", "other": 1 }),
            false,
        );

        let decision = resolve_admin(&principal, &directory, DEADLINE).await;

        assert!(!decision.is_admin());
        // Both remote steps consulted before denying.
        assert_eq!(directory.calls(), (1, 1));
    }

    #[tokio::test]
    async fn test_profile_flag_grants_without_procedure_call() {
        let directory = ScriptedDirectory::new(Some(Ok(true)), Some(Ok(false)));
        let principal = principal(json!({}), false);

        let decision = resolve_admin(&principal, &directory, DEADLINE).await;

        assert!(decision.is_admin());
        assert_eq!(directory.calls(), (1, 0));
    }

    #[tokio::test]
    async fn test_profile_error_falls_through_to_procedure() {
        let directory = ScriptedDirectory::new(Some(Err(())), Some(Ok(true)));
        let principal = principal(json!({}), false);

        let decision = resolve_admin(&principal, &directory, DEADLINE).await;

        assert!(decision.is_admin());
        assert_eq!(directory.calls(), (1, 1));
    }

    #[tokio::test]
    async fn test_fail_closed_when_everything_denies_or_errors() {
        let directory = ScriptedDirectory::new(Some(Err(())), Some(Err(())));
        let principal = principal(json!({}), false);

        let decision = resolve_admin(&principal, &directory, DEADLINE).await;

        assert!(matches!(decision, AdminDecision::NotAdmin));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_directory_times_out_at_deadline() {
        let directory = ScriptedDirectory::new(None, None);
        let principal = principal(json!({}), false);

        let started = tokio::time::Instant::now();
        let decision = resolve_admin(&principal, &directory, DEADLINE).await;

        assert_eq!(started.elapsed(), DEADLINE);
        let AdminDecision::TimedOut { diagnostics } = decision else {
            panic!("expected timeout, got {decision:?}");
        };
        assert_eq!(diagnostics.id, principal.id);
        assert_eq!(diagnostics.email.as_deref(), Some("operator@example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_metadata_admin_resolves_before_any_await() {
        // Even with a directory that would hang forever, a metadata-flagged
        // principal resolves immediately: no time passes on the paused clock.
        let directory = ScriptedDirectory::new(None, None);
        let principal = principal(json!({ "is_admin": true }), false);

        let started = tokio::time::Instant::now();
        let decision = resolve_admin(&principal, &directory, DEADLINE).await;

        assert!(decision.is_admin());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
