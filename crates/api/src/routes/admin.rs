//! Route definitions for `/admin`.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::{admin, audit};
use crate::state::AppState;

/// Routes mounted at `/admin`. Admin only.
///
/// ```text
/// GET    /users        -> list_users
/// POST   /users        -> create_user
/// DELETE /users/{id}   -> deactivate_user
/// GET    /audit-logs   -> query_audit_logs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}", delete(admin::deactivate_user))
        .route("/audit-logs", get(audit::query_audit_logs))
}
