pub mod admin;
pub mod auth;
pub mod backup;
pub mod centers;
pub mod committees;
pub mod geo;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /auth/login, /auth/refresh                 public
/// /auth/logout, /auth/me                     any authenticated user
///
/// /admin/users, /admin/users/{id}            admin
/// /admin/audit-logs                          admin
///
/// /geo/units[...]                            read: any user, write: editor
/// /geo/validate-chain                        any user
/// /geo/upload                                editor
///
/// /committees, /committees/{id}              read: any user, write: editor
/// /centers, /centers/{id}                    read: any user, write: editor
///
/// /backup, /backup/collections               admin
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        .nest("/geo", geo::router())
        .nest("/committees", committees::router())
        .nest("/centers", centers::router())
        .nest("/backup", backup::router())
}
