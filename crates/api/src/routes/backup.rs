//! Route definitions for `/backup`.

use axum::routing::get;
use axum::Router;

use crate::handlers::backup;
use crate::state::AppState;

/// Routes mounted at `/backup`. Admin only.
///
/// ```text
/// GET  /              -> export_backup (?gzip&collections)
/// POST /              -> restore_backup (?mode&dry&collections)
/// GET  /collections   -> list_collections
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(backup::export_backup).post(backup::restore_backup))
        .route("/collections", get(backup::list_collections))
}
