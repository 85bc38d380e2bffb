//! Route definitions for `/geo`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::geo;
use crate::state::AppState;

/// Routes mounted at `/geo`.
///
/// ```text
/// GET    /units                 -> list_units
/// POST   /units                 -> create_unit
/// POST   /units/swap-sort       -> swap_sort
/// GET    /units/{id}            -> get_unit
/// PUT    /units/{id}            -> update_unit
/// DELETE /units/{id}            -> delete_unit
/// GET    /units/{id}/children   -> list_children
/// PUT    /units/{id}/parent     -> reparent_unit
/// POST   /validate-chain        -> validate_chain
/// POST   /upload                -> upload_units (?dry=0|1)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/units", get(geo::list_units).post(geo::create_unit))
        .route("/units/swap-sort", post(geo::swap_sort))
        .route(
            "/units/{id}",
            get(geo::get_unit)
                .put(geo::update_unit)
                .delete(geo::delete_unit),
        )
        .route("/units/{id}/children", get(geo::list_children))
        .route("/units/{id}/parent", put(geo::reparent_unit))
        .route("/validate-chain", post(geo::validate_chain))
        .route("/upload", post(geo::upload_units))
}
