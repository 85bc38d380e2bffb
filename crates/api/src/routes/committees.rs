//! Route definitions for `/committees`.

use axum::routing::get;
use axum::Router;

use crate::handlers::committees;
use crate::state::AppState;

/// Routes mounted at `/committees`.
///
/// ```text
/// GET    /       -> list_committees (?city_id&upazila_id&union_id&ward_id)
/// POST   /       -> create_committee
/// GET    /{id}   -> get_committee
/// PUT    /{id}   -> update_committee
/// DELETE /{id}   -> delete_committee
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(committees::list_committees).post(committees::create_committee),
        )
        .route(
            "/{id}",
            get(committees::get_committee)
                .put(committees::update_committee)
                .delete(committees::delete_committee),
        )
}
