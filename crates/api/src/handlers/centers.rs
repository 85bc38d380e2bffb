//! Handlers for `/centers` (voting centers).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pollsite_core::audit::{action_types, entity_types};
use pollsite_core::error::CoreError;
use pollsite_core::geo_chain::validate_geo_chain;
use pollsite_core::types::DbId;
use pollsite_db::geo_lookup::PgGeoLookup;
use pollsite_db::models::center::{Center, CreateCenter, UpdateCenter};
use pollsite_db::models::geo_unit::GeoRefFilter;
use pollsite_db::repositories::CenterRepo;

use crate::audit_trail;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAuth, RequireEditor};
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Center",
        id,
    })
}

/// Field checks shared by create and update; geo is validated separately.
fn check_fields(name: Option<&str>, voter_count: Option<i32>) -> AppResult<()> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Core(CoreError::Validation(
            "Center name must not be empty".into(),
        )));
    }
    if voter_count.is_some_and(|n| n < 0) {
        return Err(AppError::Core(CoreError::Validation(
            "voter_count must not be negative".into(),
        )));
    }
    Ok(())
}

/// Blank codes are stored as NULL so the partial unique index ignores them.
fn normalize_code(code: Option<String>) -> Option<String> {
    code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

/// GET /api/centers
pub async fn list_centers(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(filter): Query<GeoRefFilter>,
) -> AppResult<Json<DataResponse<Vec<Center>>>> {
    let centers = CenterRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: centers }))
}

/// GET /api/centers/{id}
pub async fn get_center(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Center>>> {
    let center = CenterRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: center }))
}

/// POST /api/centers
pub async fn create_center(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Json(mut input): Json<CreateCenter>,
) -> AppResult<(StatusCode, Json<DataResponse<Center>>)> {
    check_fields(Some(&input.name), input.voter_count)?;
    input.name = input.name.trim().to_string();
    input.code = normalize_code(input.code);
    validate_geo_chain(&PgGeoLookup::new(&state.pool), &input.geo).await?;

    let center = CenterRepo::create(&state.pool, &input).await?;

    tracing::info!(center_id = center.id, user_id = user.user_id, "Center created");
    audit_trail::record(
        &state,
        Some(user.user_id),
        action_types::ENTITY_CREATE,
        Some(entity_types::CENTER),
        Some(center.id),
        Some(serde_json::json!({ "name": center.name, "code": center.code, "geo": center.geo_chain() })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: center })))
}

/// PUT /api/centers/{id}
pub async fn update_center(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateCenter>,
) -> AppResult<Json<DataResponse<Center>>> {
    let existing = CenterRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    check_fields(input.name.as_deref(), input.voter_count)?;
    input.name = input.name.map(|n| n.trim().to_string());
    input.code = normalize_code(input.code);
    input.geo = existing.geo_chain().merged_with(&input.geo);
    validate_geo_chain(&PgGeoLookup::new(&state.pool), &input.geo).await?;

    let center = CenterRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(center_id = id, user_id = user.user_id, "Center updated");
    audit_trail::record(
        &state,
        Some(user.user_id),
        action_types::ENTITY_UPDATE,
        Some(entity_types::CENTER),
        Some(id),
        Some(serde_json::json!({ "name": center.name, "code": center.code, "geo": center.geo_chain() })),
    )
    .await;

    Ok(Json(DataResponse { data: center }))
}

/// DELETE /api/centers/{id}
pub async fn delete_center(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !CenterRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(center_id = id, user_id = user.user_id, "Center deleted");
    audit_trail::record(
        &state,
        Some(user.user_id),
        action_types::ENTITY_DELETE,
        Some(entity_types::CENTER),
        Some(id),
        None,
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
