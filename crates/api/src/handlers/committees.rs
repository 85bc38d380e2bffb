//! Handlers for `/committees`.
//!
//! Every write validates the committee's geo chain first.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pollsite_core::audit::{action_types, entity_types};
use pollsite_core::error::CoreError;
use pollsite_core::geo_chain::validate_geo_chain;
use pollsite_core::types::DbId;
use pollsite_db::geo_lookup::PgGeoLookup;
use pollsite_db::models::committee::{Committee, CreateCommittee, UpdateCommittee};
use pollsite_db::models::geo_unit::GeoRefFilter;
use pollsite_db::repositories::CommitteeRepo;

use crate::audit_trail;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAuth, RequireEditor};
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Committee",
        id,
    })
}

fn require_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Committee name must not be empty".into(),
        )));
    }
    Ok(())
}

/// GET /api/committees
pub async fn list_committees(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(filter): Query<GeoRefFilter>,
) -> AppResult<Json<DataResponse<Vec<Committee>>>> {
    let committees = CommitteeRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: committees }))
}

/// GET /api/committees/{id}
pub async fn get_committee(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Committee>>> {
    let committee = CommitteeRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: committee }))
}

/// POST /api/committees
pub async fn create_committee(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Json(mut input): Json<CreateCommittee>,
) -> AppResult<(StatusCode, Json<DataResponse<Committee>>)> {
    require_name(&input.name)?;
    input.name = input.name.trim().to_string();
    validate_geo_chain(&PgGeoLookup::new(&state.pool), &input.geo).await?;

    let committee = CommitteeRepo::create(&state.pool, &input).await?;

    tracing::info!(committee_id = committee.id, user_id = user.user_id, "Committee created");
    audit_trail::record(
        &state,
        Some(user.user_id),
        action_types::ENTITY_CREATE,
        Some(entity_types::COMMITTEE),
        Some(committee.id),
        Some(serde_json::json!({ "name": committee.name, "geo": committee.geo_chain() })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: committee })))
}

/// PUT /api/committees/{id}
///
/// Geo ids in the body replace the stored chain as a whole; the resulting
/// chain is validated before anything is written.
pub async fn update_committee(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateCommittee>,
) -> AppResult<Json<DataResponse<Committee>>> {
    let existing = CommitteeRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    if let Some(name) = &input.name {
        require_name(name)?;
        input.name = Some(name.trim().to_string());
    }
    input.geo = existing.geo_chain().merged_with(&input.geo);
    validate_geo_chain(&PgGeoLookup::new(&state.pool), &input.geo).await?;

    let committee = CommitteeRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(committee_id = id, user_id = user.user_id, "Committee updated");
    audit_trail::record(
        &state,
        Some(user.user_id),
        action_types::ENTITY_UPDATE,
        Some(entity_types::COMMITTEE),
        Some(id),
        Some(serde_json::json!({ "name": committee.name, "geo": committee.geo_chain() })),
    )
    .await;

    Ok(Json(DataResponse { data: committee }))
}

/// DELETE /api/committees/{id}
pub async fn delete_committee(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !CommitteeRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(committee_id = id, user_id = user.user_id, "Committee deleted");
    audit_trail::record(
        &state,
        Some(user.user_id),
        action_types::ENTITY_DELETE,
        Some(entity_types::COMMITTEE),
        Some(id),
        None,
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}
