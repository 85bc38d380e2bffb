//! Handlers for `/geo`: the unit tree, geo-chain validation and bulk upload.
//!
//! Reads need any authenticated user; writes need the editor role.

use std::collections::HashMap;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pollsite_core::audit::{action_types, entity_types};
use pollsite_core::error::CoreError;
use pollsite_core::geo::{
    check_placement, check_reparent, check_swap, compute_ancestors, generate_slug, record_type,
    validate_name, GeoError, GeoUnitType,
};
use pollsite_core::geo_chain::{validate_geo_chain, GeoChain, GeoChainInput};
use pollsite_core::geo_upload::{parse_upload_csv, plan_upload, ParentRef, UploadAction, UploadPlan};
use pollsite_core::types::DbId;
use pollsite_db::geo_lookup::PgGeoLookup;
use pollsite_db::models::geo_unit::{GeoUnit, GeoUnitFilter, NewGeoUnit, UpdateGeoUnit};
use pollsite_db::repositories::GeoUnitRepo;
use serde::{Deserialize, Serialize};

use crate::audit_trail;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAuth, RequireEditor};
use crate::query::flag;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::upload::read_file_field;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateGeoUnitRequest {
    #[serde(rename = "type")]
    pub unit_type: String,
    pub name: String,
    pub parent_id: Option<DbId>,
    pub code: Option<String>,
    pub sort: Option<i32>,
    pub active: Option<bool>,
    pub shape: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ReparentRequest {
    /// `null` moves the unit to the top level.
    pub parent_id: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct SwapSortRequest {
    pub a_id: DbId,
    pub b_id: DbId,
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    #[serde(default, deserialize_with = "flag")]
    pub dry: bool,
}

/// A planned row that could not be inserted during commit.
#[derive(Debug, Serialize)]
pub struct UploadFailure {
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResult {
    pub dry_run: bool,
    pub plan: UploadPlan,
    /// Units actually inserted; always 0 on a dry run.
    pub created: usize,
    pub failures: Vec<UploadFailure>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_unit(state: &AppState, id: DbId) -> AppResult<GeoUnit> {
    GeoUnitRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "GeoUnit",
            id,
        }))
}

/// Load a referenced parent. A dangling reference is bad input, not a 404.
async fn load_parent(state: &AppState, parent_id: Option<DbId>) -> AppResult<Option<GeoUnit>> {
    let Some(id) = parent_id else {
        return Ok(None);
    };
    GeoUnitRepo::find_by_id(&state.pool, id)
        .await?
        .map(Some)
        .ok_or_else(|| AppError::Geo(GeoError::Invalid(format!("Parent geo unit {id} not found"))))
}

/// Fail with `Duplicate` if another unit already occupies the slot.
async fn ensure_slot_free(
    state: &AppState,
    unit_type: &str,
    parent_id: Option<DbId>,
    slug: &str,
    except: Option<DbId>,
) -> AppResult<()> {
    match GeoUnitRepo::find_by_slot(&state.pool, unit_type, parent_id, slug).await? {
        Some(other) if Some(other.id) != except => Err(AppError::Geo(GeoError::Duplicate {
            unit_type: unit_type.to_string(),
            slug: slug.to_string(),
        })),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Unit CRUD
// ---------------------------------------------------------------------------

/// GET /api/geo/units
pub async fn list_units(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(filter): Query<GeoUnitFilter>,
) -> AppResult<Json<DataResponse<Vec<GeoUnit>>>> {
    if let Some(t) = &filter.unit_type {
        t.parse::<GeoUnitType>()?;
    }
    let units = GeoUnitRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: units }))
}

/// POST /api/geo/units
pub async fn create_unit(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Json(input): Json<CreateGeoUnitRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<GeoUnit>>)> {
    let unit_type: GeoUnitType = input.unit_type.parse()?;
    validate_name(&input.name)?;

    let parent = load_parent(&state, input.parent_id).await?;
    let parent_type = parent.as_ref().map(record_type).transpose()?;
    check_placement(unit_type, parent_type)?;

    let name = input.name.trim().to_string();
    let slug = generate_slug(&name);
    ensure_slot_free(&state, unit_type.as_str(), input.parent_id, &slug, None).await?;

    let unit = GeoUnitRepo::create(
        &state.pool,
        &NewGeoUnit {
            unit_type: unit_type.as_str().to_string(),
            name,
            slug,
            code: input.code,
            parent_id: input.parent_id,
            ancestors: compute_ancestors(parent.as_ref()),
            sort: input.sort.unwrap_or(0),
            active: input.active.unwrap_or(true),
            shape: input.shape,
        },
    )
    .await?;

    tracing::info!(unit_id = unit.id, unit_type = %unit.unit_type, user_id = user.user_id, "Geo unit created");
    audit_trail::record(
        &state,
        Some(user.user_id),
        action_types::ENTITY_CREATE,
        Some(entity_types::GEO_UNIT),
        Some(unit.id),
        Some(serde_json::json!({ "type": unit.unit_type, "name": unit.name, "parent_id": unit.parent_id })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: unit })))
}

/// GET /api/geo/units/{id}
pub async fn get_unit(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<GeoUnit>>> {
    let unit = load_unit(&state, id).await?;
    Ok(Json(DataResponse { data: unit }))
}

/// GET /api/geo/units/{id}/children
pub async fn list_children(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<GeoUnit>>>> {
    load_unit(&state, id).await?;
    let children = GeoUnitRepo::children(&state.pool, id).await?;
    Ok(Json(DataResponse { data: children }))
}

/// PUT /api/geo/units/{id}
///
/// A rename recomputes the slug and re-checks uniqueness under the same parent.
pub async fn update_unit(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateGeoUnit>,
) -> AppResult<Json<DataResponse<GeoUnit>>> {
    let existing = load_unit(&state, id).await?;

    if let Some(name) = input.name.take() {
        validate_name(&name)?;
        let name = name.trim().to_string();
        let slug = generate_slug(&name);
        if slug != existing.slug {
            ensure_slot_free(&state, &existing.unit_type, existing.parent_id, &slug, Some(id))
                .await?;
        }
        input.name = Some(name);
        input.slug = Some(slug);
    }

    let unit = GeoUnitRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "GeoUnit",
            id,
        }))?;

    tracing::info!(unit_id = id, user_id = user.user_id, "Geo unit updated");
    audit_trail::record(
        &state,
        Some(user.user_id),
        action_types::ENTITY_UPDATE,
        Some(entity_types::GEO_UNIT),
        Some(id),
        Some(serde_json::json!({ "name": unit.name, "slug": unit.slug, "active": unit.active })),
    )
    .await;

    Ok(Json(DataResponse { data: unit }))
}

/// PUT /api/geo/units/{id}/parent
///
/// Moves the unit and rewrites its descendants' ancestor paths atomically.
/// Refused with `InUse` while a committee or center references the unit or
/// anything beneath it, since their stored chains would stop validating.
pub async fn reparent_unit(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<DbId>,
    Json(input): Json<ReparentRequest>,
) -> AppResult<Json<DataResponse<GeoUnit>>> {
    let node = load_unit(&state, id).await?;
    let parent = load_parent(&state, input.parent_id).await?;
    check_reparent(&node, parent.as_ref())?;

    if node.parent_id == input.parent_id {
        return Ok(Json(DataResponse { data: node }));
    }
    let references = GeoUnitRepo::count_subtree_references(&state.pool, id).await?;
    if references > 0 {
        return Err(AppError::Geo(GeoError::InUse { id, references }));
    }
    ensure_slot_free(&state, &node.unit_type, input.parent_id, &node.slug, Some(id)).await?;

    let ancestors = compute_ancestors(parent.as_ref());
    let moved = GeoUnitRepo::reparent(&state.pool, id, input.parent_id, &ancestors)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "GeoUnit",
            id,
        }))?;

    tracing::info!(
        unit_id = id,
        from = ?node.parent_id,
        to = ?input.parent_id,
        user_id = user.user_id,
        "Geo unit moved",
    );
    audit_trail::record(
        &state,
        Some(user.user_id),
        action_types::ENTITY_UPDATE,
        Some(entity_types::GEO_UNIT),
        Some(id),
        Some(serde_json::json!({ "from_parent_id": node.parent_id, "to_parent_id": input.parent_id })),
    )
    .await;

    Ok(Json(DataResponse { data: moved }))
}

/// POST /api/geo/units/swap-sort
pub async fn swap_sort(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Json(input): Json<SwapSortRequest>,
) -> AppResult<Json<DataResponse<Vec<GeoUnit>>>> {
    let a = load_unit(&state, input.a_id).await?;
    let b = load_unit(&state, input.b_id).await?;
    check_swap(&a, &b)?;

    let swapped = GeoUnitRepo::swap_sort(&state.pool, &a, &b).await?;
    tracing::debug!(a = a.id, b = b.id, user_id = user.user_id, "Geo unit sort swapped");
    Ok(Json(DataResponse { data: swapped }))
}

/// DELETE /api/geo/units/{id}
///
/// Refused while the unit has children or is referenced by a committee or center.
pub async fn delete_unit(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let unit = load_unit(&state, id).await?;

    let children = GeoUnitRepo::count_children(&state.pool, id).await?;
    if children > 0 {
        return Err(AppError::Geo(GeoError::HasChildren { id, children }));
    }
    let references = GeoUnitRepo::count_references(&state.pool, id).await?;
    if references > 0 {
        return Err(AppError::Geo(GeoError::InUse { id, references }));
    }

    if !GeoUnitRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "GeoUnit",
            id,
        }));
    }

    tracing::info!(unit_id = id, user_id = user.user_id, "Geo unit deleted");
    audit_trail::record(
        &state,
        Some(user.user_id),
        action_types::ENTITY_DELETE,
        Some(entity_types::GEO_UNIT),
        Some(id),
        Some(serde_json::json!({ "type": unit.unit_type, "name": unit.name })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Geo-chain validation
// ---------------------------------------------------------------------------

/// POST /api/geo/validate-chain
pub async fn validate_chain(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Json(input): Json<GeoChainInput>,
) -> AppResult<Json<DataResponse<GeoChain<GeoUnit>>>> {
    let chain = validate_geo_chain(&PgGeoLookup::new(&state.pool), &input).await?;
    Ok(Json(DataResponse { data: chain }))
}

// ---------------------------------------------------------------------------
// Bulk upload
// ---------------------------------------------------------------------------

/// POST /api/geo/upload?dry=<0|1>
///
/// Plans the uploaded CSV against the current tree. Unless `dry` is set, the
/// `create` rows are then inserted parents-first; a row whose insert fails
/// is reported in `failures` and its planned children fail with it.
pub async fn upload_units(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Query(params): Query<UploadParams>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<UploadResult>>> {
    let bytes = read_file_field(multipart).await?;
    let rows = parse_upload_csv(&bytes)?;
    let existing = GeoUnitRepo::list_all(&state.pool).await?;
    let plan = plan_upload(&rows, &existing);

    tracing::info!(
        total = plan.total,
        to_create = plan.to_create,
        skipped = plan.skipped,
        rejected = plan.rejected,
        dry_run = params.dry,
        "Geo upload planned",
    );

    if params.dry {
        return Ok(Json(DataResponse {
            data: UploadResult {
                dry_run: true,
                plan,
                created: 0,
                failures: Vec::new(),
            },
        }));
    }

    let existing_by_id: HashMap<DbId, GeoUnit> = existing.into_iter().map(|u| (u.id, u)).collect();
    let (created, failures) = commit_plan(&state, &plan, &existing_by_id).await;

    audit_trail::record(
        &state,
        Some(user.user_id),
        action_types::GEO_UPLOAD,
        Some(entity_types::GEO_UNIT),
        None,
        Some(serde_json::json!({
            "total": plan.total,
            "created": created,
            "skipped": plan.skipped,
            "rejected": plan.rejected,
            "failed": failures.len(),
        })),
    )
    .await;

    Ok(Json(DataResponse {
        data: UploadResult {
            dry_run: false,
            plan,
            created,
            failures,
        },
    }))
}

/// Insert the plan's `create` rows in order. Returns the number inserted and
/// the per-row failures.
async fn commit_plan(
    state: &AppState,
    plan: &UploadPlan,
    existing: &HashMap<DbId, GeoUnit>,
) -> (usize, Vec<UploadFailure>) {
    let mut inserted: Vec<Option<GeoUnit>> = vec![None; plan.rows.len()];
    let mut failures = Vec::new();

    for (idx, planned) in plan.rows.iter().enumerate() {
        if planned.action != UploadAction::Create {
            continue;
        }
        let Some(unit_type) = planned.unit_type else {
            continue;
        };

        let parent: Option<&GeoUnit> = match planned.parent {
            None | Some(ParentRef::Root) => None,
            Some(ParentRef::Existing(id)) => match existing.get(&id) {
                Some(unit) => Some(unit),
                None => {
                    failures.push(UploadFailure {
                        row: planned.row,
                        error: format!("Parent geo unit {id} no longer exists"),
                    });
                    continue;
                }
            },
            Some(ParentRef::Batch(i)) => match inserted.get(i).and_then(Option::as_ref) {
                Some(unit) => Some(unit),
                None => {
                    failures.push(UploadFailure {
                        row: planned.row,
                        error: "Parent row was not created".to_string(),
                    });
                    continue;
                }
            },
        };

        let input = NewGeoUnit {
            unit_type: unit_type.as_str().to_string(),
            name: planned.name.clone(),
            slug: planned.slug.clone(),
            code: planned.code.clone(),
            parent_id: parent.map(|p| p.id),
            ancestors: compute_ancestors(parent),
            sort: planned.sort,
            active: planned.active,
            shape: None,
        };

        match GeoUnitRepo::create(&state.pool, &input).await {
            Ok(unit) => inserted[idx] = Some(unit),
            Err(e) => {
                tracing::warn!(row = planned.row, error = %e, "Geo upload row failed");
                failures.push(UploadFailure {
                    row: planned.row,
                    error: upload_error_message(&e),
                });
            }
        }
    }

    let created = inserted.iter().filter(|u| u.is_some()).count();
    (created, failures)
}

fn upload_error_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            "A unit with this name already exists under the same parent".to_string()
        }
        _ => "Database error".to_string(),
    }
}
