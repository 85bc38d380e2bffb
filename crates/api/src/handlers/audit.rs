//! Handler for `/admin/audit-logs`. Admin only.

use axum::extract::{Query, State};
use axum::Json;
use pollsite_db::models::audit::{AuditLogPage, AuditQuery};
use pollsite_db::repositories::AuditLogRepo;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/admin/audit-logs
///
/// Newest first. `limit` is clamped to the repository maximum.
pub async fn query_audit_logs(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<DataResponse<AuditLogPage>>> {
    let items = AuditLogRepo::query(&state.pool, &query).await?;
    let total = AuditLogRepo::count(&state.pool, &query).await?;
    Ok(Json(DataResponse {
        data: AuditLogPage { items, total },
    }))
}
