//! Handlers for `/backup`: snapshot export, restore and collection listing.
//!
//! All endpoints require the admin role.

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use pollsite_core::audit::{action_types, entity_types, restore_details};
use pollsite_core::backup::codec::{decode_snapshot, encode_snapshot, inflated_limit};
use pollsite_core::backup::export::export_snapshot;
use pollsite_core::backup::restore::{restore_snapshot, RestoreMode, RestoreOptions, RestoreReport};
use pollsite_core::backup::snapshot::{backup_filename, is_user_collection, parse_collection_list};
use pollsite_core::backup::store::DocumentStore;
use pollsite_core::backup::BackupError;
use pollsite_db::document_store::PgDocumentStore;
use serde::{Deserialize, Serialize};

use crate::audit_trail;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::flag;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::upload::read_upload;

// ---------------------------------------------------------------------------
// Query parameter types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    #[serde(default, deserialize_with = "flag")]
    pub gzip: bool,
    /// Comma-separated collection names; all user collections when absent.
    pub collections: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RestoreParams {
    /// `merge` (default) or `wipe`.
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub dry: bool,
    pub collections: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: i64,
}

async fn open_store(state: &AppState) -> AppResult<PgDocumentStore> {
    Ok(PgDocumentStore::new(state.pool.clone()).await?)
}

/// Run CPU-bound snapshot (de)serialization off the async workers.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> Result<T, BackupError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::InternalError(format!("Snapshot task failed: {e}")))?
        .map_err(AppError::from)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/backup?gzip=<0|1>&collections=<a,b>
///
/// Streams the snapshot back as a file download.
pub async fn export_backup(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    let store = open_store(&state).await?;
    let selection = parse_collection_list(params.collections.as_deref());
    let now = chrono::Utc::now();

    let snapshot = export_snapshot(&store, selection.as_deref(), now).await?;
    let collections: Vec<String> = snapshot.collections.keys().cloned().collect();
    let documents = snapshot.document_count();

    let gzip = params.gzip;
    let body = blocking(move || encode_snapshot(&snapshot, gzip)).await?;
    let filename = backup_filename(store.database_name(), now, gzip);

    tracing::info!(
        admin_id = admin.user_id,
        documents,
        bytes = body.len(),
        gzip,
        "Backup exported",
    );
    audit_trail::record(
        &state,
        Some(admin.user_id),
        action_types::BACKUP_EXPORT,
        Some(entity_types::DATABASE),
        None,
        Some(serde_json::json!({
            "filename": filename,
            "collections": collections,
            "documents": documents,
            "gzip": gzip,
        })),
    )
    .await;

    let content_type = if gzip {
        "application/gzip"
    } else {
        "application/json"
    };
    Ok((
        [
            (CONTENT_TYPE, content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        Body::from(body),
    )
        .into_response())
}

/// POST /api/backup?mode=<merge|wipe>&dry=<0|1>&collections=<a,b>
///
/// Body is a multipart upload with a `file` field, or the raw snapshot.
/// Gzip is detected from the payload itself and may inflate to at most
/// `MAX_INFLATE_RATIO` times the upload limit. Per-document failures do not
/// fail the request; they are reported in the body with `ok: false`.
pub async fn restore_backup(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(params): Query<RestoreParams>,
    request: Request,
) -> AppResult<Json<RestoreReport>> {
    let mode: RestoreMode = params.mode.as_deref().unwrap_or_default().parse()?;
    let options = RestoreOptions {
        mode,
        dry_run: params.dry,
        collections: parse_collection_list(params.collections.as_deref()),
    };

    let bytes = read_upload(request, &state).await?;
    let max_json = inflated_limit(state.config.max_upload_bytes);
    let snapshot = blocking(move || decode_snapshot(&bytes, max_json)).await?;

    let store = open_store(&state).await?;
    let report = restore_snapshot(&store, &snapshot, &options).await?;

    tracing::info!(
        admin_id = admin.user_id,
        mode = %report.mode,
        dry_run = report.dry_run,
        ok = report.ok,
        written = report.total_written(),
        "Backup restored",
    );
    if !report.dry_run {
        audit_trail::record(
            &state,
            Some(admin.user_id),
            action_types::BACKUP_RESTORE,
            Some(entity_types::DATABASE),
            None,
            Some(restore_details(&report)),
        )
        .await;
    }

    Ok(Json(report))
}

/// GET /api/backup/collections
///
/// Exportable collections with their current document counts.
pub async fn list_collections(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<Vec<CollectionInfo>>>> {
    let store = open_store(&state).await?;
    let mut names: Vec<String> = store
        .list_collections()
        .await?
        .into_iter()
        .filter(|name| is_user_collection(name))
        .collect();
    names.sort();

    let mut collections = Vec::with_capacity(names.len());
    for name in names {
        let count = store.count_documents(&name).await?;
        collections.push(CollectionInfo { name, count });
    }
    Ok(Json(DataResponse { data: collections }))
}
