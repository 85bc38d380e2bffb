//! Best-effort audit writes from handlers.

use pollsite_core::audit::redact_sensitive_fields;
use pollsite_core::types::DbId;
use pollsite_db::models::audit::CreateAuditLog;
use pollsite_db::repositories::AuditLogRepo;
use serde_json::Value;

use crate::state::AppState;

/// Append an audit entry. Details are redacted before storage.
///
/// A failed write is logged at `warn` and otherwise ignored; the request that
/// triggered it has already succeeded.
pub async fn record(
    state: &AppState,
    user_id: Option<DbId>,
    action_type: &str,
    entity_type: Option<&str>,
    entity_id: Option<DbId>,
    details: Option<Value>,
) {
    let entry = CreateAuditLog {
        user_id,
        action_type: action_type.to_string(),
        entity_type: entity_type.map(str::to_string),
        entity_id,
        details_json: details.map(redact_sensitive_fields),
    };

    if let Err(e) = AuditLogRepo::insert(&state.pool, &entry).await {
        tracing::warn!(error = %e, action_type, "Failed to write audit log entry");
    }
}
