//! Audit trail vocabulary and detail sanitising.

use serde_json::Value;

use crate::backup::restore::RestoreReport;

/// `audit_logs.action_type` values.
pub mod action_types {
    pub const LOGIN: &str = "login";
    pub const LOGOUT: &str = "logout";
    pub const ENTITY_CREATE: &str = "entity_create";
    pub const ENTITY_UPDATE: &str = "entity_update";
    pub const ENTITY_DELETE: &str = "entity_delete";
    pub const BACKUP_EXPORT: &str = "backup_export";
    pub const BACKUP_RESTORE: &str = "backup_restore";
    pub const GEO_UPLOAD: &str = "geo_upload";

    pub const ALL: &[&str] = &[
        LOGIN,
        LOGOUT,
        ENTITY_CREATE,
        ENTITY_UPDATE,
        ENTITY_DELETE,
        BACKUP_EXPORT,
        BACKUP_RESTORE,
        GEO_UPLOAD,
    ];
}

/// `audit_logs.entity_type` values.
pub mod entity_types {
    pub const USER: &str = "user";
    pub const GEO_UNIT: &str = "geo_unit";
    pub const COMMITTEE: &str = "committee";
    pub const CENTER: &str = "center";
    pub const DATABASE: &str = "database";
}

/// Key fragments whose values never reach the audit table.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "authorization",
    "api_key",
    "credential",
];

pub const REDACTED: &str = "[REDACTED]";

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_FIELDS.iter().any(|f| key.contains(f))
}

/// Replace the value of every sensitive key, at any depth, with [`REDACTED`].
pub fn redact_sensitive_fields(mut value: Value) -> Value {
    redact_in_place(&mut value);
    value
}

fn redact_in_place(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if is_sensitive(key) {
                    *v = Value::String(REDACTED.to_string());
                } else {
                    redact_in_place(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_in_place),
        _ => {}
    }
}

/// Compact audit details for a restore: per-collection counters without the
/// snapshot payload.
pub fn restore_details(report: &RestoreReport) -> Value {
    let collections: Vec<Value> = report
        .restored
        .iter()
        .map(|r| {
            serde_json::json!({
                "collection": r.collection,
                "count": r.count,
                "inserted": r.inserted,
                "upserted": r.upserted,
                "failed": r.failed,
            })
        })
        .collect();
    serde_json::json!({
        "mode": report.mode,
        "dry_run": report.dry_run,
        "ok": report.ok,
        "source_database": report.file_meta.source_database_name,
        "snapshot_created_at": report.file_meta.created_at,
        "collections": collections,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backup::restore::{CollectionRestoreResult, RestoreMode};
    use crate::backup::snapshot::SnapshotMeta;

    #[test]
    fn redacts_nested_and_case_insensitive_keys() {
        let input = json!({
            "username": "alice",
            "Password": "hunter2",
            "profile": { "refresh_token": "abc", "city": "Dhaka" },
            "items": [{ "client_secret": "x" }, { "name": "ok" }]
        });
        let out = redact_sensitive_fields(input);
        assert_eq!(out["username"], "alice");
        assert_eq!(out["Password"], REDACTED);
        assert_eq!(out["profile"]["refresh_token"], REDACTED);
        assert_eq!(out["profile"]["city"], "Dhaka");
        assert_eq!(out["items"][0]["client_secret"], REDACTED);
        assert_eq!(out["items"][1]["name"], "ok");
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(redact_sensitive_fields(json!(42)), json!(42));
    }

    #[test]
    fn action_types_are_unique() {
        let mut all = action_types::ALL.to_vec();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), action_types::ALL.len());
    }

    #[test]
    fn restore_details_summarise_counts() {
        let report = RestoreReport {
            ok: true,
            mode: RestoreMode::Merge,
            dry_run: false,
            restored: vec![CollectionRestoreResult {
                collection: "centers".into(),
                count: 2,
                inserted: 0,
                upserted: 2,
                failed: 0,
                mode: RestoreMode::Merge,
                dry_run: false,
                error: None,
            }],
            file_meta: SnapshotMeta {
                kind: "mongo-backup".into(),
                version: Some(1),
                source_database_name: Some("pollsite".into()),
                created_at: None,
            },
        };
        let details = restore_details(&report);
        assert_eq!(details["mode"], "merge");
        assert_eq!(details["source_database"], "pollsite");
        assert_eq!(details["collections"][0]["upserted"], 2);
    }
}
