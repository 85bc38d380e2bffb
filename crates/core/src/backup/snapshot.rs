//! Snapshot format.
//!
//! ```json
//! {
//!   "meta": { "type": "mongo-backup", "version": 1,
//!             "sourceDatabaseName": "pollsite", "createdAt": "2026-03-01T10:00:00Z" },
//!   "collections": { "centers": [ { "id": 1, "name": "Center A" } ] }
//! }
//! ```

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::BackupError;
use crate::types::Timestamp;

/// Format tag written to `meta.type`. Restores refuse anything else. The value
/// is fixed so snapshot files produced before the move to PostgreSQL stay
/// restorable.
pub const SNAPSHOT_TYPE: &str = "mongo-backup";

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Collection name prefixes that are never exported or restored.
pub const INTERNAL_PREFIXES: &[&str] = &["_", "pg_"];

/// Reserved collection names that are never exported or restored.
pub const RESERVED_COLLECTIONS: &[&str] = &["sessions", "schema_migrations"];

/// One stored document (a table row rendered as a JSON object).
pub type Document = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

impl SnapshotMeta {
    pub fn new(source_database_name: &str, created_at: Timestamp) -> Self {
        Self {
            kind: SNAPSHOT_TYPE.to_string(),
            version: Some(SNAPSHOT_VERSION),
            source_database_name: Some(source_database_name.to_string()),
            created_at: Some(created_at),
        }
    }

    /// Reject foreign files before anything is written.
    pub fn ensure_valid(&self) -> Result<(), BackupError> {
        if self.kind != SNAPSHOT_TYPE {
            return Err(BackupError::InvalidSnapshot(format!(
                "expected meta.type '{SNAPSHOT_TYPE}', found '{}'",
                self.kind
            )));
        }
        Ok(())
    }
}

/// A complete export: metadata plus documents per collection, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    #[serde(default)]
    pub collections: IndexMap<String, Vec<Document>>,
}

impl Snapshot {
    pub fn new(source_database_name: &str, created_at: Timestamp) -> Self {
        Self {
            meta: SnapshotMeta::new(source_database_name, created_at),
            collections: IndexMap::new(),
        }
    }

    pub fn document_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}

/// Whether `name` holds user data (as opposed to internal bookkeeping such
/// as migrations or login sessions).
pub fn is_user_collection(name: &str) -> bool {
    !name.is_empty()
        && !INTERNAL_PREFIXES.iter().any(|p| name.starts_with(p))
        && !RESERVED_COLLECTIONS.contains(&name)
}

/// Parse a `collections=a,b,c` query value. Blank input means "all".
pub fn parse_collection_list(raw: Option<&str>) -> Option<Vec<String>> {
    let names: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// Download filename: `<db>-backup-<YYYYMMDDTHHMMSSZ>.json[.gz]`.
pub fn backup_filename(database_name: &str, at: Timestamp, gzip: bool) -> String {
    let safe_db: String = database_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stamp = at.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ");
    let ext = if gzip { "json.gz" } else { "json" };
    format!("{safe_db}-backup-{stamp}.{ext}")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn internal_collections_are_filtered() {
        assert!(is_user_collection("centers"));
        assert!(is_user_collection("geo_units"));
        assert!(!is_user_collection("_sqlx_migrations"));
        assert!(!is_user_collection("pg_stat"));
        assert!(!is_user_collection("sessions"));
        assert!(!is_user_collection("schema_migrations"));
        assert!(!is_user_collection(""));
    }

    #[test]
    fn collection_list_parsing() {
        assert_eq!(parse_collection_list(None), None);
        assert_eq!(parse_collection_list(Some(" , ")), None);
        assert_eq!(
            parse_collection_list(Some("centers, committees,,geo_units")),
            Some(vec!["centers".into(), "committees".into(), "geo_units".into()])
        );
    }

    #[test]
    fn filename_carries_db_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(backup_filename("pollsite", at, false), "pollsite-backup-20260301T090507Z.json");
        assert_eq!(backup_filename("poll site", at, true), "poll_site-backup-20260301T090507Z.json.gz");
    }

    #[test]
    fn meta_serializes_with_camel_case_keys() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let json = serde_json::to_value(SnapshotMeta::new("pollsite", at)).unwrap();
        assert_eq!(json["type"], SNAPSHOT_TYPE);
        assert_eq!(json["version"], 1);
        assert_eq!(json["sourceDatabaseName"], "pollsite");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn foreign_meta_type_is_invalid() {
        let meta = SnapshotMeta {
            kind: "pg-dump".into(),
            version: None,
            source_database_name: None,
            created_at: None,
        };
        assert_matches!(meta.ensure_valid(), Err(BackupError::InvalidSnapshot(_)));
    }

    #[test]
    fn minimal_snapshot_deserializes() {
        let snap: Snapshot = serde_json::from_value(serde_json::json!({
            "meta": { "type": "mongo-backup" },
            "collections": { "centers": [{ "_id": "c1", "name": "Center A" }] }
        }))
        .unwrap();
        assert!(snap.meta.ensure_valid().is_ok());
        assert_eq!(snap.document_count(), 1);
        assert_eq!(snap.collections["centers"][0]["_id"], "c1");
    }
}
