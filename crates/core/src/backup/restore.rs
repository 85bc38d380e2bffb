//! Snapshot restore.
//!
//! Documents are replayed one at a time in snapshot order. A failed document
//! is counted on its collection's result and the batch carries on; only an
//! invalid snapshot aborts before any write.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::snapshot::{is_user_collection, Document, Snapshot, SnapshotMeta};
use super::store::DocumentStore;
use super::BackupError;
use crate::error::CoreError;

/// Conflict policy for a restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreMode {
    /// Upsert by identifier. Unrelated documents are left alone.
    #[default]
    Merge,
    /// Delete everything in the collection, then insert the snapshot's documents.
    Wipe,
}

impl RestoreMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Wipe => "wipe",
        }
    }
}

impl fmt::Display for RestoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestoreMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "merge" => Ok(Self::Merge),
            "wipe" => Ok(Self::Wipe),
            other => Err(CoreError::Validation(format!(
                "Invalid restore mode '{other}'. Must be 'merge' or 'wipe'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    pub mode: RestoreMode,
    pub dry_run: bool,
    /// Restrict to these collections. Names missing from the snapshot are ignored.
    pub collections: Option<Vec<String>>,
}

/// Outcome for one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRestoreResult {
    pub collection: String,
    /// Documents in the snapshot for this collection.
    pub count: usize,
    pub inserted: usize,
    pub upserted: usize,
    pub failed: usize,
    pub mode: RestoreMode,
    pub dry_run: bool,
    /// First failure message, if any document or collection step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CollectionRestoreResult {
    fn new(collection: &str, count: usize, options: &RestoreOptions) -> Self {
        Self {
            collection: collection.to_string(),
            count,
            inserted: 0,
            upserted: 0,
            failed: 0,
            mode: options.mode,
            dry_run: options.dry_run,
            error: None,
        }
    }

    fn record_failure(&mut self, err: &BackupError) {
        if self.error.is_none() {
            self.error = Some(err.to_string());
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    /// True when no collection reported a failure.
    pub ok: bool,
    pub mode: RestoreMode,
    pub dry_run: bool,
    pub restored: Vec<CollectionRestoreResult>,
    pub file_meta: SnapshotMeta,
}

impl RestoreReport {
    pub fn total_written(&self) -> usize {
        self.restored.iter().map(|r| r.inserted + r.upserted).sum()
    }
}

/// Replay `snapshot` into `store`.
pub async fn restore_snapshot<S: DocumentStore>(
    store: &S,
    snapshot: &Snapshot,
    options: &RestoreOptions,
) -> Result<RestoreReport, BackupError> {
    snapshot.meta.ensure_valid()?;

    let selected = snapshot.collections.iter().filter(|(name, _)| {
        is_user_collection(name)
            && options
                .collections
                .as_ref()
                .is_none_or(|wanted| wanted.iter().any(|w| w == *name))
    });

    let mut restored = Vec::new();
    for (name, docs) in selected {
        let mut result = CollectionRestoreResult::new(name, docs.len(), options);

        if !options.dry_run {
            match options.mode {
                RestoreMode::Merge => merge_collection(store, name, docs, &mut result).await,
                RestoreMode::Wipe => wipe_collection(store, name, docs, &mut result).await,
            }
            if let Err(e) = store.finalize_collection(name).await {
                tracing::warn!(collection = %name, error = %e, "Finalizing restored collection failed");
                result.record_failure(&e);
            }
        }

        tracing::info!(
            collection = %name,
            mode = %options.mode,
            dry_run = options.dry_run,
            count = result.count,
            inserted = result.inserted,
            upserted = result.upserted,
            failed = result.failed,
            "Collection restored",
        );
        restored.push(result);
    }

    let ok = restored.iter().all(|r| r.failed == 0 && r.error.is_none());
    Ok(RestoreReport {
        ok,
        mode: options.mode,
        dry_run: options.dry_run,
        restored,
        file_meta: snapshot.meta.clone(),
    })
}

async fn merge_collection<S: DocumentStore>(
    store: &S,
    name: &str,
    docs: &[Document],
    result: &mut CollectionRestoreResult,
) {
    for doc in docs {
        match store.upsert(name, doc).await {
            Ok(()) => result.upserted += 1,
            Err(e) => {
                tracing::debug!(collection = %name, error = %e, "Document upsert failed");
                result.failed += 1;
                result.record_failure(&e);
            }
        }
    }
}

async fn wipe_collection<S: DocumentStore>(
    store: &S,
    name: &str,
    docs: &[Document],
    result: &mut CollectionRestoreResult,
) {
    match store.delete_all(name).await {
        Ok(removed) => {
            tracing::debug!(collection = %name, removed, "Collection wiped");
        }
        Err(e) => {
            // Nothing is inserted on top of data that could not be cleared.
            tracing::warn!(collection = %name, error = %e, "Wipe failed");
            result.failed = docs.len();
            result.record_failure(&e);
            return;
        }
    }

    for doc in docs {
        match store.insert(name, doc).await {
            Ok(()) => result.inserted += 1,
            Err(e) => {
                tracing::debug!(collection = %name, error = %e, "Document insert failed");
                result.failed += 1;
                result.record_failure(&e);
            }
        }
    }
}
