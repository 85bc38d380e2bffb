//! Snapshot export.

use super::snapshot::{is_user_collection, Snapshot};
use super::store::DocumentStore;
use super::BackupError;
use crate::types::Timestamp;

/// Dump user-data collections into a snapshot.
///
/// With `selection`, only the named collections are exported, in the order
/// given. A requested name that does not exist, or is internal, fails the
/// whole export.
pub async fn export_snapshot<S: DocumentStore>(
    store: &S,
    selection: Option<&[String]>,
    created_at: Timestamp,
) -> Result<Snapshot, BackupError> {
    let mut available: Vec<String> = store
        .list_collections()
        .await?
        .into_iter()
        .filter(|name| is_user_collection(name))
        .collect();
    available.sort();

    let names: Vec<String> = match selection {
        None => available,
        Some(requested) => {
            let mut names = Vec::with_capacity(requested.len());
            for name in requested {
                if !available.contains(name) {
                    return Err(BackupError::UnknownCollection(name.clone()));
                }
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            names
        }
    };

    let mut snapshot = Snapshot::new(store.database_name(), created_at);
    for name in names {
        let docs = store.find_all(&name).await?;
        tracing::debug!(collection = %name, documents = docs.len(), "Exported collection");
        snapshot.collections.insert(name, docs);
    }

    tracing::info!(
        database = %store.database_name(),
        collections = snapshot.collections.len(),
        documents = snapshot.document_count(),
        "Snapshot exported",
    );
    Ok(snapshot)
}
