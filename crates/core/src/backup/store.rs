//! Storage seam for the backup engines.

use std::future::Future;

use super::snapshot::Document;
use super::BackupError;

/// A database seen as named collections of JSON documents.
///
/// The PostgreSQL implementation maps collections to public tables and
/// documents to rows; tests use an in-memory map.
pub trait DocumentStore: Send + Sync {
    fn database_name(&self) -> &str;

    /// All collection names, including internal ones. Callers filter.
    fn list_collections(&self) -> impl Future<Output = Result<Vec<String>, BackupError>> + Send;

    fn find_all(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<Vec<Document>, BackupError>> + Send;

    /// Replace the document with the same identity, or insert it.
    fn upsert(
        &self,
        collection: &str,
        doc: &Document,
    ) -> impl Future<Output = Result<(), BackupError>> + Send;

    fn insert(
        &self,
        collection: &str,
        doc: &Document,
    ) -> impl Future<Output = Result<(), BackupError>> + Send;

    /// Remove every document. Returns the number removed.
    fn delete_all(&self, collection: &str)
        -> impl Future<Output = Result<u64, BackupError>> + Send;

    /// Hook run after a collection has been written (e.g. to advance id
    /// sequences past restored ids).
    fn finalize_collection(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<(), BackupError>> + Send;
}
