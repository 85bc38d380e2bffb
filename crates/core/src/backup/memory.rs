//! In-memory [`DocumentStore`] for engine tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

use super::snapshot::Document;
use super::store::DocumentStore;
use super::BackupError;

/// Documents whose object carries this key are refused on write, standing in
/// for a constraint violation.
pub const REJECT_MARKER: &str = "__reject";

pub struct MemoryStore {
    name: String,
    collections: Mutex<BTreeMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn seed(&self, collection: &str, docs: Vec<Value>) {
        let docs = docs
            .into_iter()
            .map(|v| v.as_object().cloned().expect("seed documents must be objects"))
            .collect();
        self.collections
            .lock()
            .unwrap()
            .insert(collection.to_string(), docs);
    }

    pub fn docs(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn dump(&self) -> BTreeMap<String, Vec<Document>> {
        self.collections.lock().unwrap().clone()
    }
}

fn identity(doc: &Document) -> Option<&Value> {
    doc.get("_id").or_else(|| doc.get("id"))
}

fn check_writable(doc: &Document) -> Result<(), BackupError> {
    if doc.contains_key(REJECT_MARKER) {
        return Err(BackupError::Store("document rejected by constraint".into()));
    }
    if identity(doc).is_none() {
        return Err(BackupError::Store("document has no identifier".into()));
    }
    Ok(())
}

impl DocumentStore for MemoryStore {
    fn database_name(&self) -> &str {
        &self.name
    }

    async fn list_collections(&self) -> Result<Vec<String>, BackupError> {
        Ok(self.collections.lock().unwrap().keys().cloned().collect())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, BackupError> {
        Ok(self.docs(collection))
    }

    async fn upsert(&self, collection: &str, doc: &Document) -> Result<(), BackupError> {
        check_writable(doc)?;
        let mut map = self.collections.lock().unwrap();
        let docs = map.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| identity(d) == identity(doc)) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, doc: &Document) -> Result<(), BackupError> {
        check_writable(doc)?;
        let mut map = self.collections.lock().unwrap();
        let docs = map.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| identity(d) == identity(doc)) {
            return Err(BackupError::Store("duplicate key".into()));
        }
        docs.push(doc.clone());
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> Result<u64, BackupError> {
        let mut map = self.collections.lock().unwrap();
        let docs = map.entry(collection.to_string()).or_default();
        let removed = docs.len() as u64;
        docs.clear();
        Ok(removed)
    }

    async fn finalize_collection(&self, _collection: &str) -> Result<(), BackupError> {
        Ok(())
    }
}
