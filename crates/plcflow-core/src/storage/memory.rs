//! Scratch storage that keeps each project as document text in memory.
//!
//! Documents are serialized on save and parsed again on load, so a project
//! read back from here passes the same structural checks as one read from
//! disk.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::project::ProjectDocument;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

#[derive(Default)]
pub struct MemoryStorage {
    texts: RwLock<BTreeMap<String, String>>,
}

fn poisoned<T>(_: PoisonError<T>) -> StorageError {
    StorageError::Other("memory store lock poisoned".to_string())
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw document text under `id` without checking it.
    ///
    /// Useful for seeding projects written by other tools.
    pub fn insert_json(&self, id: &str, text: impl Into<String>) -> StorageResult<()> {
        self.texts.write().map_err(poisoned)?.insert(id.to_string(), text.into());
        Ok(())
    }

    /// The stored text for `id`, exactly as it would be written to a file.
    pub fn json(&self, id: &str) -> StorageResult<Option<String>> {
        Ok(self.texts.read().map_err(poisoned)?.get(id).cloned())
    }
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, document: &ProjectDocument) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let text = document.to_json().map_err(|e| StorageError::Serialization(e.to_string()));
        Box::pin(async move { self.insert_json(&id, text?) })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<ProjectDocument>> {
        let id = id.to_string();
        Box::pin(async move {
            let text = self.json(&id)?.ok_or_else(|| StorageError::NotFound(id.clone()))?;
            ProjectDocument::from_json(&text)
                .map_err(|e| StorageError::Serialization(format!("Failed to parse project {id}: {e}")))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            self.texts.write().map_err(poisoned)?.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move { Ok(self.texts.read().map_err(poisoned)?.keys().cloned().collect()) })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.texts.read().map_err(poisoned)?.contains_key(&id)) })
    }
}
