//! Per-project tracker status mapping (`jira-status.json`).
//!
//! A project with no entry is unconfigured, which is a normal state until a
//! human runs `mw mapping set`.

use std::path::Path;

use crate::store::{DocumentStore, JsonFileStore, StoreError};
use crate::types::{StatusMapping, StatusMappingFile};

pub struct StatusMappingStore {
    store: Box<dyn DocumentStore<StatusMappingFile>>,
}

impl StatusMappingStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_store(JsonFileStore::new(path.as_ref()))
    }

    pub fn with_store(store: impl DocumentStore<StatusMappingFile> + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn get(&self, project_key: &str) -> Result<Option<StatusMapping>, StoreError> {
        Ok(self.store.load()?.mappings.get(project_key).cloned())
    }

    /// Insert or replace the mapping for `mapping.project_key`.
    pub fn save(&self, mapping: StatusMapping) -> Result<(), StoreError> {
        let mut file = self.store.load()?;
        file.mappings.insert(mapping.project_key.clone(), mapping);
        self.store.save(&file)
    }

    /// Returns whether a mapping was removed.
    pub fn delete(&self, project_key: &str) -> Result<bool, StoreError> {
        let mut file = self.store.load()?;
        if file.mappings.remove(project_key).is_none() {
            return Ok(false);
        }
        self.store.save(&file)?;
        Ok(true)
    }

    /// All mappings ordered by project key.
    pub fn list(&self) -> Result<Vec<StatusMapping>, StoreError> {
        Ok(self.store.load()?.mappings.into_values().collect())
    }
}
