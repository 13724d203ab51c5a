//! Whole-document persistence behind a small load/save interface.
//!
//! Every store in this crate is a read-modify-write over a single document.
//! The JSON file implementation rewrites the entire file on every save.

use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed document {path}: {source}")]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Load/save access to one persisted document.
pub trait DocumentStore<T>: Send + Sync {
    /// Read the current document. A missing document is `T::default()`.
    fn load(&self) -> Result<T, StoreError>;

    /// Replace the persisted document. Returns only once the write is durable.
    fn save(&self, doc: &T) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Pretty-printed JSON file, replaced atomically (temp file + rename).
pub struct JsonFileStore<T> {
    path: PathBuf,
    _doc: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _doc: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl<T> DocumentStore<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn load(&self) -> Result<T, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&text).map_err(|source| StoreError::Serde {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, doc: &T) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(doc).map_err(|source| StoreError::Serde {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.temp_path();
        {
            let mut file = std::fs::File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| StoreError::io(&tmp, e))?;
            file.sync_all().map_err(|e| StoreError::io(&tmp, e))?;
        }
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process store for tests. Writes can be switched off to simulate a disk
/// that refuses to persist.
pub struct MemoryStore<T> {
    doc: Mutex<T>,
    fail_saves: Mutex<bool>,
}

impl<T: Clone> MemoryStore<T> {
    pub fn new(doc: T) -> Self {
        Self {
            doc: Mutex::new(doc),
            fail_saves: Mutex::new(false),
        }
    }

    /// Make subsequent `save` calls fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_saves.lock() {
            *flag = fail;
        }
    }

    /// Snapshot of the stored document.
    pub fn snapshot(&self) -> Option<T> {
        self.doc.lock().ok().map(|d| d.clone())
    }
}

impl<T: Default + Clone> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send> DocumentStore<T> for MemoryStore<T> {
    fn load(&self) -> Result<T, StoreError> {
        self.doc
            .lock()
            .map(|d| d.clone())
            .map_err(|_| StoreError::Unavailable("memory store poisoned".into()))
    }

    fn save(&self, doc: &T) -> Result<(), StoreError> {
        let failing = self
            .fail_saves
            .lock()
            .map(|f| *f)
            .map_err(|_| StoreError::Unavailable("memory store poisoned".into()))?;
        if failing {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        let mut current = self
            .doc
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".into()))?;
        *current = doc.clone();
        Ok(())
    }
}

impl<T, S> DocumentStore<T> for std::sync::Arc<S>
where
    S: DocumentStore<T> + ?Sized,
{
    fn load(&self) -> Result<T, StoreError> {
        (**self).load()
    }

    fn save(&self, doc: &T) -> Result<(), StoreError> {
        (**self).save(doc)
    }
}
