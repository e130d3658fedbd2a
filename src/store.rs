//! Storage boundary for documents bound to an external store.
//!
//! A [`Document`](crate::Document) bound to a [`DocumentStore`] pushes a
//! snapshot of all of its raw layer values after every successful mutation.
//! The store owns persistence; retries and backoff are its concern, and any
//! error it reports is handed back to the caller unchanged.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`] keeps snapshots in memory and can be told to fail, for tests.
//! - [`DirectoryStore`] writes one RON file per document.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::raw::RawDocument;

/// Errors from document storage operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No document is stored under the given id.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Failed to read from the store.
    #[error("failed to read from document store: {0}")]
    Read(String),

    /// Failed to write to the store.
    #[error("failed to write to document store: {0}")]
    Write(String),

    /// A snapshot could not be encoded or decoded.
    #[error("failed to encode document snapshot: {0}")]
    Encode(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value persistence for raw document snapshots.
///
/// Implementations take `&self` and handle their own synchronization so a
/// single store can be shared by every document of a corpus.
pub trait DocumentStore: Send + Sync {
    /// Replace the stored snapshot of `id` with `layers`.
    fn push_snapshot(&self, id: &str, layers: &RawDocument) -> StoreResult<()>;

    /// Fetch the stored snapshot of `id`.
    fn fetch_by_id(&self, id: &str) -> StoreResult<RawDocument>;

    /// Ids of every stored document.
    fn list_ids(&self) -> StoreResult<Vec<String>>;

    /// Delete the snapshot of `id`.
    fn remove(&self, id: &str) -> StoreResult<()>;
}

/// Which operation a [`MemoryStore`] should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    Push(StoreError),
    Fetch(StoreError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
    Push { id: String, layers: Vec<String> },
    Fetch { id: String },
    Remove { id: String },
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    /// Ids in first-push order.
    order: Vec<String>,
    docs: HashMap<String, RawDocument>,
    fail_on: Option<FailOn>,
    operations: Vec<StoreOperation>,
}

/// In-memory document store.
///
/// Clones share state, so a test can keep a handle while documents hold another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls of one operation fail with the given error.
    pub fn fail_on(&self, fail_on: FailOn) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_on = Some(fail_on);
        }
    }

    pub fn clear_failure(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_on = None;
        }
    }

    /// Every operation performed so far, oldest first.
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.inner
            .lock()
            .map(|inner| inner.operations.clone())
            .unwrap_or_default()
    }

    /// Number of snapshots pushed so far.
    pub fn push_count(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, StoreOperation::Push { .. }))
            .count()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryStoreInner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Write("memory store lock poisoned".into()))
    }
}

impl DocumentStore for MemoryStore {
    fn push_snapshot(&self, id: &str, layers: &RawDocument) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if let Some(FailOn::Push(err)) = &inner.fail_on {
            return Err(err.clone());
        }
        inner.operations.push(StoreOperation::Push {
            id: id.to_string(),
            layers: layers.keys().cloned().collect(),
        });
        if !inner.docs.contains_key(id) {
            inner.order.push(id.to_string());
        }
        inner.docs.insert(id.to_string(), layers.clone());
        Ok(())
    }

    fn fetch_by_id(&self, id: &str) -> StoreResult<RawDocument> {
        let mut inner = self.lock()?;
        if let Some(FailOn::Fetch(err)) = &inner.fail_on {
            return Err(err.clone());
        }
        inner.operations.push(StoreOperation::Fetch { id: id.to_string() });
        inner
            .docs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list_ids(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock()?.order.clone())
    }

    fn remove(&self, id: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.operations.push(StoreOperation::Remove { id: id.to_string() });
        if inner.docs.remove(id).is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        inner.order.retain(|stored| stored != id);
        Ok(())
    }
}

/// Document store keeping one `{id}.ron` file per document in a directory.
///
/// Characters of the id that are unsafe in a file name (`/`, `+`, `\`, `.`
/// and the escape character `%` itself) are written as `%XX`, so base64 ids
/// map to plain file names.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| StoreError::Write(format!("{}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> StoreResult<PathBuf> {
        if id.is_empty() {
            return Err(StoreError::Write(
                "an empty document id cannot be used as a file name".into(),
            ));
        }
        Ok(self.root.join(format!("{}.ron", escape_id(id))))
    }
}

fn escape_id(id: &str) -> String {
    let mut escaped = String::with_capacity(id.len());
    for c in id.chars() {
        if matches!(c, '%' | '/' | '+' | '\\' | '.') {
            escaped.push_str(&format!("%{:02X}", c as u32));
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Inverse of [`escape_id`]; `None` for stems it could not have produced.
fn unescape_id(stem: &str) -> Option<String> {
    let mut id = String::with_capacity(stem.len());
    let mut chars = stem.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let code: String = chars.by_ref().take(2).collect();
            if code.len() != 2 {
                return None;
            }
            id.push(char::from(u8::from_str_radix(&code, 16).ok()?));
        } else {
            id.push(c);
        }
    }
    Some(id)
}

impl DocumentStore for DirectoryStore {
    fn push_snapshot(&self, id: &str, layers: &RawDocument) -> StoreResult<()> {
        let path = self.path_for(id)?;
        let encoded = ron::ser::to_string_pretty(layers, ron::ser::PrettyConfig::new())
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        log::debug!("writing snapshot of {} to {}", id, path.display());
        fs::write(&path, encoded)
            .map_err(|e| StoreError::Write(format!("{}: {}", path.display(), e)))
    }

    fn fetch_by_id(&self, id: &str) -> StoreResult<RawDocument> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| StoreError::Read(format!("{}: {}", path.display(), e)))?;
        ron::from_str(&content).map_err(|e| StoreError::Encode(e.to_string()))
    }

    fn list_ids(&self) -> StoreResult<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| StoreError::Read(format!("{}: {}", self.root.display(), e)))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Read(e.to_string()))?;
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "ron") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    match unescape_id(stem) {
                        Some(id) => ids.push(id),
                        None => log::warn!("skipping {}: not a document file name", path.display()),
                    }
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn remove(&self, id: &str) -> StoreResult<()> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        fs::remove_file(&path).map_err(|e| StoreError::Write(format!("{}: {}", path.display(), e)))
    }
}
