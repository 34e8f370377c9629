//! Document store contract and an in-memory implementation.
//!
//! The store owns document content; the engine never holds content outside
//! a scoped read-modify-write. A store guarantees atomicity of a single
//! operation but offers no cross-document transaction.

use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("a document already exists at {0}")]
    AlreadyExists(String),
    #[error("store i/o error: {0}")]
    Io(String),
}

/// A named-text-blob store the rename engine operates against.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All document paths in the corpus.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    async fn exists(&self, path: &str) -> Result<bool, StoreError>;

    async fn read(&self, path: &str) -> Result<String, StoreError>;

    /// Move a document to a new path. Fails when the source is missing or
    /// the target is occupied by a different document; a case-only change
    /// of the same document is allowed.
    async fn rename(&self, path: &str, new_path: &str) -> Result<(), StoreError>;

    /// Scoped read-modify-write of one document. No concurrent write to the
    /// same document is issued by this engine while the closure runs.
    async fn read_modify_write(
        &self,
        path: &str,
        f: &(dyn for<'a> Fn(&'a str) -> String + Send + Sync),
    ) -> Result<(), StoreError>;
}

/// DashMap-backed store for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    docs: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, content: &str) {
        self.docs.insert(path.to_string(), content.to_string());
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.docs.get(path).map(|c| c.clone())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut paths: Vec<String> = self.docs.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        Ok(paths)
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.docs.contains_key(path))
    }

    async fn read(&self, path: &str) -> Result<String, StoreError> {
        self.docs
            .get(path)
            .map(|c| c.clone())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn rename(&self, path: &str, new_path: &str) -> Result<(), StoreError> {
        if path == new_path {
            return Ok(());
        }
        if self.docs.contains_key(new_path) {
            return Err(StoreError::AlreadyExists(new_path.to_string()));
        }
        let (_, content) = self
            .docs
            .remove(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        self.docs.insert(new_path.to_string(), content);
        Ok(())
    }

    async fn read_modify_write(
        &self,
        path: &str,
        f: &(dyn for<'a> Fn(&'a str) -> String + Send + Sync),
    ) -> Result<(), StoreError> {
        let mut entry = self
            .docs
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        let updated = f(entry.value());
        *entry.value_mut() = updated;
        Ok(())
    }
}
