//! Filesystem-backed document store rooted at a vault directory.
//!
//! Paths exposed to the engine are always relative to the root and use `/`
//! separators, regardless of platform. Hidden files and directories (dot
//! prefixed) are not part of the corpus.

use async_trait::async_trait;
use notemv_core::{DocumentStore, StoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join a corpus path onto the root, rejecting anything that could
    /// escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        if path.is_empty() || Path::new(path).is_absolute() {
            return Err(StoreError::Io(format!("invalid document path: {path}")));
        }
        if path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(StoreError::Io(format!("invalid document path: {path}")));
        }
        Ok(self.root.join(path))
    }
}

fn io_error(path: &str, e: std::io::Error) -> StoreError {
    match e.kind() {
        ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
        _ => StoreError::Io(format!("{path}: {e}")),
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[async_trait]
impl DocumentStore for FsStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut paths = Vec::new();
        let mut dirs = vec![self.root.clone()];
        while let Some(dir) = dirs.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| StoreError::Io(format!("{}: {e}", dir.display())))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StoreError::Io(format!("{}: {e}", dir.display())))?
            {
                if is_hidden(&entry.file_name()) {
                    continue;
                }
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StoreError::Io(format!("{}: {e}", dir.display())))?;
                if file_type.is_dir() {
                    dirs.push(entry.path());
                } else if file_type.is_file() {
                    if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                        paths.push(rel.to_string_lossy().replace('\\', "/"));
                    }
                }
            }
        }
        paths.sort();
        Ok(paths)
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let abs = self.resolve(path)?;
        tokio::fs::try_exists(&abs).await.map_err(|e| io_error(path, e))
    }

    async fn read(&self, path: &str) -> Result<String, StoreError> {
        let abs = self.resolve(path)?;
        tokio::fs::read_to_string(&abs).await.map_err(|e| io_error(path, e))
    }

    async fn rename(&self, path: &str, new_path: &str) -> Result<(), StoreError> {
        if path == new_path {
            return Ok(());
        }
        let from = self.resolve(path)?;
        let to = self.resolve(new_path)?;
        // A case-only move of the same document is legal even where the
        // filesystem reports the target as existing.
        let case_only = path.to_lowercase() == new_path.to_lowercase();
        if !case_only
            && tokio::fs::try_exists(&to)
                .await
                .map_err(|e| io_error(new_path, e))?
        {
            return Err(StoreError::AlreadyExists(new_path.to_string()));
        }
        if !tokio::fs::try_exists(&from)
            .await
            .map_err(|e| io_error(path, e))?
        {
            return Err(StoreError::NotFound(path.to_string()));
        }
        tokio::fs::rename(&from, &to).await.map_err(|e| io_error(path, e))
    }

    async fn read_modify_write(
        &self,
        path: &str,
        f: &(dyn for<'a> Fn(&'a str) -> String + Send + Sync),
    ) -> Result<(), StoreError> {
        let abs = self.resolve(path)?;
        let content = tokio::fs::read_to_string(&abs)
            .await
            .map_err(|e| io_error(path, e))?;
        let updated = f(&content);
        if updated != content {
            tokio::fs::write(&abs, updated)
                .await
                .map_err(|e| io_error(path, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with(docs: &[(&str, &str)]) -> (tempfile::TempDir, FsStore) {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in docs {
            let abs = dir.path().join(path);
            if let Some(parent) = abs.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(abs, content).unwrap();
        }
        let store = FsStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn lists_nested_files_with_forward_slashes() {
        let (_dir, store) = store_with(&[
            ("Foo.md", "a"),
            ("Notes/Bar.md", "b"),
            (".obsidian/config", "hidden"),
        ])
        .await;

        assert_eq!(store.list().await.unwrap(), vec!["Foo.md", "Notes/Bar.md"]);
    }

    #[tokio::test]
    async fn rename_moves_the_file() {
        let (_dir, store) = store_with(&[("Foo.md", "body")]).await;

        store.rename("Foo.md", "Bar.md").await.unwrap();
        assert!(!store.exists("Foo.md").await.unwrap());
        assert_eq!(store.read("Bar.md").await.unwrap(), "body");
    }

    #[tokio::test]
    async fn rename_refuses_occupied_target() {
        let (_dir, store) = store_with(&[("Foo.md", "a"), ("Bar.md", "b")]).await;

        let err = store.rename("Foo.md", "Bar.md").await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists("Bar.md".to_string()));
        assert_eq!(store.read("Bar.md").await.unwrap(), "b");
    }

    #[tokio::test]
    async fn read_modify_write_applies_the_closure() {
        let (_dir, store) = store_with(&[("Foo.md", "one two")]).await;

        store
            .read_modify_write("Foo.md", &|c| c.replace("two", "three"))
            .await
            .unwrap();
        assert_eq!(store.read("Foo.md").await.unwrap(), "one three");
    }

    #[tokio::test]
    async fn escaping_paths_are_rejected() {
        let (_dir, store) = store_with(&[]).await;

        assert!(store.read("../outside.md").await.is_err());
        assert!(store.read("/etc/hostname").await.is_err());
    }
}
