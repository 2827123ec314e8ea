// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stores holding the persisted configuration document, keyed by
//! configuration id.
//!
//! Documents are kept as raw text so a rollback restores them byte for byte.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::error::{ValidatorError, ValidatorResult};

/// Persistence collaborator for configuration documents
pub trait ConfigStore: Send + Sync {
    fn load(&self, config_id: &str) -> ValidatorResult<String>;
    fn save(&self, config_id: &str, content: &str) -> ValidatorResult<()>;
    fn exists(&self, config_id: &str) -> bool;
}

/// In-memory store, useful for tests and embedding
#[derive(Default)]
pub struct InMemoryConfigStore {
    inner: Mutex<HashMap<String, String>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, config_id: &str, content: &str) -> Self {
        if let Ok(mut documents) = self.inner.lock() {
            documents.insert(config_id.to_string(), content.to_string());
        }
        self
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load(&self, config_id: &str) -> ValidatorResult<String> {
        self.inner
            .lock()?
            .get(config_id)
            .cloned()
            .ok_or_else(|| ValidatorError::persistence(config_id, "no such configuration"))
    }

    fn save(&self, config_id: &str, content: &str) -> ValidatorResult<()> {
        self.inner
            .lock()?
            .insert(config_id.to_string(), content.to_string());
        Ok(())
    }

    fn exists(&self, config_id: &str) -> bool {
        self.inner
            .lock()
            .map(|documents| documents.contains_key(config_id))
            .unwrap_or(false)
    }
}

/// One YAML file per configuration: `<base>/<config_id>.<extension>`
pub struct FileConfigStore {
    base: PathBuf,
    extension: String,
}

impl FileConfigStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> std::io::Result<Self> {
        let base = path.into();
        fs::create_dir_all(&base)?;
        Ok(Self {
            base,
            extension: "yml".to_string(),
        })
    }

    /// Store over the directory of an existing file; returns the file's id
    pub fn for_file(path: impl AsRef<Path>) -> ValidatorResult<(Self, String)> {
        let path = path.as_ref();
        let config_id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                ValidatorError::persistence(path.display().to_string(), "not a configuration file path")
            })?
            .to_string();
        let base = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("yml")
            .to_string();
        Ok((Self { base, extension }, config_id))
    }

    pub fn file_path(&self, config_id: &str) -> PathBuf {
        self.base.join(format!("{}.{}", config_id, self.extension))
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self, config_id: &str) -> ValidatorResult<String> {
        let path = self.file_path(config_id);
        fs::read_to_string(&path).map_err(|e| {
            ValidatorError::persistence(config_id, format!("cannot read {}: {}", path.display(), e))
        })
    }

    /// Write to a sibling temp file, then rename over the target
    fn save(&self, config_id: &str, content: &str) -> ValidatorResult<()> {
        let path = self.file_path(config_id);
        let tmp = path.with_extension(format!("{}.tmp", self.extension));
        fs::write(&tmp, content)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| {
                let _ = fs::remove_file(&tmp);
                ValidatorError::persistence(config_id, format!("cannot write {}: {}", path.display(), e))
            })
    }

    fn exists(&self, config_id: &str) -> bool {
        self.file_path(config_id).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryConfigStore::new().with_document("project", "entities: {}\n");
        assert!(store.exists("project"));
        assert_eq!(store.load("project").unwrap(), "entities: {}\n");

        store.save("project", "entities: {a: {}}\n").unwrap();
        assert_eq!(store.load("project").unwrap(), "entities: {a: {}}\n");
        assert!(matches!(
            store.load("missing"),
            Err(ValidatorError::Persistence { .. })
        ));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(dir.path()).unwrap();
        assert!(!store.exists("project"));

        store.save("project", "# keep me\nentities: {}\n").unwrap();
        assert!(store.exists("project"));
        assert_eq!(store.load("project").unwrap(), "# keep me\nentities: {}\n");
        assert!(!dir.path().join("project.yml.tmp").exists());
    }

    #[test]
    fn test_for_file_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.yaml");
        fs::write(&path, "entities: {}\n").unwrap();

        let (store, config_id) = FileConfigStore::for_file(&path).unwrap();
        assert_eq!(config_id, "shop");
        assert_eq!(store.file_path("shop"), path);
        assert_eq!(store.load("shop").unwrap(), "entities: {}\n");
    }
}
