// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamped configuration backups
//!
//! Layout: `<root>/<config_id>/<config_id>_<UTC timestamp>.yml` with a
//! `.sha256` sidecar per backup. Backups are never deleted here.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::error::{ValidatorError, ValidatorResult};
use crate::core::persistence::ConfigStore;

const BACKUP_EXTENSION: &str = "yml";
const CHECKSUM_EXTENSION: &str = "sha256";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub size: u64,
    pub checksum: String,
}

pub fn sha256_hex(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

pub struct BackupManager {
    root: PathBuf,
}

impl BackupManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn config_dir(&self, config_id: &str) -> PathBuf {
        self.root.join(config_id)
    }

    /// Snapshot `content`; failure to write is fatal for the caller
    pub fn create(&self, config_id: &str, content: &str) -> ValidatorResult<BackupInfo> {
        let dir = self.config_dir(config_id);
        fs::create_dir_all(&dir).map_err(|e| {
            ValidatorError::backup_at(format!("backup location unavailable: {}", e), dir.display().to_string())
        })?;

        let created_at = Utc::now();
        let stem = format!("{}_{}", config_id, created_at.format("%Y%m%dT%H%M%S%.6fZ"));
        let mut name = format!("{}.{}", stem, BACKUP_EXTENSION);
        let mut counter = 1;
        while dir.join(&name).exists() {
            name = format!("{}_{}.{}", stem, counter, BACKUP_EXTENSION);
            counter += 1;
        }

        let path = dir.join(&name);
        let checksum = sha256_hex(content.as_bytes());
        fs::write(&path, content)
            .and_then(|_| fs::write(checksum_path(&path), &checksum))
            .map_err(|e| {
                ValidatorError::backup_at(format!("cannot write backup: {}", e), path.display().to_string())
            })?;

        let written = fs::read(&path).map_err(|e| {
            ValidatorError::backup_at(format!("cannot verify backup: {}", e), path.display().to_string())
        })?;
        if sha256_hex(&written) != checksum {
            return Err(ValidatorError::backup_at(
                "backup content does not match the configuration",
                path.display().to_string(),
            ));
        }

        log::info!("Backed up '{}' to {}", config_id, path.display());
        Ok(BackupInfo {
            name,
            path,
            created_at,
            size: written.len() as u64,
            checksum,
        })
    }

    /// Backups of a configuration, oldest first
    pub fn list(&self, config_id: &str) -> ValidatorResult<Vec<BackupInfo>> {
        let dir = self.config_dir(config_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BACKUP_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let metadata = fs::metadata(&path)?;
            let created_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            let checksum = fs::read_to_string(checksum_path(&path))
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            backups.push(BackupInfo {
                name,
                path,
                created_at,
                size: metadata.len(),
                checksum,
            });
        }
        backups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(backups)
    }

    /// Read a backup, verifying its checksum when a sidecar exists
    pub fn read(&self, config_id: &str, name: &str) -> ValidatorResult<String> {
        if name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(ValidatorError::backup(format!("invalid backup name '{}'", name)));
        }
        let path = self.config_dir(config_id).join(name);
        let content = fs::read_to_string(&path).map_err(|e| {
            ValidatorError::backup_at(format!("cannot read backup: {}", e), path.display().to_string())
        })?;

        if let Ok(expected) = fs::read_to_string(checksum_path(&path)) {
            if sha256_hex(content.as_bytes()) != expected.trim() {
                return Err(ValidatorError::backup_at(
                    "backup checksum mismatch",
                    path.display().to_string(),
                ));
            }
        }
        Ok(content)
    }

    /// Back up the stored document and hand out a guard that restores it
    /// unless committed
    pub fn guard<'a>(&'a self, store: &'a dyn ConfigStore, config_id: &str) -> ValidatorResult<BackupGuard<'a>> {
        let original = store.load(config_id)?;
        let backup = self.create(config_id, &original)?;
        Ok(BackupGuard {
            manager: self,
            store,
            config_id: config_id.to_string(),
            original,
            backup,
            finished: false,
        })
    }
}

fn checksum_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(CHECKSUM_EXTENSION);
    PathBuf::from(name)
}

/// Snapshot → mutate → commit or restore
///
/// Dropped without [`commit`](Self::commit) or [`rollback`](Self::rollback),
/// the guard restores the backup.
pub struct BackupGuard<'a> {
    manager: &'a BackupManager,
    store: &'a dyn ConfigStore,
    config_id: String,
    original: String,
    backup: BackupInfo,
    finished: bool,
}

impl<'a> BackupGuard<'a> {
    #[inline]
    pub fn backup(&self) -> &BackupInfo {
        &self.backup
    }

    /// The document as it was when the backup was taken
    #[inline]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Keep the mutation; the backup stays on disk
    pub fn commit(mut self) -> BackupInfo {
        self.finished = true;
        self.backup.clone()
    }

    /// Put the backed-up document back into the store
    pub fn rollback(mut self) -> ValidatorResult<BackupInfo> {
        self.finished = true;
        self.restore()?;
        Ok(self.backup.clone())
    }

    fn restore(&self) -> ValidatorResult<()> {
        let content = match self.manager.read(&self.config_id, &self.backup.name) {
            Ok(content) => content,
            Err(e) => {
                log::warn!(
                    "Backup {} unreadable ({}), restoring '{}' from memory",
                    self.backup.name,
                    e,
                    self.config_id
                );
                self.original.clone()
            }
        };
        self.store.save(&self.config_id, &content)?;
        log::info!("Restored '{}' from {}", self.config_id, self.backup.name);
        Ok(())
    }
}

impl Drop for BackupGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.restore() {
                log::error!("Failed to restore '{}' from {}: {}", self.config_id, self.backup.name, e);
            }
        }
    }
}
