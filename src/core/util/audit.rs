// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit trail for configuration mutations
//!
//! Backups, applied fixes, rollbacks and restores are recorded as
//! hash-chained entries: each hash covers the entry and its predecessor's
//! hash, so editing or dropping an entry breaks [`AuditLogger::verify_chain`].

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::core::error::ValidatorResult;

const GENESIS: &str = "genesis";

/// Audit log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String, // e.g. "backup", "apply", "rollback", "restore"
    pub resource: String,  // configuration id, optionally with a backup name
    pub details: BTreeMap<String, String>,
    pub hash: String,
}

impl AuditEntry {
    pub fn new(operation: &str, resource: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: operation.to_string(),
            resource: resource.to_string(),
            details: BTreeMap::new(),
            hash: String::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    fn digest(&self, prev_hash: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        hasher.update(self.operation.as_bytes());
        hasher.update(self.resource.as_bytes());
        for (key, value) in &self.details {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        hasher.update(prev_hash.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn compute_hash(&mut self, prev_hash: &str) {
        self.hash = self.digest(prev_hash);
    }
}

/// In-memory, append-only audit log
pub struct AuditLogger {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn log(&self, mut entry: AuditEntry) -> ValidatorResult<()> {
        let mut entries = self.entries.lock()?;
        let prev_hash = entries.last().map(|e| e.hash.as_str()).unwrap_or(GENESIS);
        entry.compute_hash(prev_hash);

        info!(
            "Audit: {} on {} at {}",
            entry.operation,
            entry.resource,
            entry.timestamp.to_rfc3339()
        );
        entries.push(entry);
        Ok(())
    }

    pub fn get_entries(&self) -> ValidatorResult<Vec<AuditEntry>> {
        Ok(self.entries.lock()?.clone())
    }

    /// Whether every entry's hash still matches its content and predecessor
    pub fn verify_chain(&self) -> ValidatorResult<bool> {
        let entries = self.entries.lock()?;
        let mut prev_hash = GENESIS;
        for entry in entries.iter() {
            if entry.digest(prev_hash) != entry.hash {
                return Ok(false);
            }
            prev_hash = &entry.hash;
        }
        Ok(true)
    }

    pub fn export_json(&self) -> ValidatorResult<String> {
        let entries = self.get_entries()?;
        Ok(serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string()))
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_entry() {
        let entry = AuditEntry::new("backup", "project").with_detail("size", 100);
        assert_eq!(entry.operation, "backup");
        assert_eq!(entry.details["size"], "100");
    }

    #[test]
    fn test_chain_links_entries() {
        let logger = AuditLogger::new();
        logger.log(AuditEntry::new("backup", "project")).unwrap();
        logger.log(AuditEntry::new("apply", "project").with_detail("fixes", 2)).unwrap();

        let entries = logger.get_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_ne!(entries[0].hash, entries[1].hash);
        assert!(logger.verify_chain().unwrap());
    }

    #[test]
    fn test_tampering_breaks_chain() {
        let logger = AuditLogger::new();
        logger.log(AuditEntry::new("backup", "project")).unwrap();
        logger.log(AuditEntry::new("apply", "project")).unwrap();

        logger.entries.lock().unwrap()[0].resource = "other".to_string();
        assert!(!logger.verify_chain().unwrap());
    }

    #[test]
    fn test_export_json() {
        let logger = AuditLogger::new();
        logger.log(AuditEntry::new("restore", "project")).unwrap();
        let exported: serde_json::Value = serde_json::from_str(&logger.export_json().unwrap()).unwrap();
        assert_eq!(exported[0]["operation"], "restore");
    }
}
