// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-Fix Engine
//!
//! ```text
//! Idle → Suggesting → Previewing → Applying → Applied
//!                                          ↘ RolledBack
//!                                          ↘ Failed (rollback itself failed)
//! ```
//!
//! Apply is serialized per configuration id. Once the backup is taken the
//! apply runs to completion: either the new document is persisted or the
//! backup is written back.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use serde::Serialize;
use similar::TextDiff;

use super::action::{FixAction, FixSuggestion};
use super::backup::{BackupInfo, BackupManager};
use super::strategy::suggest_fixes;
use crate::core::config::ProjectConfig;
use crate::core::error::{ValidatorError, ValidatorResult};
use crate::core::persistence::ConfigStore;
use crate::core::util::audit::{AuditEntry, AuditLogger};
use crate::core::validation::issue::ValidationIssue;

/// One proposed change as shown in a preview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub issue_code: String,
    pub auto_fixable: bool,
    pub actions: Vec<FixAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_explanation: Option<String>,
}

impl From<&FixSuggestion> for FixChange {
    fn from(suggestion: &FixSuggestion) -> Self {
        Self {
            entity: suggestion.issue.entity.clone(),
            field: suggestion.issue.field.clone(),
            issue_code: suggestion.issue.code.clone(),
            auto_fixable: suggestion.auto_fixable,
            actions: suggestion.actions.clone(),
            warning: suggestion.warning.clone(),
            manual_explanation: suggestion.manual_explanation.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixPreviewResult {
    pub fixable_count: usize,
    pub total_suggestions: usize,
    pub changes: Vec<FixChange>,
    /// Fixable suggestions whose actions could not be applied to the copy
    pub errors: Vec<String>,
    /// Unified diff of the document before and after the fixable changes
    pub diff: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixApplyState {
    Applied,
    RolledBack,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixApplyResult {
    pub success: bool,
    pub fixes_applied: usize,
    pub errors: Vec<String>,
    pub backup_path: Option<PathBuf>,
    /// The persisted document after a successful apply
    pub updated_config: Option<String>,
    pub state: FixApplyState,
}

/// Per-configuration locks, shareable between engines
pub type ConfigLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Applies and restores fixes against a [`ConfigStore`]
///
/// Mutations of one configuration id are serialized through the engine's lock
/// map. Engines built with [`AutoFixEngine::new`] each own a map, so two of
/// them over the same store must share one through [`AutoFixEngine::with_locks`].
pub struct AutoFixEngine {
    store: Arc<dyn ConfigStore>,
    backups: BackupManager,
    audit: Arc<AuditLogger>,
    locks: ConfigLocks,
}

impl AutoFixEngine {
    pub fn new(store: Arc<dyn ConfigStore>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            backups: BackupManager::new(backup_dir),
            audit: Arc::new(AuditLogger::new()),
            locks: ConfigLocks::default(),
        }
    }

    pub fn with_locks(mut self, locks: ConfigLocks) -> Self {
        self.locks = locks;
        self
    }

    #[inline]
    pub fn locks(&self) -> &ConfigLocks {
        &self.locks
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    #[inline]
    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    #[inline]
    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// One suggestion per issue, manual ones included
    pub fn suggest(&self, config: &ProjectConfig, issues: &[ValidationIssue]) -> Vec<FixSuggestion> {
        suggest_fixes(issues, config)
    }

    /// Apply the fixable suggestions to a copy and describe the result
    pub fn preview(&self, config: &ProjectConfig, issues: &[ValidationIssue]) -> ValidatorResult<FixPreviewResult> {
        let suggestions = self.suggest(config, issues);
        let mut working = config.clone();
        let mut errors = Vec::new();

        for suggestion in suggestions.iter().filter(|s| s.auto_fixable) {
            let mut attempt = working.clone();
            match suggestion.apply(&mut attempt) {
                Ok(()) => working = attempt,
                Err(e) => errors.push(format!("{}: {}", suggestion.issue.code, e)),
            }
        }

        let before = config.to_yaml_string()?;
        let after = working.to_yaml_string()?;
        let diff = unified_diff(&before, &after);

        Ok(FixPreviewResult {
            fixable_count: suggestions.iter().filter(|s| s.auto_fixable).count(),
            total_suggestions: suggestions.len(),
            changes: suggestions.iter().map(FixChange::from).collect(),
            errors,
            diff,
        })
    }

    /// Back up, fix and persist the stored configuration
    ///
    /// Rejects the whole request before touching anything when an issue has
    /// no automatic fix. An unusable backup location is an error; nothing is
    /// applied without a backup.
    pub fn apply(&self, config_id: &str, issues: &[ValidationIssue]) -> ValidatorResult<FixApplyResult> {
        let lock = self.lock_for(config_id);
        let _held = lock.lock()?;

        let original = self.store.load(config_id)?;
        let config = ProjectConfig::from_yaml_str(&original)?;
        let suggestions = suggest_fixes(issues, &config);
        if let Some(manual) = suggestions.iter().find(|s| !s.auto_fixable) {
            return Err(ValidatorError::fix_rejected(
                manual.issue.code.clone(),
                manual.issue.entity.clone(),
            ));
        }
        if suggestions.is_empty() {
            return Ok(FixApplyResult {
                success: true,
                fixes_applied: 0,
                errors: Vec::new(),
                backup_path: None,
                updated_config: None,
                state: FixApplyState::Applied,
            });
        }

        let guard = self.backups.guard(self.store.as_ref(), config_id)?;
        let backup_path = guard.backup().path.clone();
        self.record(
            AuditEntry::new("backup", config_id).with_detail("backup", &guard.backup().name),
        );

        let mut working = config;
        let outcome = suggestions
            .iter()
            .try_for_each(|suggestion| suggestion.apply(&mut working))
            .and_then(|()| working.to_yaml_string())
            .and_then(|yaml| self.store.save(config_id, &yaml).map(|()| yaml));

        match outcome {
            Ok(yaml) => {
                guard.commit();
                log::info!("Applied {} fix(es) to '{}'", suggestions.len(), config_id);
                self.record(
                    AuditEntry::new("apply", config_id)
                        .with_detail("fixes", suggestions.len())
                        .with_detail("backup", backup_path.display()),
                );
                Ok(FixApplyResult {
                    success: true,
                    fixes_applied: suggestions.len(),
                    errors: Vec::new(),
                    backup_path: Some(backup_path),
                    updated_config: Some(yaml),
                    state: FixApplyState::Applied,
                })
            }
            Err(e) => {
                log::warn!("Applying fixes to '{}' failed, rolling back: {}", config_id, e);
                let mut errors = vec![e.to_string()];
                let state = match guard.rollback() {
                    Ok(_) => FixApplyState::RolledBack,
                    Err(rollback_error) => {
                        log::error!("Rollback of '{}' failed: {}", config_id, rollback_error);
                        errors.push(format!("rollback failed: {}", rollback_error));
                        FixApplyState::Failed
                    }
                };
                self.record(
                    AuditEntry::new("rollback", config_id)
                        .with_detail("error", &e)
                        .with_detail("restored", state == FixApplyState::RolledBack),
                );
                Ok(FixApplyResult {
                    success: false,
                    fixes_applied: 0,
                    errors,
                    backup_path: Some(backup_path),
                    updated_config: None,
                    state,
                })
            }
        }
    }

    pub fn list_backups(&self, config_id: &str) -> ValidatorResult<Vec<BackupInfo>> {
        self.backups.list(config_id)
    }

    /// Replace the stored document with a named backup
    ///
    /// The current document is backed up first; that fresh backup is returned.
    pub fn restore(&self, config_id: &str, backup_name: &str) -> ValidatorResult<BackupInfo> {
        let lock = self.lock_for(config_id);
        let _held = lock.lock()?;

        let content = self.backups.read(config_id, backup_name)?;
        let guard = self.backups.guard(self.store.as_ref(), config_id)?;
        if let Err(e) = self.store.save(config_id, &content) {
            guard.rollback()?;
            return Err(e);
        }
        let pre_restore = guard.commit();
        self.record(
            AuditEntry::new("restore", config_id)
                .with_detail("from", backup_name)
                .with_detail("backup", &pre_restore.name),
        );
        Ok(pre_restore)
    }

    fn lock_for(&self, config_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(config_id.to_string()).or_default().value())
    }

    fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.audit.log(entry) {
            log::warn!("Audit log unavailable: {}", e);
        }
    }
}

fn unified_diff(before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }
    let diff = TextDiff::from_lines(before, after);
    let mut output = String::from("--- original\n+++ fixed\n");
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        output.push_str(&format!("{hunk}"));
    }
    output
}
