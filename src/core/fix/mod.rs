// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-fix: suggestions from issues, dry-run previews, and backed-up apply
//! with rollback.

pub mod action;
pub mod backup;
pub mod engine;
pub mod strategy;

pub use action::{FixAction, FixActionType, FixSuggestion};
pub use backup::{BackupGuard, BackupInfo, BackupManager};
pub use engine::{AutoFixEngine, ConfigLocks, FixApplyResult, FixApplyState, FixChange, FixPreviewResult};
pub use strategy::{suggest_fix, suggest_fixes};
