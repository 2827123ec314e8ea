// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity Validator Core Error Types
//!
//! Infrastructure failures only. Problems found *in* a configuration are
//! reported as [`ValidationIssue`](crate::core::validation::ValidationIssue)s,
//! never as errors.

pub mod retry;

use thiserror::Error;

pub use retry::{BackoffStrategy, RetryConfig};

/// Result type for validator operations
pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// Error types raised at the engine boundary
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        config_key: Option<String>,
    },

    #[error("Failed to parse {format} document: {message}")]
    Parse { format: String, message: String },

    #[error("Sampling entity '{entity}' failed: {message}")]
    Sampling {
        entity: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Sampling entity '{entity}' timed out after {millis}ms")]
    Timeout { entity: String, millis: u64 },

    #[error("Backup error: {message}")]
    Backup {
        message: String,
        path: Option<String>,
    },

    #[error("Persistence error for configuration '{config_id}': {message}")]
    Persistence { config_id: String, message: String },

    #[error("Issue '{code}' is not auto-fixable{}", entity.as_ref().map(|e| format!(" (entity '{e}')")).unwrap_or_default())]
    FixRejected { code: String, entity: Option<String> },

    #[error("Fix action '{action}' failed: {message}")]
    ActionFailed { action: String, message: String },

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ValidatorError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: None,
        }
    }

    /// Create a configuration error with a specific key
    pub fn configuration_with_key(message: impl Into<String>, config_key: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: Some(config_key.into()),
        }
    }

    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create a sampling error for an entity
    pub fn sampling(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sampling {
            entity: entity.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a sampling error that keeps the driver error as its source
    pub fn sampling_with_source(
        entity: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Sampling {
            entity: entity.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn timeout(entity: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            entity: entity.into(),
            millis: after.as_millis() as u64,
        }
    }

    /// Create a backup error
    pub fn backup(message: impl Into<String>) -> Self {
        Self::Backup {
            message: message.into(),
            path: None,
        }
    }

    /// Create a backup error tied to a filesystem location
    pub fn backup_at(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Backup {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn persistence(config_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence {
            config_id: config_id.into(),
            message: message.into(),
        }
    }

    pub fn fix_rejected(code: impl Into<String>, entity: Option<String>) -> Self {
        Self::FixRejected {
            code: code.into(),
            entity,
        }
    }

    pub fn action_failed(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ActionFailed {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same operation may succeed
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ValidatorError::Sampling { .. } | ValidatorError::Timeout { .. } | ValidatorError::IoError(_)
        )
    }
}

impl From<serde_yaml::Error> for ValidatorError {
    fn from(err: serde_yaml::Error) -> Self {
        ValidatorError::parse("YAML", err.to_string())
    }
}

impl From<toml::de::Error> for ValidatorError {
    fn from(err: toml::de::Error) -> Self {
        ValidatorError::parse("TOML", err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ValidatorError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        ValidatorError::LockPoisoned(err.to_string())
    }
}
