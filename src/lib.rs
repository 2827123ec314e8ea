// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity configuration validation and remediation.
//!
//! - [`core::validation`]: dependency graph, cycle detection and structural checks
//! - [`core::data`]: data-aware checks over sampled rows
//! - [`core::fix`]: fix suggestions, previews and backed-up apply with rollback
//! - [`core::service`]: the combined validation entry point

pub mod core;

pub use crate::core::config::{ProjectConfig, ValidatorSettings};
pub use crate::core::error::{ValidatorError, ValidatorResult};
pub use crate::core::fix::AutoFixEngine;
pub use crate::core::service::ValidationService;
pub use crate::core::validation::{ValidationIssue, ValidationResult};
