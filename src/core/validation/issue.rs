// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validation issues and the aggregated result shape shared by structural
//! and data-aware passes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue codes produced by the validators
pub mod codes {
    // Structural
    pub const MISSING_ENTITIES_SECTION: &str = "MISSING_ENTITIES_SECTION";
    pub const MISSING_REQUIRED_FIELD: &str = "MISSING_REQUIRED_FIELD";
    pub const INVALID_FIELD_TYPE: &str = "INVALID_FIELD_TYPE";
    pub const UNRESOLVED_REFERENCE: &str = "UNRESOLVED_REFERENCE";
    pub const CIRCULAR_DEPENDENCY: &str = "CIRCULAR_DEPENDENCY";
    pub const UNKNOWN_DATA_SOURCE: &str = "UNKNOWN_DATA_SOURCE";
    pub const SQL_MISSING_DATA_SOURCE: &str = "SQL_MISSING_DATA_SOURCE";
    pub const SQL_EMPTY_QUERY: &str = "SQL_EMPTY_QUERY";
    pub const SQL_WITH_SOURCE: &str = "SQL_WITH_SOURCE";
    pub const FIXED_MISSING_VALUES: &str = "FIXED_MISSING_VALUES";
    pub const FIXED_ROW_LENGTH_MISMATCH: &str = "FIXED_ROW_LENGTH_MISMATCH";
    pub const FIXED_WITH_SOURCE: &str = "FIXED_WITH_SOURCE";
    pub const FK_MISSING_FIELD: &str = "FK_MISSING_FIELD";
    pub const FK_KEY_LENGTH_MISMATCH: &str = "FK_KEY_LENGTH_MISMATCH";
    pub const FK_CROSS_WITH_KEYS: &str = "FK_CROSS_WITH_KEYS";
    pub const FK_INVALID_EXTRA_COLUMNS: &str = "FK_INVALID_EXTRA_COLUMNS";
    pub const UNNEST_MISSING_FIELD: &str = "UNNEST_MISSING_FIELD";
    pub const UNNEST_MISSING_ID_VARS: &str = "UNNEST_MISSING_ID_VARS";
    pub const INVALID_DROP_DUPLICATES: &str = "INVALID_DROP_DUPLICATES";
    pub const DUPLICATE_SURROGATE_ID: &str = "DUPLICATE_SURROGATE_ID";
    pub const SURROGATE_ID_NAMING: &str = "SURROGATE_ID_NAMING";
    pub const APPEND_TYPE_AND_SOURCE: &str = "APPEND_TYPE_AND_SOURCE";
    pub const APPEND_MISSING_TYPE_OR_SOURCE: &str = "APPEND_MISSING_TYPE_OR_SOURCE";
    pub const APPEND_MISSING_VALUES: &str = "APPEND_MISSING_VALUES";
    pub const APPEND_MISSING_QUERY: &str = "APPEND_MISSING_QUERY";
    pub const APPEND_UNKNOWN_SOURCE: &str = "APPEND_UNKNOWN_SOURCE";
    pub const APPEND_NO_COLUMN_MAPPING: &str = "APPEND_NO_COLUMN_MAPPING";
    pub const APPEND_INVALID_MODE: &str = "APPEND_INVALID_MODE";

    // Data-aware
    pub const COLUMN_NOT_FOUND: &str = "COLUMN_NOT_FOUND";
    pub const DUPLICATE_NATURAL_KEYS: &str = "DUPLICATE_NATURAL_KEYS";
    pub const EMPTY_RESULT: &str = "EMPTY_RESULT";
    pub const FK_COLUMN_NOT_FOUND: &str = "FK_COLUMN_NOT_FOUND";
    pub const FK_UNMATCHED_ROWS: &str = "FK_UNMATCHED_ROWS";
    pub const FK_TYPE_MISMATCH: &str = "FK_TYPE_MISMATCH";
    pub const JOIN_FANOUT: &str = "JOIN_FANOUT";
    /// A check could not run because its sample was unavailable
    pub const SAMPLE_UNAVAILABLE: &str = "SAMPLE_UNAVAILABLE";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Structural,
    Data,
    Performance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// One problem found in a configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub category: IssueCategory,
    pub priority: Priority,
    #[serde(default)]
    pub auto_fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        category: IssueCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let priority = match severity {
            Severity::Error => Priority::High,
            Severity::Warning => Priority::Medium,
            Severity::Info => Priority::Low,
        };
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            entity: None,
            field: None,
            category,
            priority,
            auto_fixable: false,
            suggestion: None,
        }
    }

    /// Structural error
    pub fn structural_error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, IssueCategory::Structural, code, message)
    }

    /// Structural warning
    pub fn structural_warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, IssueCategory::Structural, code, message)
    }

    pub fn data_error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, IssueCategory::Data, code, message)
    }

    pub fn data_warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, IssueCategory::Data, code, message)
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: IssueCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn auto_fixable(mut self, fixable: bool) -> Self {
        self.auto_fixable = fixable;
        self
    }

    /// Whether this issue marks a check that could not run
    #[inline]
    pub fn is_check_unavailable(&self) -> bool {
        self.code == codes::SAMPLE_UNAVAILABLE
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity.as_str(), self.code)?;
        if let Some(entity) = &self.entity {
            write!(f, " {}", entity)?;
            if let Some(field) = &self.field {
                write!(f, ".{}", field)?;
            }
        }
        write!(f, ": {}", self.message)
    }
}

/// Aggregated outcome of one validation pass
///
/// Structural and data results share this shape so they merge by
/// concatenation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub info: Vec<ValidationIssue>,
    pub error_count: usize,
    pub warning_count: usize,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
            error_count: 0,
            warning_count: 0,
        }
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_issues(issues: impl IntoIterator<Item = ValidationIssue>) -> Self {
        let mut result = Self::new();
        result.extend(issues);
        result
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => {
                self.errors.push(issue);
                self.error_count += 1;
                self.is_valid = false;
            }
            Severity::Warning => {
                self.warnings.push(issue);
                self.warning_count += 1;
            }
            Severity::Info => self.info.push(issue),
        }
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        for issue in issues {
            self.push(issue);
        }
    }

    /// Concatenate another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.is_valid = self.is_valid && other.is_valid;
        self.error_count += other.error_count;
        self.warning_count += other.warning_count;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.info.extend(other.info);
    }

    /// Every issue, errors first
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.info.iter())
    }

    pub fn total_issues(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.info.len()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues().any(|issue| issue.code == code)
    }

    pub fn issues_with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.issues().filter(move |issue| issue.code == code)
    }

    /// Issues marking checks that could not run
    pub fn unavailable_checks(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues().filter(|issue| issue.is_check_unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priority_follows_severity() {
        assert_eq!(
            ValidationIssue::structural_error("X", "x").priority,
            Priority::High
        );
        assert_eq!(
            ValidationIssue::data_warning("X", "x").priority,
            Priority::Medium
        );
        let info = ValidationIssue::new(Severity::Info, IssueCategory::Data, "X", "x");
        assert_eq!(info.priority, Priority::Low);
    }

    #[test]
    fn test_result_buckets_and_counts() {
        let result = ValidationResult::from_issues(vec![
            ValidationIssue::structural_error(codes::UNRESOLVED_REFERENCE, "missing"),
            ValidationIssue::structural_warning(codes::SURROGATE_ID_NAMING, "naming"),
            ValidationIssue::new(Severity::Info, IssueCategory::Data, "NOTE", "note"),
        ]);

        assert!(!result.is_valid);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.warning_count, 1);
        assert_eq!(result.info.len(), 1);
        assert_eq!(result.total_issues(), 3);
        assert!(result.has_code(codes::SURROGATE_ID_NAMING));
    }

    #[test]
    fn test_merge_concatenates_and_sums() {
        let mut structural = ValidationResult::from_issues(vec![
            ValidationIssue::structural_warning(codes::UNNEST_MISSING_ID_VARS, "id vars"),
        ]);
        let data = ValidationResult::from_issues(vec![
            ValidationIssue::data_error(codes::COLUMN_NOT_FOUND, "gone"),
            ValidationIssue::data_warning(codes::EMPTY_RESULT, "empty"),
        ]);

        assert!(structural.is_valid);
        structural.merge(data);
        assert!(!structural.is_valid);
        assert_eq!(structural.error_count, 1);
        assert_eq!(structural.warning_count, 2);
        assert_eq!(structural.warnings.len(), 2);
    }

    #[test]
    fn test_display_includes_location() {
        let issue = ValidationIssue::data_error(codes::COLUMN_NOT_FOUND, "column 'x' missing")
            .with_entity("orders")
            .with_field("x");
        assert_eq!(
            issue.to_string(),
            "[error] COLUMN_NOT_FOUND orders.x: column 'x' missing"
        );
    }

    #[test]
    fn test_serializes_snake_case() {
        let issue = ValidationIssue::data_warning(codes::EMPTY_RESULT, "empty")
            .with_priority(Priority::Medium)
            .with_entity("orders");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["category"], "data");
        assert_eq!(json["priority"], "medium");
        assert!(json.get("field").is_none());
    }
}
