// SPDX-License-Identifier: MIT OR Apache-2.0

//! Issue code → fix actions
//!
//! | Code                                  | Actions                                  |
//! |---------------------------------------|------------------------------------------|
//! | `COLUMN_NOT_FOUND`                    | remove the column                        |
//! | `SQL_WITH_SOURCE`, `FIXED_WITH_SOURCE`| remove `source` (destructive)            |
//! | `INVALID_DROP_DUPLICATES`             | remove `drop_duplicates` (destructive)   |
//! | `UNNEST_MISSING_ID_VARS`              | add the inferred `unnest.id_vars`        |
//! | `APPEND_INVALID_MODE`                 | set the mode to `all`                    |
//!
//! Everything else is a manual fix with an explanation.

use std::collections::HashSet;

use serde_yaml::Value;

use super::action::{FixAction, FixSuggestion};
use crate::core::config::ProjectConfig;
use crate::core::validation::issue::{codes, ValidationIssue};
use crate::core::validation::specifications::infer_id_vars;

/// Suggest a fix for one issue; never skips an issue
pub fn suggest_fix(issue: &ValidationIssue, config: &ProjectConfig) -> FixSuggestion {
    let Some(entity) = issue.entity.as_deref() else {
        return FixSuggestion::manual(issue, manual_explanation(issue));
    };

    let suggestion = match issue.code.as_str() {
        codes::COLUMN_NOT_FOUND if issue.auto_fixable => issue
            .field
            .as_deref()
            .map(|column| FixSuggestion::automatic(issue, vec![FixAction::remove_column(entity, column)])),
        codes::SQL_WITH_SOURCE | codes::FIXED_WITH_SOURCE => Some(
            FixSuggestion::automatic(issue, vec![FixAction::remove_constraint(entity, "source")])
                .with_warning(format!(
                    "Removes 'source' from '{}'; the previous value survives only in the backup",
                    entity
                )),
        ),
        codes::INVALID_DROP_DUPLICATES if issue.auto_fixable => Some(
            FixSuggestion::automatic(
                issue,
                vec![FixAction::remove_constraint(entity, "drop_duplicates")],
            )
            .with_warning(format!(
                "Removes 'drop_duplicates' from '{}'; rows are no longer deduplicated",
                entity
            )),
        ),
        codes::UNNEST_MISSING_ID_VARS => config
            .entity(entity)
            .map(|e| infer_id_vars(&e))
            .filter(|id_vars| !id_vars.is_empty())
            .map(|id_vars| {
                let value = Value::Sequence(id_vars.into_iter().map(Value::String).collect());
                FixSuggestion::automatic(
                    issue,
                    vec![FixAction::add_constraint(entity, "unnest.id_vars", value)],
                )
            }),
        codes::APPEND_INVALID_MODE => issue.field.as_deref().map(|field| {
            FixSuggestion::automatic(
                issue,
                vec![FixAction::update_reference(entity, field, Value::String("all".to_string()))],
            )
        }),
        _ => None,
    };

    suggestion.unwrap_or_else(|| FixSuggestion::manual(issue, manual_explanation(issue)))
}

/// Suggestions grouped by issue code, codes in order of first appearance
///
/// Repeats of the same (code, entity, field) collapse into one suggestion, so
/// merged result sets never apply an action twice.
pub fn suggest_fixes(issues: &[ValidationIssue], config: &ProjectConfig) -> Vec<FixSuggestion> {
    let mut seen: HashSet<(&str, Option<&str>, Option<&str>)> = HashSet::with_capacity(issues.len());
    let mut groups: Vec<(&str, Vec<FixSuggestion>)> = Vec::new();

    for issue in issues {
        let identity = (issue.code.as_str(), issue.entity.as_deref(), issue.field.as_deref());
        if !seen.insert(identity) {
            log::debug!("Skipping repeated issue {} for {:?}", issue.code, issue.entity);
            continue;
        }
        let suggestion = suggest_fix(issue, config);
        match groups.iter_mut().find(|(code, _)| *code == issue.code) {
            Some((_, group)) => group.push(suggestion),
            None => groups.push((issue.code.as_str(), vec![suggestion])),
        }
    }

    groups.into_iter().flat_map(|(_, group)| group).collect()
}

fn manual_explanation(issue: &ValidationIssue) -> String {
    match issue.code.as_str() {
        codes::UNRESOLVED_REFERENCE => "The referenced entity does not exist. Create it or correct the name; \
             the intended target cannot be inferred safely."
            .to_string(),
        codes::DUPLICATE_NATURAL_KEYS => "Duplicate keys come from the source data or the key choice. \
             Review the data, choose different keys, or enable drop_duplicates deliberately."
            .to_string(),
        codes::CIRCULAR_DEPENDENCY => {
            "Break the cycle by removing or redirecting one of the listed dependencies.".to_string()
        }
        codes::COLUMN_NOT_FOUND => {
            "The column is still used elsewhere in the entity; update the source query or every reference together."
                .to_string()
        }
        _ => match &issue.suggestion {
            Some(suggestion) => suggestion.clone(),
            None => format!("No automatic fix exists for {}; edit the configuration manually.", issue.code),
        },
    }
}
