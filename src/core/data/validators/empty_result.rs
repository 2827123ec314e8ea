// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{EntityDataContext, EntityDataValidator};
use crate::core::validation::issue::{codes, Priority, ValidationIssue};

/// An empty sample is worth a warning, never an error
pub struct EmptyResultValidator;

impl EntityDataValidator for EmptyResultValidator {
    fn name(&self) -> &'static str {
        "empty_result"
    }

    fn validate(&self, ctx: &EntityDataContext<'_>) -> Vec<ValidationIssue> {
        if !ctx.sample.is_empty() {
            return Vec::new();
        }
        vec![ValidationIssue::data_warning(
            codes::EMPTY_RESULT,
            format!("Entity '{}' returned no rows", ctx.entity.name),
        )
        .with_entity(&ctx.entity.name)
        .with_priority(Priority::Medium)
        .with_suggestion("Check the query filters or the upstream entities if rows are expected")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProjectConfig;
    use crate::core::data::validators::test_support::ints;
    use crate::core::validation::issue::Severity;

    #[test]
    fn test_empty_sample_warns() {
        let config = ProjectConfig::from_yaml_str("entities:\n  users: {columns: [id], keys: [id]}\n").unwrap();
        let entity = config.entity("users").unwrap();

        let empty = ints("id", []);
        let issues = EmptyResultValidator.validate(&EntityDataContext {
            config: &config,
            entity: &entity,
            sample: &empty,
        });
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].priority, Priority::Medium);

        let full = ints("id", [1]);
        assert!(EmptyResultValidator
            .validate(&EntityDataContext {
                config: &config,
                entity: &entity,
                sample: &full,
            })
            .is_empty());
    }
}
