// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{EntityDataContext, EntityDataValidator};
use crate::core::config::is_value_reference;
use crate::core::validation::issue::{codes, Priority, ValidationIssue};

/// Declared columns and keys are present in the sampled output
///
/// `@value:` entries are resolved against the configuration first. Columns
/// consumed by `unnest.value_vars` are not expected in the output. Removing
/// a missing plain column is auto-fixable only when nothing else in the
/// entity uses it.
pub struct ColumnExistenceValidator;

impl EntityDataValidator for ColumnExistenceValidator {
    fn name(&self) -> &'static str {
        "column_existence"
    }

    fn validate(&self, ctx: &EntityDataContext<'_>) -> Vec<ValidationIssue> {
        let entity = ctx.entity;
        let unpivoted: &[String] = entity
            .unnest
            .as_ref()
            .map(|u| u.value_vars.as_slice())
            .unwrap_or(&[]);
        let mut issues = Vec::new();

        for declared in &entity.columns {
            if is_value_reference(declared) {
                match ctx.config.resolve_value_reference(declared) {
                    Some(resolved) => {
                        for column in resolved.iter().filter(|c| !ctx.sample.has_column(c)) {
                            issues.push(
                                missing(&entity.name, column, "columns")
                                    .with_suggestion(format!(
                                        "Column '{}' comes from '{}'; update the referenced list or the source query",
                                        column, declared
                                    )),
                            );
                        }
                    }
                    None => issues.push(
                        ValidationIssue::data_error(
                            codes::COLUMN_NOT_FOUND,
                            format!(
                                "Entity '{}' column reference '{}' does not resolve to any columns",
                                entity.name, declared
                            ),
                        )
                        .with_entity(&entity.name)
                        .with_field(declared.as_str())
                        .with_priority(Priority::High),
                    ),
                }
                continue;
            }

            if unpivoted.contains(declared) || ctx.sample.has_column(declared) {
                continue;
            }

            let used_elsewhere = entity.references_column_elsewhere(declared);
            let suggestion = if used_elsewhere {
                format!(
                    "Column '{}' is also used by keys, foreign keys or transforms; fix the source query or those references",
                    declared
                )
            } else {
                format!("Remove '{}' from columns", declared)
            };
            issues.push(
                missing(&entity.name, declared, declared)
                    .with_suggestion(suggestion)
                    .auto_fixable(!used_elsewhere),
            );
        }

        for key in entity
            .keys
            .iter()
            .filter(|k| !entity.columns.contains(k) && !ctx.sample.has_column(k))
        {
            issues.push(
                missing(&entity.name, key, "keys")
                    .with_suggestion(format!("Key '{}' must be produced by the entity", key)),
            );
        }

        issues
    }
}

fn missing(entity: &str, column: &str, field: &str) -> ValidationIssue {
    ValidationIssue::data_error(
        codes::COLUMN_NOT_FOUND,
        format!(
            "Column '{}' of entity '{}' not found in sampled data",
            column, entity
        ),
    )
    .with_entity(entity)
    .with_field(field)
    .with_priority(Priority::High)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProjectConfig;
    use crate::core::data::sample::Sample;

    const CONFIG: &str = r#"
entities:
  users:
    columns: [id, name]
    keys: [id]
  orders:
    columns: [order_id, user_id, legacy_flag, "@value: entities.users.keys", region]
    keys: [order_id]
    foreign_keys:
      - entity: users
        local_keys: [user_id]
        remote_keys: [id]
"#;

    fn run(sample_columns: &[&str]) -> Vec<ValidationIssue> {
        let config = ProjectConfig::from_yaml_str(CONFIG).unwrap();
        let entity = config.entity("orders").unwrap();
        let sample = Sample::new(
            sample_columns.iter().map(|c| c.to_string()).collect(),
            Vec::new(),
        );
        ColumnExistenceValidator.validate(&EntityDataContext {
            config: &config,
            entity: &entity,
            sample: &sample,
        })
    }

    #[test]
    fn test_all_columns_present() {
        assert!(run(&["order_id", "user_id", "legacy_flag", "id", "region"]).is_empty());
    }

    #[test]
    fn test_unused_missing_column_is_auto_fixable() {
        let issues = run(&["order_id", "user_id", "id", "region"]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::COLUMN_NOT_FOUND);
        assert_eq!(issues[0].field.as_deref(), Some("legacy_flag"));
        assert_eq!(issues[0].priority, Priority::High);
        assert!(issues[0].auto_fixable);
    }

    #[test]
    fn test_column_used_by_foreign_key_is_not_auto_fixable() {
        let issues = run(&["order_id", "legacy_flag", "id", "region"]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field.as_deref(), Some("user_id"));
        assert!(!issues[0].auto_fixable);
    }

    #[test]
    fn test_value_reference_is_resolved() {
        let issues = run(&["order_id", "user_id", "legacy_flag", "region"]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("'id'"));
        assert_eq!(issues[0].field.as_deref(), Some("columns"));
        assert!(!issues[0].auto_fixable);
    }
}
