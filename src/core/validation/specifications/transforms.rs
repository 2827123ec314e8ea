// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_yaml::Value;

use super::{is_blank, is_string_list, yaml_type_name};
use crate::core::config::{entity::string_list, EntityConfig};
use crate::core::validation::issue::{codes, Priority, ValidationIssue};
use crate::core::validation::specification::{ConfigSpecification, SpecificationContext};

/// `unnest` declares `value_vars`, `var_name` and `value_name`; a missing
/// `id_vars` is a warning
pub struct UnnestSpecification;

impl ConfigSpecification for UnnestSpecification {
    fn name(&self) -> &'static str {
        "unnest"
    }

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (name, entity) in ctx.entities() {
            let unnest = match entity.get("unnest") {
                None | Some(Value::Null) => continue,
                Some(u @ Value::Mapping(_)) => u,
                Some(other) => {
                    issues.push(
                        ValidationIssue::structural_error(
                            codes::INVALID_FIELD_TYPE,
                            format!(
                                "Entity '{}' unnest must be a mapping, found {}",
                                name,
                                yaml_type_name(other)
                            ),
                        )
                        .with_entity(name)
                        .with_field("unnest"),
                    );
                    continue;
                }
            };

            for field in ["value_vars", "var_name", "value_name"] {
                if is_blank(unnest.get(field)) {
                    issues.push(
                        ValidationIssue::structural_error(
                            codes::UNNEST_MISSING_FIELD,
                            format!("Entity '{}' unnest is missing '{}'", name, field),
                        )
                        .with_entity(name)
                        .with_field(format!("unnest.{}", field)),
                    );
                }
            }

            if unnest.get("id_vars").is_none() {
                let inferred = infer_id_vars(&EntityConfig::from_value(name, entity));
                let mut issue = ValidationIssue::structural_warning(
                    codes::UNNEST_MISSING_ID_VARS,
                    format!("Entity '{}' unnest has no id_vars", name),
                )
                .with_entity(name)
                .with_field("unnest.id_vars")
                .auto_fixable(!inferred.is_empty());
                if !inferred.is_empty() {
                    issue = issue.with_suggestion(format!(
                        "Set unnest.id_vars to [{}]",
                        inferred.join(", ")
                    ));
                }
                issues.push(issue);
            }
        }

        issues
    }
}

/// Columns kept as identifiers when unnesting: every declared column that is
/// not one of the unpivoted `value_vars`
pub fn infer_id_vars(entity: &EntityConfig) -> Vec<String> {
    let Some(unnest) = &entity.unnest else {
        return Vec::new();
    };
    entity
        .columns
        .iter()
        .filter(|c| !unnest.value_vars.contains(c))
        .filter(|c| unnest.var_name.as_ref() != Some(*c) && unnest.value_name.as_ref() != Some(*c))
        .cloned()
        .collect()
}

/// `drop_duplicates` is a boolean, a column name, or a list of column names
pub struct DropDuplicatesSpecification;

impl ConfigSpecification for DropDuplicatesSpecification {
    fn name(&self) -> &'static str {
        "drop_duplicates"
    }

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (name, entity) in ctx.entities() {
            let Some(value) = entity.get("drop_duplicates") else {
                continue;
            };
            let valid = match value {
                Value::Bool(_) | Value::String(_) => true,
                Value::Sequence(_) => is_string_list(value),
                _ => false,
            };
            if !valid {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::INVALID_DROP_DUPLICATES,
                        format!(
                            "Entity '{}' drop_duplicates must be a boolean, column name, or list of column names, found {}",
                            name,
                            yaml_type_name(value)
                        ),
                    )
                    .with_entity(name)
                    .with_field("drop_duplicates")
                    .with_priority(Priority::Medium)
                    .with_suggestion("Remove drop_duplicates or set it to true or a list of columns")
                    .auto_fixable(true),
                );
            } else if let Value::Sequence(_) = value {
                let columns = string_list(entity.get("columns"));
                for col in string_list(Some(value)) {
                    if !columns.is_empty() && !columns.contains(&col) {
                        issues.push(
                            ValidationIssue::structural_warning(
                                codes::INVALID_DROP_DUPLICATES,
                                format!(
                                    "Entity '{}' drop_duplicates names '{}' which is not a declared column",
                                    name, col
                                ),
                            )
                            .with_entity(name)
                            .with_field("drop_duplicates"),
                        );
                    }
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::issue::Severity;
    use crate::core::validation::specifications::test_support::{codes_of, run};

    #[test]
    fn test_unnest_missing_fields() {
        let issues = run(
            &UnnestSpecification,
            r#"
entities:
  measurements:
    columns: [site, jan, feb]
    keys: [site]
    unnest:
      id_vars: [site]
      value_vars: [jan, feb]
"#,
        );
        assert_eq!(codes_of(&issues), vec![codes::UNNEST_MISSING_FIELD; 2]);
        assert_eq!(issues[0].field.as_deref(), Some("unnest.var_name"));
        assert_eq!(issues[1].field.as_deref(), Some("unnest.value_name"));
    }

    #[test]
    fn test_missing_id_vars_is_fixable_warning() {
        let issues = run(
            &UnnestSpecification,
            r#"
entities:
  measurements:
    columns: [site, region, jan, feb]
    keys: [site]
    unnest:
      value_vars: [jan, feb]
      var_name: month
      value_name: amount
"#,
        );
        assert_eq!(codes_of(&issues), vec![codes::UNNEST_MISSING_ID_VARS]);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].auto_fixable);
        assert_eq!(
            issues[0].suggestion.as_deref(),
            Some("Set unnest.id_vars to [site, region]")
        );
    }

    #[test]
    fn test_drop_duplicates_shapes() {
        let issues = run(
            &DropDuplicatesSpecification,
            r#"
entities:
  a: {columns: [id], keys: [id], drop_duplicates: true}
  b: {columns: [id], keys: [id], drop_duplicates: id}
  c: {columns: [id], keys: [id], drop_duplicates: [id]}
  d: {columns: [id], keys: [id], drop_duplicates: 3}
  e: {columns: [id], keys: [id], drop_duplicates: {id: true}}
"#,
        );
        assert_eq!(codes_of(&issues), vec![codes::INVALID_DROP_DUPLICATES; 2]);
        assert_eq!(issues[0].entity.as_deref(), Some("d"));
        assert_eq!(issues[1].entity.as_deref(), Some("e"));
        assert!(issues.iter().all(|i| i.auto_fixable));
    }

    #[test]
    fn test_drop_duplicates_unknown_column_warns() {
        let issues = run(
            &DropDuplicatesSpecification,
            "entities:\n  a: {columns: [id], keys: [id], drop_duplicates: [id, ghost]}\n",
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(!issues[0].auto_fixable);
    }
}
