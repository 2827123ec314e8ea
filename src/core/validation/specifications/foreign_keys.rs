// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_yaml::Value;

use super::{is_string_list, yaml_type_name};
use crate::core::validation::issue::{codes, ValidationIssue};
use crate::core::validation::specification::{ConfigSpecification, SpecificationContext};

/// Foreign-key declarations are well formed
///
/// A non-cross key needs an `entity` and equally long `local_keys` /
/// `remote_keys`; a `cross` join must not declare any keys. `extra_columns`
/// may be a string, a list of strings, or a mapping.
pub struct ForeignKeySpecification;

impl ConfigSpecification for ForeignKeySpecification {
    fn name(&self) -> &'static str {
        "foreign_key"
    }

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (name, entity) in ctx.entities() {
            let fks = match entity.get("foreign_keys") {
                None | Some(Value::Null) => continue,
                Some(Value::Sequence(fks)) => fks,
                Some(other) => {
                    issues.push(
                        ValidationIssue::structural_error(
                            codes::INVALID_FIELD_TYPE,
                            format!(
                                "Entity '{}' foreign_keys must be a list, found {}",
                                name,
                                yaml_type_name(other)
                            ),
                        )
                        .with_entity(name)
                        .with_field("foreign_keys"),
                    );
                    continue;
                }
            };

            for (idx, fk) in fks.iter().enumerate() {
                check_foreign_key(name, idx, fk, &mut issues);
            }
        }

        issues
    }
}

fn check_foreign_key(name: &str, idx: usize, fk: &Value, issues: &mut Vec<ValidationIssue>) {
    let field = |suffix: &str| format!("foreign_keys[{}].{}", idx, suffix);

    if !fk.is_mapping() {
        issues.push(
            ValidationIssue::structural_error(
                codes::INVALID_FIELD_TYPE,
                format!(
                    "Entity '{}' foreign key #{} must be a mapping, found {}",
                    name,
                    idx,
                    yaml_type_name(fk)
                ),
            )
            .with_entity(name)
            .with_field(format!("foreign_keys[{}]", idx)),
        );
        return;
    }

    if fk.get("entity").and_then(Value::as_str).is_none() {
        issues.push(
            ValidationIssue::structural_error(
                codes::FK_MISSING_FIELD,
                format!("Entity '{}' foreign key #{} has no target 'entity'", name, idx),
            )
            .with_entity(name)
            .with_field(field("entity")),
        );
    }

    let local = fk.get("local_keys");
    let remote = fk.get("remote_keys");
    let is_cross = fk.get("how").and_then(Value::as_str) == Some("cross");

    if is_cross {
        if non_empty(local) || non_empty(remote) {
            issues.push(
                ValidationIssue::structural_error(
                    codes::FK_CROSS_WITH_KEYS,
                    format!(
                        "Entity '{}' foreign key #{} is a cross join but declares join keys",
                        name, idx
                    ),
                )
                .with_entity(name)
                .with_field(format!("foreign_keys[{}]", idx))
                .with_suggestion("Remove local_keys and remote_keys, or use another join type"),
            );
        }
    } else {
        for (key, value) in [("local_keys", local), ("remote_keys", remote)] {
            match value {
                None | Some(Value::Null) => issues.push(
                    ValidationIssue::structural_error(
                        codes::FK_MISSING_FIELD,
                        format!("Entity '{}' foreign key #{} has no '{}'", name, idx, key),
                    )
                    .with_entity(name)
                    .with_field(field(key)),
                ),
                Some(v) if !v.is_string() && !is_string_list(v) => issues.push(
                    ValidationIssue::structural_error(
                        codes::INVALID_FIELD_TYPE,
                        format!(
                            "Entity '{}' foreign key #{} '{}' must be a list of column names",
                            name, idx, key
                        ),
                    )
                    .with_entity(name)
                    .with_field(field(key)),
                ),
                Some(_) => {}
            }
        }

        if let (Some(l), Some(r)) = (key_count(local), key_count(remote)) {
            if l != r {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::FK_KEY_LENGTH_MISMATCH,
                        format!(
                            "Entity '{}' foreign key #{} has {} local key(s) but {} remote key(s)",
                            name, idx, l, r
                        ),
                    )
                    .with_entity(name)
                    .with_field(field("local_keys")),
                );
            }
        }
    }

    if let Some(extra) = fk.get("extra_columns") {
        let valid = matches!(extra, Value::String(_) | Value::Mapping(_) | Value::Null)
            || is_string_list(extra);
        if !valid {
            issues.push(
                ValidationIssue::structural_error(
                    codes::FK_INVALID_EXTRA_COLUMNS,
                    format!(
                        "Entity '{}' foreign key #{} extra_columns must be a string, list, or mapping, found {}",
                        name,
                        idx,
                        yaml_type_name(extra)
                    ),
                )
                .with_entity(name)
                .with_field(field("extra_columns")),
            );
        }
    }
}

fn non_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Sequence(items)) => !items.is_empty(),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn key_count(value: Option<&Value>) -> Option<usize> {
    match value {
        Some(Value::String(_)) => Some(1),
        Some(Value::Sequence(items)) => Some(items.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::specifications::test_support::{codes_of, run};

    #[test]
    fn test_well_formed_foreign_keys() {
        let issues = run(
            &ForeignKeySpecification,
            r#"
entities:
  users: {columns: [id], keys: [id]}
  orders:
    columns: [id, user_id]
    keys: [id]
    foreign_keys:
      - entity: users
        local_keys: [user_id]
        remote_keys: [id]
        extra_columns: {name: user_name}
      - entity: users
        how: cross
"#,
        );
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_key_length_mismatch() {
        let issues = run(
            &ForeignKeySpecification,
            r#"
entities:
  orders:
    foreign_keys:
      - entity: users
        local_keys: [a, b]
        remote_keys: [id]
"#,
        );
        assert_eq!(codes_of(&issues), vec![codes::FK_KEY_LENGTH_MISMATCH]);
    }

    #[test]
    fn test_cross_join_with_keys_is_always_an_error() {
        let issues = run(
            &ForeignKeySpecification,
            r#"
entities:
  orders:
    foreign_keys:
      - entity: users
        how: cross
        local_keys: [id]
"#,
        );
        assert_eq!(codes_of(&issues), vec![codes::FK_CROSS_WITH_KEYS]);
    }

    #[test]
    fn test_missing_fields_and_bad_extra_columns() {
        let issues = run(
            &ForeignKeySpecification,
            r#"
entities:
  orders:
    foreign_keys:
      - local_keys: [user_id]
        extra_columns: 42
"#,
        );
        assert_eq!(
            codes_of(&issues),
            vec![
                codes::FK_MISSING_FIELD,
                codes::FK_MISSING_FIELD,
                codes::FK_INVALID_EXTRA_COLUMNS
            ]
        );
        assert_eq!(issues[0].field.as_deref(), Some("foreign_keys[0].entity"));
        assert_eq!(issues[1].field.as_deref(), Some("foreign_keys[0].remote_keys"));
    }
}
