// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_yaml::Value;

use super::{declared_type, is_blank, yaml_type_name};
use crate::core::validation::issue::{codes, ValidationIssue};
use crate::core::validation::specification::{ConfigSpecification, SpecificationContext};

/// SQL entities need a `data_source` and a non-empty `query`, and read rows
/// from the query rather than a `source` entity
pub struct SqlEntitySpecification;

impl ConfigSpecification for SqlEntitySpecification {
    fn name(&self) -> &'static str {
        "sql_entity"
    }

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (name, entity) in ctx.entities().filter(|(_, e)| declared_type(e) == Some("sql")) {
            if is_blank(entity.get("data_source")) {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::SQL_MISSING_DATA_SOURCE,
                        format!("SQL entity '{}' has no data_source", name),
                    )
                    .with_entity(name)
                    .with_field("data_source"),
                );
            }
            if is_blank(entity.get("query")) {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::SQL_EMPTY_QUERY,
                        format!("SQL entity '{}' has no query", name),
                    )
                    .with_entity(name)
                    .with_field("query"),
                );
            }
            if entity.get("source").is_some() {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::SQL_WITH_SOURCE,
                        format!(
                            "SQL entity '{}' declares 'source'; rows come from its query",
                            name
                        ),
                    )
                    .with_entity(name)
                    .with_field("source")
                    .with_suggestion("Remove the 'source' field")
                    .auto_fixable(true),
                );
            }
        }

        issues
    }
}

/// Fixed entities carry inline `values` rows matching `columns`, and no
/// `source`
pub struct FixedEntitySpecification;

impl ConfigSpecification for FixedEntitySpecification {
    fn name(&self) -> &'static str {
        "fixed_entity"
    }

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (name, entity) in ctx.entities().filter(|(_, e)| declared_type(e) == Some("fixed")) {
            let width = match entity.get("columns") {
                Some(Value::Sequence(cols)) => Some(cols.len()),
                _ => None,
            };

            match entity.get("values") {
                None | Some(Value::Null) => issues.push(
                    ValidationIssue::structural_error(
                        codes::FIXED_MISSING_VALUES,
                        format!("Fixed entity '{}' has no values", name),
                    )
                    .with_entity(name)
                    .with_field("values"),
                ),
                Some(Value::Sequence(rows)) => {
                    if let Some(width) = width {
                        check_rows(name, rows, width, &mut issues);
                    }
                }
                Some(other) => issues.push(
                    ValidationIssue::structural_error(
                        codes::INVALID_FIELD_TYPE,
                        format!(
                            "Fixed entity '{}' values must be a list of rows, found {}",
                            name,
                            yaml_type_name(other)
                        ),
                    )
                    .with_entity(name)
                    .with_field("values"),
                ),
            }

            if entity.get("source").is_some() {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::FIXED_WITH_SOURCE,
                        format!(
                            "Fixed entity '{}' declares 'source'; rows come from its values",
                            name
                        ),
                    )
                    .with_entity(name)
                    .with_field("source")
                    .with_suggestion("Remove the 'source' field")
                    .auto_fixable(true),
                );
            }
        }

        issues
    }
}

fn check_rows(name: &str, rows: &[Value], width: usize, issues: &mut Vec<ValidationIssue>) {
    for (idx, row) in rows.iter().enumerate() {
        let len = match row {
            Value::Sequence(cells) => cells.len(),
            Value::Mapping(_) => {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::INVALID_FIELD_TYPE,
                        format!("Fixed entity '{}' row {} must be a list, found mapping", name, idx),
                    )
                    .with_entity(name)
                    .with_field(format!("values[{}]", idx)),
                );
                continue;
            }
            // bare scalar row
            _ => 1,
        };
        if len != width {
            issues.push(
                ValidationIssue::structural_error(
                    codes::FIXED_ROW_LENGTH_MISMATCH,
                    format!(
                        "Fixed entity '{}' row {} has {} value(s), expected {} to match columns",
                        name, idx, len, width
                    ),
                )
                .with_entity(name)
                .with_field(format!("values[{}]", idx)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::specifications::test_support::{codes_of, run};

    #[test]
    fn test_sql_entity_shape() {
        let issues = run(
            &SqlEntitySpecification,
            r#"
entities:
  users:
    type: sql
    query: "  "
    source: staging
  staging: {columns: [id], keys: [id]}
"#,
        );
        assert_eq!(
            codes_of(&issues),
            vec![
                codes::SQL_MISSING_DATA_SOURCE,
                codes::SQL_EMPTY_QUERY,
                codes::SQL_WITH_SOURCE
            ]
        );
        assert!(issues[2].auto_fixable);
        assert!(!issues[0].auto_fixable);
    }

    #[test]
    fn test_valid_sql_entity() {
        let issues = run(
            &SqlEntitySpecification,
            "entities:\n  users:\n    type: sql\n    data_source: db\n    query: select 1\n",
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_fixed_rows_must_match_columns() {
        let issues = run(
            &FixedEntitySpecification,
            r#"
entities:
  kinds:
    type: fixed
    surrogate_id: kind_id
    columns: [code, label]
    values:
      - [a, Alpha]
      - [b]
      - [c, Gamma, extra]
"#,
        );
        assert_eq!(codes_of(&issues), vec![codes::FIXED_ROW_LENGTH_MISMATCH; 2]);
        assert_eq!(issues[0].field.as_deref(), Some("values[1]"));
        assert_eq!(issues[1].field.as_deref(), Some("values[2]"));
    }

    #[test]
    fn test_single_column_fixed_entity_accepts_scalars() {
        let issues = run(
            &FixedEntitySpecification,
            "entities:\n  kinds:\n    type: fixed\n    surrogate_id: kind_id\n    columns: [code]\n    values: [a, b, [c]]\n",
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_fixed_missing_values_and_source() {
        let issues = run(
            &FixedEntitySpecification,
            "entities:\n  kinds:\n    type: fixed\n    surrogate_id: kind_id\n    columns: [code]\n    source: other\n",
        );
        assert_eq!(
            codes_of(&issues),
            vec![codes::FIXED_MISSING_VALUES, codes::FIXED_WITH_SOURCE]
        );
        assert!(issues[1].auto_fixable);
    }
}
