// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_yaml::Value;

use super::{is_blank, yaml_type_name};
use crate::core::validation::issue::{codes, Priority, ValidationIssue};
use crate::core::validation::specification::{ConfigSpecification, SpecificationContext};

pub const APPEND_MODES: &[&str] = &["all", "distinct"];

/// Append blocks declare exactly one of `type` or `source`
///
/// - `type: fixed` needs non-empty `values`
/// - `type: sql` needs a non-empty `query`
/// - `source` must name an entity; without a `columns` mapping the columns
///   are matched by name, which is only a warning
/// - `append_mode`, on the entity or a block, is `all` or `distinct`
pub struct AppendSpecification;

impl ConfigSpecification for AppendSpecification {
    fn name(&self) -> &'static str {
        "append"
    }

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (name, entity) in ctx.entities() {
            if let Some(mode) = entity.get("append_mode") {
                check_mode(name, "append_mode", mode, &mut issues);
            }

            let blocks = match entity.get("append") {
                None | Some(Value::Null) => continue,
                Some(Value::Sequence(blocks)) => blocks,
                Some(other) => {
                    issues.push(
                        ValidationIssue::structural_error(
                            codes::INVALID_FIELD_TYPE,
                            format!(
                                "Entity '{}' append must be a list of blocks, found {}",
                                name,
                                yaml_type_name(other)
                            ),
                        )
                        .with_entity(name)
                        .with_field("append"),
                    );
                    continue;
                }
            };

            for (idx, block) in blocks.iter().enumerate() {
                check_block(ctx, name, idx, block, &mut issues);
            }
        }

        issues
    }
}

fn check_block(
    ctx: &SpecificationContext<'_>,
    name: &str,
    idx: usize,
    block: &Value,
    issues: &mut Vec<ValidationIssue>,
) {
    let path = format!("append[{}]", idx);

    if !block.is_mapping() {
        issues.push(
            ValidationIssue::structural_error(
                codes::INVALID_FIELD_TYPE,
                format!(
                    "Entity '{}' append block #{} must be a mapping, found {}",
                    name,
                    idx,
                    yaml_type_name(block)
                ),
            )
            .with_entity(name)
            .with_field(path),
        );
        return;
    }

    let block_type = block.get("type");
    let source = block.get("source");

    match (block_type, source) {
        (Some(_), Some(_)) => issues.push(
            ValidationIssue::structural_error(
                codes::APPEND_TYPE_AND_SOURCE,
                format!(
                    "Entity '{}' append block #{} declares both 'type' and 'source'",
                    name, idx
                ),
            )
            .with_entity(name)
            .with_field(path.clone()),
        ),
        (None, None) => issues.push(
            ValidationIssue::structural_error(
                codes::APPEND_MISSING_TYPE_OR_SOURCE,
                format!(
                    "Entity '{}' append block #{} needs either 'type' or 'source'",
                    name, idx
                ),
            )
            .with_entity(name)
            .with_field(path.clone()),
        ),
        (Some(t), None) => match t.as_str() {
            Some("fixed") => {
                let has_values =
                    matches!(block.get("values"), Some(Value::Sequence(rows)) if !rows.is_empty());
                if !has_values {
                    issues.push(
                        ValidationIssue::structural_error(
                            codes::APPEND_MISSING_VALUES,
                            format!(
                                "Entity '{}' fixed append block #{} has no values",
                                name, idx
                            ),
                        )
                        .with_entity(name)
                        .with_field(format!("{}.values", path)),
                    );
                }
            }
            Some("sql") => {
                if is_blank(block.get("query")) {
                    issues.push(
                        ValidationIssue::structural_error(
                            codes::APPEND_MISSING_QUERY,
                            format!("Entity '{}' sql append block #{} has no query", name, idx),
                        )
                        .with_entity(name)
                        .with_field(format!("{}.query", path)),
                    );
                }
            }
            _ => {
                let shown = match t {
                    Value::String(s) => s.clone(),
                    _ => yaml_type_name(t).to_string(),
                };
                issues.push(
                    ValidationIssue::structural_error(
                        codes::APPEND_MISSING_TYPE_OR_SOURCE,
                        format!(
                            "Entity '{}' append block #{} has unknown type '{}'; expected 'fixed' or 'sql'",
                            name, idx, shown
                        ),
                    )
                    .with_entity(name)
                    .with_field(format!("{}.type", path)),
                );
            }
        },
        (None, Some(src)) => match src.as_str() {
            Some(src) if ctx.config.has_entity(src) => {
                if !matches!(block.get("columns"), Some(Value::Mapping(_))) {
                    issues.push(
                        ValidationIssue::structural_warning(
                            codes::APPEND_NO_COLUMN_MAPPING,
                            format!(
                                "Entity '{}' append block #{} from '{}' has no column mapping; columns are matched by name",
                                name, idx, src
                            ),
                        )
                        .with_entity(name)
                        .with_field(format!("{}.columns", path))
                        .with_priority(Priority::Low),
                    );
                }
            }
            other => issues.push(
                ValidationIssue::structural_error(
                    codes::APPEND_UNKNOWN_SOURCE,
                    format!(
                        "Entity '{}' append block #{} source '{}' is not an entity",
                        name,
                        idx,
                        other.unwrap_or("?")
                    ),
                )
                .with_entity(name)
                .with_field(format!("{}.source", path)),
            ),
        },
    }

    if let Some(mode) = block.get("append_mode") {
        check_mode(name, &format!("{}.append_mode", path), mode, issues);
    }
}

fn check_mode(name: &str, field: &str, mode: &Value, issues: &mut Vec<ValidationIssue>) {
    if mode.as_str().is_some_and(|m| APPEND_MODES.contains(&m)) {
        return;
    }
    let shown = match mode {
        Value::String(s) => s.clone(),
        other => yaml_type_name(other).to_string(),
    };
    issues.push(
        ValidationIssue::structural_error(
            codes::APPEND_INVALID_MODE,
            format!(
                "Entity '{}' {} '{}' is invalid; expected 'all' or 'distinct'",
                name, field, shown
            ),
        )
        .with_entity(name)
        .with_field(field)
        .with_priority(Priority::Medium)
        .with_suggestion("Set append_mode to 'all'")
        .auto_fixable(true),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::issue::Severity;
    use crate::core::validation::specifications::test_support::{codes_of, run};

    #[test]
    fn test_append_block_shapes() {
        let issues = run(
            &AppendSpecification,
            r#"
entities:
  archive: {columns: [id], keys: [id]}
  orders:
    columns: [id]
    keys: [id]
    append:
      - type: fixed
        values: [[1]]
      - type: sql
        source: archive
      - {}
      - type: fixed
        values: []
      - type: sql
        data_source: db
      - source: ghost
      - source: archive
      - source: archive
        columns: {id: id}
        append_mode: union
"#,
        );
        assert_eq!(
            codes_of(&issues),
            vec![
                codes::APPEND_TYPE_AND_SOURCE,
                codes::APPEND_MISSING_TYPE_OR_SOURCE,
                codes::APPEND_MISSING_VALUES,
                codes::APPEND_MISSING_QUERY,
                codes::APPEND_UNKNOWN_SOURCE,
                codes::APPEND_NO_COLUMN_MAPPING,
                codes::APPEND_INVALID_MODE,
            ]
        );
        assert_eq!(issues[5].severity, Severity::Warning);
        assert_eq!(issues[6].field.as_deref(), Some("append[7].append_mode"));
        assert!(issues[6].auto_fixable);
    }

    #[test]
    fn test_unknown_append_type() {
        let issues = run(
            &AppendSpecification,
            r#"
entities:
  orders:
    columns: [id]
    keys: [id]
    append:
      - type: csv
        values: [[1]]
      - type: [fixed]
"#,
        );
        assert_eq!(
            codes_of(&issues),
            vec![codes::APPEND_MISSING_TYPE_OR_SOURCE; 2]
        );
        assert_eq!(issues[0].field.as_deref(), Some("append[0].type"));
        assert!(issues[0].message.contains("'csv'"));
        assert_eq!(issues[1].field.as_deref(), Some("append[1].type"));
    }

    #[test]
    fn test_entity_level_append_mode() {
        let issues = run(
            &AppendSpecification,
            "entities:\n  orders: {columns: [id], keys: [id], append_mode: distinct}\n  users: {columns: [id], keys: [id], append_mode: everything}\n",
        );
        assert_eq!(codes_of(&issues), vec![codes::APPEND_INVALID_MODE]);
        assert_eq!(issues[0].entity.as_deref(), Some("users"));
        assert_eq!(issues[0].field.as_deref(), Some("append_mode"));
    }
}
