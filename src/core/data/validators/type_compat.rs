// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ForeignKeyDataContext, ForeignKeyDataValidator};
use crate::core::validation::issue::{codes, Priority, ValidationIssue};

/// Local and remote join columns carry comparable types
///
/// Numeric against text, or datetime against text, joins silently produce no
/// matches.
pub struct TypeCompatibilityValidator;

impl ForeignKeyDataValidator for TypeCompatibilityValidator {
    fn name(&self) -> &'static str {
        "type_compatibility"
    }

    fn validate(&self, ctx: &ForeignKeyDataContext<'_>) -> Vec<ValidationIssue> {
        let fk = ctx.foreign_key;
        if fk.is_cross() {
            return Vec::new();
        }

        fk.local_keys
            .iter()
            .zip(fk.remote_keys.iter())
            .filter_map(|(local_col, remote_col)| {
                let local_type = ctx.local.infer_column_type(local_col)?;
                let remote_type = ctx.remote.infer_column_type(remote_col)?;
                if local_type.join_compatible(remote_type) {
                    return None;
                }
                Some(
                    ValidationIssue::data_warning(
                        codes::FK_TYPE_MISMATCH,
                        format!(
                            "Foreign key {} → {}: '{}' is {} but '{}' is {}; the join will find no matches",
                            ctx.entity.name,
                            ctx.remote_name(),
                            local_col,
                            local_type.as_str(),
                            remote_col,
                            remote_type.as_str()
                        ),
                    )
                    .with_entity(&ctx.entity.name)
                    .with_field(ctx.field("local_keys"))
                    .with_priority(Priority::Medium)
                    .with_suggestion(format!(
                        "Cast '{}' or '{}' to a common type in the source query",
                        local_col, remote_col
                    )),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EntityConfig;
    use crate::core::data::sample::{CellValue, Sample};
    use crate::core::data::validators::test_support::{ints, texts};

    fn run(local: &Sample, remote: &Sample) -> Vec<ValidationIssue> {
        let value: serde_yaml::Value = serde_yaml::from_str(
            "foreign_keys:\n  - entity: users\n    local_keys: [user_id]\n    remote_keys: [id]\n",
        )
        .unwrap();
        let entity = EntityConfig::from_value("orders", &value);
        TypeCompatibilityValidator.validate(&ForeignKeyDataContext {
            entity: &entity,
            index: 0,
            foreign_key: &entity.foreign_keys[0],
            local,
            remote,
            match_threshold: 90.0,
        })
    }

    #[test]
    fn test_numeric_vs_text_mismatch() {
        let issues = run(&texts("user_id", &["a", "b"]), &ints("id", [1, 2]));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::FK_TYPE_MISMATCH);
        assert_eq!(issues[0].priority, Priority::Medium);
        assert!(issues[0].message.contains("text"));
        assert!(issues[0].message.contains("numeric"));
    }

    #[test]
    fn test_datetime_vs_text_mismatch() {
        let local = Sample::new(
            vec!["user_id".into()],
            vec![vec![CellValue::from(serde_json::json!("2024-01-01"))]],
        );
        let issues = run(&local, &texts("id", &["x"]));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_compatible_and_unknown_types() {
        assert!(run(&ints("user_id", [1]), &ints("id", [1])).is_empty());
        let nulls = Sample::new(vec!["user_id".into()], vec![vec![CellValue::Null]]);
        assert!(run(&nulls, &texts("id", &["x"])).is_empty());
    }
}
