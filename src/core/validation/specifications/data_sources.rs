// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_yaml::Value;

use crate::core::validation::issue::{codes, ValidationIssue};
use crate::core::validation::specification::{ConfigSpecification, SpecificationContext};

/// Every `data_source` named by an entity or append block is registered
pub struct DataSourceExistsSpecification;

impl ConfigSpecification for DataSourceExistsSpecification {
    fn name(&self) -> &'static str {
        "data_source_exists"
    }

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (name, entity) in ctx.entities() {
            let mut named: Vec<(String, &str)> = Vec::new();
            if let Some(ds) = entity.get("data_source").and_then(Value::as_str) {
                named.push(("data_source".to_string(), ds));
            }
            if let Some(Value::Sequence(blocks)) = entity.get("append") {
                for (idx, block) in blocks.iter().enumerate() {
                    if let Some(ds) = block.get("data_source").and_then(Value::as_str) {
                        named.push((format!("append[{}].data_source", idx), ds));
                    }
                }
            }

            for (field, data_source) in named {
                if !ctx.registry.exists(data_source) {
                    issues.push(
                        ValidationIssue::structural_error(
                            codes::UNKNOWN_DATA_SOURCE,
                            format!(
                                "Entity '{}' uses data source '{}' which is not registered",
                                name, data_source
                            ),
                        )
                        .with_entity(name)
                        .with_field(field)
                        .with_suggestion(format!(
                            "Register '{}' under options.data_sources or use an existing data source",
                            data_source
                        )),
                    );
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::specifications::test_support::{codes_of, run};

    #[test]
    fn test_unknown_data_sources() {
        let issues = run(
            &DataSourceExistsSpecification,
            r#"
options:
  data_sources:
    warehouse: {driver: postgres}
entities:
  users:
    type: sql
    data_source: warehouse
    query: select 1
  orders:
    type: sql
    data_source: lake
    query: select 1
    append:
      - type: sql
        data_source: archive
        query: select 2
"#,
        );
        assert_eq!(codes_of(&issues), vec![codes::UNKNOWN_DATA_SOURCE; 2]);
        assert_eq!(issues[0].field.as_deref(), Some("data_source"));
        assert_eq!(issues[1].field.as_deref(), Some("append[0].data_source"));
    }
}
