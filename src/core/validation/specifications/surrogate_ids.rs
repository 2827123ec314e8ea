// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;

use serde_yaml::Value;

use crate::core::validation::issue::{codes, Priority, ValidationIssue};
use crate::core::validation::specification::{ConfigSpecification, SpecificationContext};

/// Surrogate ids are unique across entities and end in `_id`
pub struct SurrogateIdSpecification;

impl ConfigSpecification for SurrogateIdSpecification {
    fn name(&self) -> &'static str {
        "surrogate_id"
    }

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut first_owner: HashMap<&str, &str> = HashMap::new();

        for (name, entity) in ctx.entities() {
            let Some(surrogate_id) = entity.get("surrogate_id").and_then(Value::as_str) else {
                continue;
            };

            if let Some(owner) = first_owner.get(surrogate_id) {
                issues.push(
                    ValidationIssue::structural_warning(
                        codes::DUPLICATE_SURROGATE_ID,
                        format!(
                            "Entity '{}' reuses surrogate_id '{}' already declared by '{}'",
                            name, surrogate_id, owner
                        ),
                    )
                    .with_entity(name)
                    .with_field("surrogate_id"),
                );
            } else {
                first_owner.insert(surrogate_id, name);
            }

            if !surrogate_id.ends_with("_id") {
                issues.push(
                    ValidationIssue::structural_warning(
                        codes::SURROGATE_ID_NAMING,
                        format!(
                            "Entity '{}' surrogate_id '{}' should end with '_id'",
                            name, surrogate_id
                        ),
                    )
                    .with_entity(name)
                    .with_field("surrogate_id")
                    .with_priority(Priority::Low)
                    .with_suggestion(format!("Rename to '{}_id'", surrogate_id)),
                );
            }
        }

        issues
    }
}
