// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_yaml::Value;

use crate::core::validation::circular_dependency::format_cycle;
use crate::core::validation::issue::{codes, Priority, ValidationIssue};
use crate::core::validation::specification::{ConfigSpecification, SpecificationContext};

/// Every `depends_on`, `source` and foreign-key target names an existing entity
pub struct EntityExistsSpecification;

impl ConfigSpecification for EntityExistsSpecification {
    fn name(&self) -> &'static str {
        "entity_exists"
    }

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
        let known = ctx.config.entity_names();
        let mut issues = Vec::new();

        for (name, entity) in ctx.entities() {
            let mut references: Vec<(String, &str)> = Vec::new();

            match entity.get("depends_on") {
                Some(Value::String(dep)) => references.push(("depends_on".to_string(), dep.as_str())),
                Some(Value::Sequence(deps)) => references.extend(
                    deps.iter()
                        .filter_map(Value::as_str)
                        .map(|dep| ("depends_on".to_string(), dep)),
                ),
                _ => {}
            }
            if let Some(source) = entity.get("source").and_then(Value::as_str) {
                references.push(("source".to_string(), source));
            }
            if let Some(Value::Sequence(fks)) = entity.get("foreign_keys") {
                for (idx, fk) in fks.iter().enumerate() {
                    if let Some(target) = fk.get("entity").and_then(Value::as_str) {
                        references.push((format!("foreign_keys[{}].entity", idx), target));
                    }
                }
            }

            for (field, target) in references {
                if known.iter().any(|k| k == target) {
                    continue;
                }
                let mut issue = ValidationIssue::structural_error(
                    codes::UNRESOLVED_REFERENCE,
                    format!(
                        "Entity '{}' references unknown entity '{}' in '{}'",
                        name, target, field
                    ),
                )
                .with_entity(name)
                .with_field(field);
                if let Some(candidate) = closest_name(target, &known) {
                    issue = issue.with_suggestion(format!("Did you mean '{}'?", candidate));
                }
                issues.push(issue);
            }
        }

        issues
    }
}

/// No entity reaches itself through its dependencies
pub struct CircularDependencySpecification;

impl ConfigSpecification for CircularDependencySpecification {
    fn name(&self) -> &'static str {
        "circular_dependency"
    }

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
        ctx.analysis
            .cycles
            .iter()
            .filter_map(|cycle| {
                let first = cycle.first()?;
                Some(
                    ValidationIssue::structural_error(
                        codes::CIRCULAR_DEPENDENCY,
                        format!("Circular dependency detected: {}", format_cycle(cycle)),
                    )
                    .with_entity(first.clone())
                    .with_priority(Priority::Critical)
                    .with_suggestion(
                        "Remove one of the depends_on, source, or foreign key references in the cycle",
                    ),
                )
            })
            .collect()
    }
}

/// Closest known name within two edits, for typo suggestions
fn closest_name<'a>(target: &str, known: &'a [String]) -> Option<&'a str> {
    known
        .iter()
        .map(|name| (edit_distance(target, name), name))
        .filter(|(distance, _)| *distance <= 2)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, name)| name.as_str())
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != *cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
