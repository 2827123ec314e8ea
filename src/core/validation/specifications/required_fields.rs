// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_yaml::Value;

use super::{is_string_list, yaml_type_name};
use crate::core::config::EntityType;
use crate::core::validation::issue::{codes, Priority, ValidationIssue};
use crate::core::validation::specification::{ConfigSpecification, SpecificationContext};

/// The `entities` section exists and each entity carries the fields its type
/// requires
///
/// - `data` (default): `columns` and `keys`
/// - `fixed`: `surrogate_id` and `columns`; `values` is checked by the
///   fixed-entity specification
/// - `sql`: nothing here; `data_source` and `query` are checked by the
///   sql-entity specification
///
/// `columns`, `keys` and `depends_on` must be string lists wherever present.
pub struct RequiredFieldsSpecification;

const STRING_LIST_FIELDS: &[&str] = &["columns", "keys", "depends_on"];
const DATA_REQUIRED: &[&str] = &["columns", "keys"];
const FIXED_REQUIRED: &[&str] = &["surrogate_id", "columns"];
const NONE_REQUIRED: &[&str] = &[];

impl ConfigSpecification for RequiredFieldsSpecification {
    fn name(&self) -> &'static str {
        "required_fields"
    }

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let entities = match ctx.config.entities_section() {
            None => {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::MISSING_ENTITIES_SECTION,
                        "Configuration has no 'entities' section",
                    )
                    .with_priority(Priority::Critical)
                    .with_suggestion("Add an 'entities:' mapping with at least one entity"),
                );
                return issues;
            }
            Some(Value::Mapping(entities)) => entities,
            Some(other) => {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::INVALID_FIELD_TYPE,
                        format!(
                            "'entities' must be a mapping of entity names, found {}",
                            yaml_type_name(other)
                        ),
                    )
                    .with_field("entities")
                    .with_priority(Priority::Critical),
                );
                return issues;
            }
        };

        for (key, entity) in entities {
            let Some(name) = key.as_str() else {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::INVALID_FIELD_TYPE,
                        format!("Entity names must be strings, found {}", yaml_type_name(key)),
                    )
                    .with_field("entities"),
                );
                continue;
            };
            check_entity(name, entity, &mut issues);
        }

        issues
    }
}

fn check_entity(name: &str, entity: &Value, issues: &mut Vec<ValidationIssue>) {
    if !entity.is_mapping() {
        issues.push(
            ValidationIssue::structural_error(
                codes::INVALID_FIELD_TYPE,
                format!(
                    "Entity '{}' must be a mapping, found {}",
                    name,
                    yaml_type_name(entity)
                ),
            )
            .with_entity(name),
        );
        return;
    }

    let required: &[&str] = match entity.get("type") {
        None => DATA_REQUIRED,
        Some(Value::String(t)) => match EntityType::parse(t) {
            Some(EntityType::Data) => DATA_REQUIRED,
            Some(EntityType::Fixed) => FIXED_REQUIRED,
            Some(EntityType::Sql) => NONE_REQUIRED,
            None => {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::INVALID_FIELD_TYPE,
                        format!(
                            "Entity '{}' has unknown type '{}'; expected one of sql, fixed, data",
                            name, t
                        ),
                    )
                    .with_entity(name)
                    .with_field("type"),
                );
                NONE_REQUIRED
            }
        },
        Some(other) => {
            issues.push(
                ValidationIssue::structural_error(
                    codes::INVALID_FIELD_TYPE,
                    format!(
                        "Entity '{}' field 'type' must be a string, found {}",
                        name,
                        yaml_type_name(other)
                    ),
                )
                .with_entity(name)
                .with_field("type"),
            );
            NONE_REQUIRED
        }
    };

    for field in required {
        if entity.get(*field).is_none() {
            issues.push(
                ValidationIssue::structural_error(
                    codes::MISSING_REQUIRED_FIELD,
                    format!("Entity '{}' is missing required field '{}'", name, field),
                )
                .with_entity(name)
                .with_field(*field),
            );
        }
    }

    for field in STRING_LIST_FIELDS {
        if let Some(value) = entity.get(*field) {
            if !is_string_list(value) {
                issues.push(
                    ValidationIssue::structural_error(
                        codes::INVALID_FIELD_TYPE,
                        format!(
                            "Entity '{}' field '{}' must be a list of strings, found {}",
                            name,
                            field,
                            yaml_type_name(value)
                        ),
                    )
                    .with_entity(name)
                    .with_field(*field),
                );
            }
        }
    }

    if let Some(value) = entity.get("surrogate_id") {
        if !value.is_string() {
            issues.push(
                ValidationIssue::structural_error(
                    codes::INVALID_FIELD_TYPE,
                    format!(
                        "Entity '{}' field 'surrogate_id' must be a string, found {}",
                        name,
                        yaml_type_name(value)
                    ),
                )
                .with_entity(name)
                .with_field("surrogate_id"),
            );
        }
    }
}
