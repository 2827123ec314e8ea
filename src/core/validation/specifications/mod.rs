// SPDX-License-Identifier: MIT OR Apache-2.0

//! The individual structural specifications.

mod append;
mod data_sources;
mod entity_references;
mod entity_shapes;
mod foreign_keys;
mod required_fields;
mod surrogate_ids;
mod transforms;

pub use append::AppendSpecification;
pub use data_sources::DataSourceExistsSpecification;
pub use entity_references::{CircularDependencySpecification, EntityExistsSpecification};
pub use entity_shapes::{FixedEntitySpecification, SqlEntitySpecification};
pub use foreign_keys::ForeignKeySpecification;
pub use required_fields::RequiredFieldsSpecification;
pub use surrogate_ids::SurrogateIdSpecification;
pub use transforms::{infer_id_vars, DropDuplicatesSpecification, UnnestSpecification};

use serde_yaml::Value;

/// YAML type name for messages
pub(crate) fn yaml_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[inline]
pub(crate) fn is_string_list(value: &Value) -> bool {
    matches!(value, Value::Sequence(items) if items.iter().all(Value::is_string))
}

/// Whether a value is absent, null, or a blank string
#[inline]
pub(crate) fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Entity type string as written, `data` when absent
pub(crate) fn declared_type(entity: &Value) -> Option<&str> {
    match entity.get("type") {
        None => Some("data"),
        Some(v) => v.as_str(),
    }
}
