// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persisted configuration document: an `entities` mapping plus the
//! global `options.data_sources` registry.

use std::collections::HashSet;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::entity::{string_list, EntityConfig, VALUE_REFERENCE_PREFIX};
use crate::core::error::{ValidatorError, ValidatorResult};

/// Data-source registry lookup
pub trait DataSourceRegistry: Send + Sync {
    fn exists(&self, data_source_name: &str) -> bool;
}

impl DataSourceRegistry for HashSet<String> {
    fn exists(&self, data_source_name: &str) -> bool {
        self.contains(data_source_name)
    }
}

/// A parsed configuration document
///
/// The raw YAML is kept as-is so structural checks can inspect field shapes
/// and the auto-fix engine can edit the document without losing unknown keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    document: Value,
}

impl ProjectConfig {
    /// Wrap a YAML value; the top level must be a mapping
    pub fn from_value(document: Value) -> ValidatorResult<Self> {
        match document {
            Value::Mapping(_) => Ok(Self { document }),
            Value::Null => Ok(Self {
                document: Value::Mapping(Mapping::new()),
            }),
            _ => Err(ValidatorError::parse(
                "YAML",
                "configuration document must be a mapping at the top level",
            )),
        }
    }

    pub fn from_yaml_str(content: &str) -> ValidatorResult<Self> {
        let document: Value = serde_yaml::from_str(content)?;
        Self::from_value(document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ValidatorResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_string(&self) -> ValidatorResult<String> {
        Ok(serde_yaml::to_string(&self.document)?)
    }

    #[inline]
    pub fn document(&self) -> &Value {
        &self.document
    }

    #[inline]
    pub(crate) fn document_mut(&mut self) -> &mut Value {
        &mut self.document
    }

    /// The raw `entities` value, whatever its shape
    #[inline]
    pub fn entities_section(&self) -> Option<&Value> {
        self.document.get("entities")
    }

    /// The `entities` mapping, if present and well-formed
    pub fn entities(&self) -> Option<&Mapping> {
        self.entities_section().and_then(Value::as_mapping)
    }

    /// Entity names in document order
    pub fn entity_names(&self) -> Vec<String> {
        self.entities()
            .map(|entities| {
                entities
                    .keys()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[inline]
    pub fn has_entity(&self, name: &str) -> bool {
        self.entity_value(name).is_some()
    }

    pub fn entity_value(&self, name: &str) -> Option<&Value> {
        self.entities().and_then(|entities| entities.get(name))
    }

    pub fn entity(&self, name: &str) -> Option<EntityConfig> {
        self.entity_value(name)
            .map(|value| EntityConfig::from_value(name, value))
    }

    /// Typed views of every entity, in document order
    pub fn entity_configs(&self) -> Vec<EntityConfig> {
        self.entities()
            .map(|entities| {
                entities
                    .iter()
                    .filter_map(|(k, v)| k.as_str().map(|name| EntityConfig::from_value(name, v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The `options.data_sources` registry
    pub fn data_sources(&self) -> Option<&Mapping> {
        self.document
            .get("options")
            .and_then(|options| options.get("data_sources"))
            .and_then(Value::as_mapping)
    }

    /// Resolve a `@value: entities.<name>.<field>` reference to its strings
    ///
    /// Returns `None` when the path does not exist or does not hold strings.
    pub fn resolve_value_reference(&self, reference: &str) -> Option<Vec<String>> {
        let path = reference
            .trim()
            .strip_prefix(VALUE_REFERENCE_PREFIX)?
            .trim();
        if path.is_empty() {
            return None;
        }

        let mut current = &self.document;
        for segment in path.split('.') {
            current = match current {
                Value::Sequence(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => current.get(segment)?,
            };
        }

        match current {
            Value::String(_) | Value::Sequence(_) => {
                let resolved = string_list(Some(current));
                (!resolved.is_empty()).then_some(resolved)
            }
            _ => None,
        }
    }
}

impl DataSourceRegistry for ProjectConfig {
    fn exists(&self, data_source_name: &str) -> bool {
        self.data_sources()
            .is_some_and(|sources| sources.contains_key(data_source_name))
    }
}
