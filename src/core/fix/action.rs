// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fix actions and the document edits they perform.
//!
//! Actions address an entity and, where needed, a field path relative to the
//! entity such as `source`, `unnest.id_vars` or `append[0].append_mode`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::core::config::ProjectConfig;
use crate::core::error::{ValidatorError, ValidatorResult};
use crate::core::validation::issue::ValidationIssue;

/// One field path segment: `name` or `name[3]`
static SEGMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(?:\[(\d+)\])?$").expect("Invalid field path regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixActionType {
    AddColumn,
    RemoveColumn,
    UpdateReference,
    AddConstraint,
    RemoveConstraint,
    UpdateQuery,
    AddEntity,
    RemoveEntity,
}

impl FixActionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FixActionType::AddColumn => "add_column",
            FixActionType::RemoveColumn => "remove_column",
            FixActionType::UpdateReference => "update_reference",
            FixActionType::AddConstraint => "add_constraint",
            FixActionType::RemoveConstraint => "remove_constraint",
            FixActionType::UpdateQuery => "update_query",
            FixActionType::AddEntity => "add_entity",
            FixActionType::RemoveEntity => "remove_entity",
        }
    }
}

/// A single edit to the configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixAction {
    #[serde(rename = "type")]
    pub action_type: FixActionType,
    pub entity: String,
    /// Column name for column actions, field path otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FixAction {
    fn new(
        action_type: FixActionType,
        entity: &str,
        field: Option<&str>,
        value: Option<Value>,
        description: String,
    ) -> Self {
        Self {
            action_type,
            entity: entity.to_string(),
            field: field.map(str::to_string),
            description,
            value,
        }
    }

    pub fn add_column(entity: &str, column: &str) -> Self {
        Self::new(
            FixActionType::AddColumn,
            entity,
            Some(column),
            None,
            format!("Add column '{}' to entity '{}'", column, entity),
        )
    }

    pub fn remove_column(entity: &str, column: &str) -> Self {
        Self::new(
            FixActionType::RemoveColumn,
            entity,
            Some(column),
            None,
            format!("Remove column '{}' from entity '{}'", column, entity),
        )
    }

    pub fn update_reference(entity: &str, field: &str, value: Value) -> Self {
        let description = format!("Set {}.{} to {}", entity, field, describe(&value));
        Self::new(FixActionType::UpdateReference, entity, Some(field), Some(value), description)
    }

    pub fn add_constraint(entity: &str, field: &str, value: Value) -> Self {
        let description = format!("Add {}.{} = {}", entity, field, describe(&value));
        Self::new(FixActionType::AddConstraint, entity, Some(field), Some(value), description)
    }

    pub fn remove_constraint(entity: &str, field: &str) -> Self {
        Self::new(
            FixActionType::RemoveConstraint,
            entity,
            Some(field),
            None,
            format!("Remove '{}' from entity '{}'", field, entity),
        )
    }

    pub fn update_query(entity: &str, query: &str) -> Self {
        Self::new(
            FixActionType::UpdateQuery,
            entity,
            Some("query"),
            Some(Value::String(query.to_string())),
            format!("Replace the query of entity '{}'", entity),
        )
    }

    pub fn add_entity(entity: &str, definition: Value) -> Self {
        Self::new(
            FixActionType::AddEntity,
            entity,
            None,
            Some(definition),
            format!("Add entity '{}'", entity),
        )
    }

    pub fn remove_entity(entity: &str) -> Self {
        Self::new(
            FixActionType::RemoveEntity,
            entity,
            None,
            None,
            format!("Remove entity '{}'", entity),
        )
    }

    fn fail(&self, message: impl Into<String>) -> ValidatorError {
        ValidatorError::action_failed(self.action_type.as_str(), message)
    }

    fn required_field(&self) -> ValidatorResult<&str> {
        self.field
            .as_deref()
            .ok_or_else(|| self.fail(format!("no field given for entity '{}'", self.entity)))
    }

    fn required_value(&self) -> ValidatorResult<Value> {
        self.value
            .clone()
            .ok_or_else(|| self.fail(format!("no value given for entity '{}'", self.entity)))
    }

    /// Apply the edit to a configuration document
    pub fn apply(&self, config: &mut ProjectConfig) -> ValidatorResult<()> {
        match self.action_type {
            FixActionType::AddEntity => {
                let definition = self.required_value()?;
                let entities = entities_mut(config.document_mut(), true)
                    .ok_or_else(|| self.fail("the configuration has no entities mapping"))?;
                if entities.contains_key(self.entity.as_str()) {
                    return Err(self.fail(format!("entity '{}' already exists", self.entity)));
                }
                entities.insert(Value::String(self.entity.clone()), definition);
                Ok(())
            }
            FixActionType::RemoveEntity => entities_mut(config.document_mut(), false)
                .and_then(|entities| entities.remove(self.entity.as_str()))
                .map(|_| ())
                .ok_or_else(|| self.fail(format!("entity '{}' does not exist", self.entity))),
            _ => {
                let entity = entities_mut(config.document_mut(), false)
                    .and_then(|entities| entities.get_mut(self.entity.as_str()))
                    .filter(|entity| entity.is_mapping())
                    .ok_or_else(|| self.fail(format!("entity '{}' does not exist", self.entity)))?;
                self.apply_to_entity(entity)
            }
        }
    }

    fn apply_to_entity(&self, entity: &mut Value) -> ValidatorResult<()> {
        match self.action_type {
            FixActionType::AddColumn => {
                let column = self.required_field()?;
                let columns = entity
                    .as_mapping_mut()
                    .ok_or_else(|| self.fail(format!("entity '{}' is not a mapping", self.entity)))?
                    .entry(Value::String("columns".to_string()))
                    .or_insert_with(|| Value::Sequence(Vec::new()))
                    .as_sequence_mut()
                    .ok_or_else(|| self.fail("'columns' is not a list"))?;
                if !columns.iter().any(|c| c.as_str() == Some(column)) {
                    columns.push(Value::String(column.to_string()));
                }
                Ok(())
            }
            FixActionType::RemoveColumn => {
                let column = self.required_field()?;
                let columns = entity
                    .get_mut("columns")
                    .and_then(Value::as_sequence_mut)
                    .ok_or_else(|| self.fail(format!("entity '{}' has no columns list", self.entity)))?;
                let position = columns
                    .iter()
                    .position(|c| c.as_str() == Some(column))
                    .ok_or_else(|| {
                        self.fail(format!("column '{}' is not declared on '{}'", column, self.entity))
                    })?;
                columns.remove(position);
                Ok(())
            }
            FixActionType::UpdateReference => {
                let path = parse_field_path(self.required_field()?)?;
                let value = self.required_value()?;
                let target = navigate_mut(entity, &path)
                    .ok_or_else(|| self.fail(format!("{}.{} does not exist", self.entity, display_path(&path))))?;
                *target = value;
                Ok(())
            }
            FixActionType::AddConstraint => {
                let path = parse_field_path(self.required_field()?)?;
                let value = self.required_value()?;
                let (last, parent_path) = split_last(&path)?;
                let parent = navigate_mut(entity, parent_path)
                    .ok_or_else(|| self.fail(format!("parent of {}.{} does not exist", self.entity, display_path(&path))))?;
                match (last, parent) {
                    (Segment::Key(key), Value::Mapping(mapping)) => {
                        if mapping.contains_key(key.as_str()) {
                            return Err(self.fail(format!("{}.{} is already set", self.entity, display_path(&path))));
                        }
                        mapping.insert(Value::String(key.clone()), value);
                        Ok(())
                    }
                    _ => Err(self.fail(format!("cannot add {}.{}", self.entity, display_path(&path)))),
                }
            }
            FixActionType::RemoveConstraint => {
                let path = parse_field_path(self.required_field()?)?;
                let (last, parent_path) = split_last(&path)?;
                let removed = navigate_mut(entity, parent_path).and_then(|parent| match (last, parent) {
                    (Segment::Key(key), Value::Mapping(mapping)) => mapping.remove(key.as_str()),
                    (Segment::Index(index), Value::Sequence(items)) if *index < items.len() => {
                        Some(items.remove(*index))
                    }
                    _ => None,
                });
                removed
                    .map(|_| ())
                    .ok_or_else(|| self.fail(format!("{}.{} does not exist", self.entity, display_path(&path))))
            }
            FixActionType::UpdateQuery => {
                let query = self.required_value()?;
                if !query.is_string() {
                    return Err(self.fail("query must be a string"));
                }
                entity
                    .as_mapping_mut()
                    .ok_or_else(|| self.fail(format!("entity '{}' is not a mapping", self.entity)))?
                    .insert(Value::String("query".to_string()), query);
                Ok(())
            }
            FixActionType::AddEntity | FixActionType::RemoveEntity => {
                Err(self.fail("entity actions apply to the document, not to an entity"))
            }
        }
    }
}

/// The remediation proposed for one issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub issue: ValidationIssue,
    pub actions: Vec<FixAction>,
    pub auto_fixable: bool,
    /// Set when applying the actions discards configuration content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// What a person has to do when no automatic fix exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_explanation: Option<String>,
}

impl FixSuggestion {
    pub fn automatic(issue: &ValidationIssue, actions: Vec<FixAction>) -> Self {
        Self {
            issue: issue.clone(),
            auto_fixable: issue.auto_fixable && !actions.is_empty(),
            actions,
            warning: None,
            manual_explanation: None,
        }
    }

    pub fn manual(issue: &ValidationIssue, explanation: impl Into<String>) -> Self {
        Self {
            issue: issue.clone(),
            actions: Vec::new(),
            auto_fixable: false,
            warning: None,
            manual_explanation: Some(explanation.into()),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    /// Apply every action in order
    pub fn apply(&self, config: &mut ProjectConfig) -> ValidatorResult<()> {
        self.actions.iter().try_for_each(|action| action.apply(config))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

fn parse_field_path(path: &str) -> ValidatorResult<Vec<Segment>> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        let captures = SEGMENT_REGEX
            .captures(part)
            .ok_or_else(|| ValidatorError::action_failed("parse_field_path", format!("invalid field path '{}'", path)))?;
        segments.push(Segment::Key(captures[1].to_string()));
        if let Some(index) = captures.get(2) {
            let index = index.as_str().parse::<usize>().map_err(|e| {
                ValidatorError::action_failed("parse_field_path", format!("invalid index in '{}': {}", path, e))
            })?;
            segments.push(Segment::Index(index));
        }
    }
    Ok(segments)
}

fn split_last(path: &[Segment]) -> ValidatorResult<(&Segment, &[Segment])> {
    path.split_last()
        .ok_or_else(|| ValidatorError::action_failed("parse_field_path", "empty field path"))
}

fn display_path(path: &[Segment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(index) => out.push_str(&format!("[{}]", index)),
        }
    }
    out
}

fn entities_mut(document: &mut Value, create: bool) -> Option<&mut Mapping> {
    let root = document.as_mapping_mut()?;
    if create && !root.contains_key("entities") {
        root.insert(Value::String("entities".to_string()), Value::Mapping(Mapping::new()));
    }
    root.get_mut("entities").and_then(Value::as_mapping_mut)
}

/// Walk a path below an entity; an empty path yields the entity itself
fn navigate_mut<'a>(entity: &'a mut Value, path: &[Segment]) -> Option<&'a mut Value> {
    let mut current = entity;
    for segment in path {
        current = match segment {
            Segment::Key(key) => current.as_mapping_mut()?.get_mut(key.as_str())?,
            Segment::Index(index) => current.as_sequence_mut()?.get_mut(*index)?,
        };
    }
    Some(current)
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        Value::Sequence(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| format!("{:?}", item)))
                .collect();
            format!("[{}]", parts.join(", "))
        }
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
entities:
  users:
    type: sql
    data_source: warehouse
    query: select 1
    source: raw_users
    columns: [id, name, legacy]
    keys: [id]
  orders:
    columns: [order_id, region, amount]
    keys: [order_id]
    unnest:
      value_vars: [amount]
      var_name: metric
      value_name: value
    append:
      - type: fixed
        values: [[1]]
        append_mode: everything
"#;

    fn config() -> ProjectConfig {
        ProjectConfig::from_yaml_str(CONFIG).unwrap()
    }

    #[test]
    fn test_parse_field_path() {
        assert_eq!(
            parse_field_path("append[0].append_mode").unwrap(),
            vec![
                Segment::Key("append".into()),
                Segment::Index(0),
                Segment::Key("append_mode".into())
            ]
        );
        assert!(parse_field_path("append[x]").is_err());
        assert!(parse_field_path("a..b").is_err());
    }

    #[test]
    fn test_remove_column() {
        let mut config = config();
        FixAction::remove_column("users", "legacy").apply(&mut config).unwrap();
        assert_eq!(config.entity("users").unwrap().columns, vec!["id", "name"]);

        let err = FixAction::remove_column("users", "legacy").apply(&mut config).unwrap_err();
        assert!(matches!(err, ValidatorError::ActionFailed { .. }));
    }

    #[test]
    fn test_update_indexed_reference() {
        let mut config = config();
        FixAction::update_reference("orders", "append[0].append_mode", Value::String("all".into()))
            .apply(&mut config)
            .unwrap();
        assert_eq!(
            config.entity("orders").unwrap().append[0].append_mode.as_deref(),
            Some("all")
        );
        assert!(FixAction::update_reference("orders", "append[3].append_mode", Value::Null)
            .apply(&mut config)
            .is_err());
    }

    #[test]
    fn test_add_and_remove_constraint() {
        let mut config = config();
        let id_vars = Value::Sequence(vec![Value::String("order_id".into()), Value::String("region".into())]);
        FixAction::add_constraint("orders", "unnest.id_vars", id_vars.clone())
            .apply(&mut config)
            .unwrap();
        assert_eq!(
            config.entity("orders").unwrap().unnest.unwrap().id_vars,
            vec!["order_id", "region"]
        );
        assert!(FixAction::add_constraint("orders", "unnest.id_vars", id_vars)
            .apply(&mut config)
            .is_err());

        FixAction::remove_constraint("users", "source").apply(&mut config).unwrap();
        assert!(config.entity("users").unwrap().source.is_none());
        assert!(FixAction::remove_constraint("users", "source").apply(&mut config).is_err());
    }

    #[test]
    fn test_entity_actions() {
        let mut config = config();
        let definition: Value = serde_yaml::from_str("{columns: [id], keys: [id]}").unwrap();
        FixAction::add_entity("regions", definition.clone()).apply(&mut config).unwrap();
        assert!(config.has_entity("regions"));
        assert!(FixAction::add_entity("regions", definition).apply(&mut config).is_err());

        FixAction::remove_entity("regions").apply(&mut config).unwrap();
        assert!(!config.has_entity("regions"));
        assert!(FixAction::remove_entity("ghost").apply(&mut config).is_err());
    }

    #[test]
    fn test_add_column_and_update_query() {
        let mut config = config();
        FixAction::add_column("orders", "note").apply(&mut config).unwrap();
        FixAction::add_column("orders", "note").apply(&mut config).unwrap();
        assert_eq!(
            config.entity("orders").unwrap().columns,
            vec!["order_id", "region", "amount", "note"]
        );

        FixAction::update_query("users", "select id from users").apply(&mut config).unwrap();
        assert_eq!(
            config.entity("users").unwrap().query.as_deref(),
            Some("select id from users")
        );
    }

    #[test]
    fn test_action_serializes_type() {
        let action = FixAction::remove_constraint("users", "source");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "remove_constraint");
        assert_eq!(json["field"], "source");
        assert!(json.get("value").is_none());
    }
}
