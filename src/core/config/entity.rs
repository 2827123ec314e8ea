// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed, lenient views over entity blocks of the configuration document.
//!
//! Views never fail: malformed fields degrade to empty/`None` so the graph
//! builder and data validators can run over broken configurations. Shape
//! problems are reported by the structural specifications, which inspect the
//! raw YAML directly.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Prefix marking a cross-entity value reference inside a list of columns
pub const VALUE_REFERENCE_PREFIX: &str = "@value:";

/// Entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Rows come from a query against a declared data source
    Sql,
    /// Rows are declared inline in `values`
    Fixed,
    /// Rows are derived from another entity (`source`) or the pipeline input
    Data,
}

impl EntityType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sql" => Some(EntityType::Sql),
            "fixed" => Some(EntityType::Fixed),
            "data" => Some(EntityType::Data),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityType::Sql => "sql",
            EntityType::Fixed => "fixed",
            EntityType::Data => "data",
        }
    }
}

/// Declared join between two entities
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    /// Target entity
    pub entity: Option<String>,
    pub local_keys: Vec<String>,
    pub remote_keys: Vec<String>,
    /// Join type (`inner`, `left`, `cross`, ...)
    pub how: Option<String>,
    pub extra_columns: Option<Value>,
}

impl ForeignKey {
    pub fn from_value(value: &Value) -> Self {
        Self {
            entity: str_field(value, "entity"),
            local_keys: string_list(value.get("local_keys")),
            remote_keys: string_list(value.get("remote_keys")),
            how: str_field(value, "how"),
            extra_columns: value.get("extra_columns").cloned(),
        }
    }

    #[inline]
    pub fn is_cross(&self) -> bool {
        self.how.as_deref() == Some("cross")
    }
}

/// Wide-to-long reshaping directive
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnnestSpec {
    pub id_vars: Vec<String>,
    pub value_vars: Vec<String>,
    pub var_name: Option<String>,
    pub value_name: Option<String>,
}

impl UnnestSpec {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id_vars: string_list(value.get("id_vars")),
            value_vars: string_list(value.get("value_vars")),
            var_name: str_field(value, "var_name"),
            value_name: str_field(value, "value_name"),
        }
    }
}

/// Deduplication directive
#[derive(Debug, Clone, PartialEq)]
pub enum DropDuplicates {
    /// `true` dedups on all columns, `false` disables
    All(bool),
    /// Dedup on these columns
    Columns(Vec<String>),
}

impl DropDuplicates {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(DropDuplicates::All(*b)),
            Value::String(s) => Some(DropDuplicates::Columns(vec![s.clone()])),
            Value::Sequence(_) => Some(DropDuplicates::Columns(string_list(Some(value)))),
            _ => None,
        }
    }

    /// Whether deduplication on `keys` makes duplicate keys impossible
    pub fn covers_keys(&self, keys: &[String]) -> bool {
        match self {
            DropDuplicates::All(enabled) => *enabled,
            DropDuplicates::Columns(columns) => {
                !columns.is_empty() && columns.iter().all(|c| keys.contains(c))
            }
        }
    }
}

/// Extra rows appended to an entity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppendBlock {
    pub block_type: Option<String>,
    pub source: Option<String>,
    pub data_source: Option<String>,
    pub query: Option<String>,
    pub append_mode: Option<String>,
    pub columns: Vec<String>,
}

impl AppendBlock {
    pub fn from_value(value: &Value) -> Self {
        Self {
            block_type: str_field(value, "type"),
            source: str_field(value, "source"),
            data_source: str_field(value, "data_source"),
            query: str_field(value, "query"),
            append_mode: str_field(value, "append_mode"),
            columns: string_list(value.get("columns")),
        }
    }
}

/// One declarative entity, read leniently from its YAML block
#[derive(Debug, Clone, PartialEq)]
pub struct EntityConfig {
    pub name: String,
    /// `None` when `type` is present but unknown
    pub entity_type: Option<EntityType>,
    pub columns: Vec<String>,
    pub keys: Vec<String>,
    pub depends_on: Vec<String>,
    pub source: Option<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub data_source: Option<String>,
    pub query: Option<String>,
    pub surrogate_id: Option<String>,
    pub values: Option<Value>,
    pub unnest: Option<UnnestSpec>,
    pub drop_duplicates: Option<DropDuplicates>,
    pub append: Vec<AppendBlock>,
}

impl EntityConfig {
    pub fn from_value(name: &str, value: &Value) -> Self {
        let entity_type = match value.get("type") {
            None => Some(EntityType::Data),
            Some(Value::String(s)) => EntityType::parse(s),
            Some(_) => None,
        };

        Self {
            name: name.to_string(),
            entity_type,
            columns: string_list(value.get("columns")),
            keys: string_list(value.get("keys")),
            depends_on: string_list(value.get("depends_on")),
            source: str_field(value, "source"),
            foreign_keys: sequence(value.get("foreign_keys"))
                .iter()
                .map(ForeignKey::from_value)
                .collect(),
            data_source: str_field(value, "data_source"),
            query: str_field(value, "query"),
            surrogate_id: str_field(value, "surrogate_id"),
            values: value.get("values").cloned(),
            unnest: value
                .get("unnest")
                .filter(|v| v.is_mapping())
                .map(UnnestSpec::from_value),
            drop_duplicates: value.get("drop_duplicates").and_then(DropDuplicates::from_value),
            append: sequence(value.get("append"))
                .iter()
                .map(AppendBlock::from_value)
                .collect(),
        }
    }

    /// Names this entity depends on, in declaration order, without duplicates
    ///
    /// Collected from `depends_on`, `source`, and foreign-key targets.
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        let candidates = self
            .depends_on
            .iter()
            .chain(self.source.iter())
            .chain(self.foreign_keys.iter().filter_map(|fk| fk.entity.as_ref()));

        for dep in candidates {
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
        deps
    }

    /// Whether `column` is used by anything other than the `columns` list
    pub fn references_column_elsewhere(&self, column: &str) -> bool {
        let col = column.to_string();
        self.keys.contains(&col)
            || self.surrogate_id.as_deref() == Some(column)
            || self.foreign_keys.iter().any(|fk| {
                fk.local_keys.contains(&col) || extra_columns_mention(fk.extra_columns.as_ref(), column)
            })
            || self.unnest.as_ref().is_some_and(|u| {
                u.id_vars.contains(&col) || u.value_vars.contains(&col)
            })
            || matches!(&self.drop_duplicates, Some(DropDuplicates::Columns(cols)) if cols.contains(&col))
    }
}

/// Whether a string is a `@value:` cross-entity reference
#[inline]
pub fn is_value_reference(s: &str) -> bool {
    s.trim_start().starts_with(VALUE_REFERENCE_PREFIX)
}

fn extra_columns_mention(extra: Option<&Value>, column: &str) -> bool {
    match extra {
        Some(Value::String(s)) => s == column,
        Some(Value::Sequence(items)) => items.iter().any(|v| v.as_str() == Some(column)),
        Some(Value::Mapping(map)) => map
            .iter()
            .any(|(k, v)| k.as_str() == Some(column) || v.as_str() == Some(column)),
        _ => false,
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn sequence(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Sequence(items)) => items.as_slice(),
        _ => &[],
    }
}

/// Read a field that may be a single string or a list of strings
///
/// Non-string list items are skipped.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(yaml: &str) -> EntityConfig {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        EntityConfig::from_value("orders", &value)
    }

    #[test]
    fn test_reads_typed_view() {
        let e = entity(
            r#"
            type: sql
            data_source: warehouse
            query: "select * from orders"
            columns: [order_id, user_id, amount]
            keys: [order_id]
            depends_on: [users]
            foreign_keys:
              - entity: users
                local_keys: [user_id]
                remote_keys: [id]
            drop_duplicates: [order_id]
            "#,
        );

        assert_eq!(e.entity_type, Some(EntityType::Sql));
        assert_eq!(e.columns, vec!["order_id", "user_id", "amount"]);
        assert_eq!(e.keys, vec!["order_id"]);
        assert_eq!(e.foreign_keys.len(), 1);
        assert_eq!(e.foreign_keys[0].entity.as_deref(), Some("users"));
        assert_eq!(
            e.drop_duplicates,
            Some(DropDuplicates::Columns(vec!["order_id".to_string()]))
        );
    }

    #[test]
    fn test_missing_type_defaults_to_data_and_unknown_type_is_none() {
        assert_eq!(entity("columns: [a]").entity_type, Some(EntityType::Data));
        assert_eq!(entity("type: table").entity_type, None);
        assert_eq!(entity("type: 3").entity_type, None);
    }

    #[test]
    fn test_dependencies_are_deduplicated_in_order() {
        let e = entity(
            r#"
            source: staging
            depends_on: [users, staging]
            foreign_keys:
              - entity: users
                local_keys: [user_id]
                remote_keys: [id]
              - entity: regions
                how: cross
            append:
              - source: legacy_orders
            "#,
        );
        assert_eq!(e.dependencies(), vec!["users", "staging", "regions"]);
    }

    #[test]
    fn test_references_column_elsewhere() {
        let e = entity(
            r#"
            columns: [order_id, user_id, note, unused]
            keys: [order_id]
            foreign_keys:
              - entity: users
                local_keys: [user_id]
                remote_keys: [id]
                extra_columns: {note: user_note}
            "#,
        );
        assert!(e.references_column_elsewhere("order_id"));
        assert!(e.references_column_elsewhere("user_id"));
        assert!(e.references_column_elsewhere("note"));
        assert!(!e.references_column_elsewhere("unused"));
    }

    #[test]
    fn test_drop_duplicates_covers_keys() {
        let keys = vec!["id".to_string()];
        assert!(DropDuplicates::All(true).covers_keys(&keys));
        assert!(!DropDuplicates::All(false).covers_keys(&keys));
        assert!(DropDuplicates::Columns(vec!["id".to_string()]).covers_keys(&keys));
        assert!(!DropDuplicates::Columns(vec!["name".to_string()]).covers_keys(&keys));
    }

    #[test]
    fn test_value_reference_detection() {
        assert!(is_value_reference("@value: entities.users.keys"));
        assert!(!is_value_reference("user_id"));
    }
}
