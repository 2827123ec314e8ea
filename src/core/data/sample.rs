// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sampled rows: ordered column names plus typed cells, the shape returned
//! by the data-sampling collaborator.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// One typed cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Hashable join/grouping key; whole floats compare equal to integers
    pub fn key(&self) -> CellKey {
        match self {
            CellValue::Null => CellKey::Null,
            CellValue::Bool(b) => CellKey::Bool(*b),
            CellValue::Integer(i) => CellKey::Integer(*i),
            CellValue::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                CellKey::Integer(*f as i64)
            }
            CellValue::Float(f) => CellKey::Float(f.to_bits()),
            CellValue::Text(s) => CellKey::Text(s.clone()),
            CellValue::Date(d) => CellKey::Date(*d),
            CellValue::DateTime(dt) => CellKey::DateTime(*dt),
        }
    }

    pub fn inferred_type(&self) -> InferredType {
        match self {
            CellValue::Null => InferredType::Unknown,
            CellValue::Bool(_) => InferredType::Boolean,
            CellValue::Integer(_) | CellValue::Float(_) => InferredType::Numeric,
            CellValue::Text(_) => InferredType::Text,
            CellValue::Date(_) | CellValue::DateTime(_) => InferredType::Temporal,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "null"),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Date(d) => write!(f, "{}", d),
            CellValue::DateTime(dt) => write!(f, "{}", dt),
        }
    }
}

impl From<serde_json::Value> for CellValue {
    /// Strings that parse as ISO dates or timestamps become temporal cells
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Integer(i),
                None => n.as_f64().map(CellValue::Float).unwrap_or(CellValue::Null),
            },
            Value::String(s) => parse_temporal(&s).unwrap_or(CellValue::Text(s)),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

fn parse_temporal(s: &str) -> Option<CellValue> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(CellValue::Date(date));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(CellValue::DateTime(dt.naive_utc()));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(CellValue::DateTime)
}

/// Hashable identity of a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKey {
    Null,
    Bool(bool),
    Integer(i64),
    Float(u64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Coarse column type used for join compatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredType {
    Numeric,
    Text,
    Temporal,
    Boolean,
    /// Several non-null kinds in one column
    Mixed,
    /// Only nulls, or no rows
    Unknown,
}

impl InferredType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InferredType::Numeric => "numeric",
            InferredType::Text => "text",
            InferredType::Temporal => "datetime",
            InferredType::Boolean => "boolean",
            InferredType::Mixed => "mixed",
            InferredType::Unknown => "unknown",
        }
    }

    /// Whether values of the two types can ever compare equal in a join
    ///
    /// Unknown and mixed columns are given the benefit of the doubt.
    pub fn join_compatible(self, other: InferredType) -> bool {
        use InferredType::*;
        match (self, other) {
            (Unknown, _) | (_, Unknown) | (Mixed, _) | (_, Mixed) => true,
            (a, b) => a == b,
        }
    }
}

/// Rows sampled from one entity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sample {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Sample {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    /// Build from JSON objects keyed by column name
    ///
    /// Column order follows `columns`; missing keys become nulls.
    pub fn from_json_rows(columns: Vec<String>, rows: Vec<serde_json::Map<String, serde_json::Value>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                columns
                    .iter()
                    .map(|c| row.remove(c).map(CellValue::from).unwrap_or(CellValue::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    #[inline]
    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// The first `limit` rows
    pub fn head(&self, limit: usize) -> Sample {
        Sample {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }

    /// Key tuples for `columns`, one per row; `None` if a column is missing
    pub fn key_tuples(&self, columns: &[String]) -> Option<Vec<Vec<CellKey>>> {
        let indices: Vec<usize> = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Option<_>>()?;
        Some(
            self.rows
                .iter()
                .map(|row| {
                    indices
                        .iter()
                        .map(|&i| row.get(i).map(CellValue::key).unwrap_or(CellKey::Null))
                        .collect()
                })
                .collect(),
        )
    }

    /// Group rows by key tuple and return tuples seen more than once with
    /// their counts, in first-seen order
    ///
    /// Tuples with a null in any key column never collide, matching how
    /// foreign-key joins treat null keys.
    pub fn duplicate_keys(&self, columns: &[String]) -> Option<Vec<(Vec<CellValue>, usize)>> {
        let indices: Vec<usize> = columns
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Option<_>>()?;

        let mut counts: HashMap<Vec<CellKey>, (usize, usize)> = HashMap::new();
        for (row_idx, row) in self.rows.iter().enumerate() {
            let key: Vec<CellKey> = indices
                .iter()
                .map(|&i| row.get(i).map(CellValue::key).unwrap_or(CellKey::Null))
                .collect();
            if key.contains(&CellKey::Null) {
                continue;
            }
            counts.entry(key).or_insert((row_idx, 0)).1 += 1;
        }

        let mut duplicates: Vec<(usize, usize)> = counts
            .into_values()
            .filter(|(_, count)| *count > 1)
            .collect();
        duplicates.sort_unstable();

        Some(
            duplicates
                .into_iter()
                .map(|(row_idx, count)| {
                    let values = indices
                        .iter()
                        .map(|&i| self.rows[row_idx].get(i).cloned().unwrap_or(CellValue::Null))
                        .collect();
                    (values, count)
                })
                .collect(),
        )
    }

    /// Type of a column inferred from its non-null cells
    pub fn infer_column_type(&self, column: &str) -> Option<InferredType> {
        let idx = self.column_index(column)?;
        let mut inferred = InferredType::Unknown;
        for cell in self.rows.iter().filter_map(|row| row.get(idx)) {
            let t = cell.inferred_type();
            inferred = match (inferred, t) {
                (current, InferredType::Unknown) => current,
                (InferredType::Unknown, t) => t,
                (current, t) if current == t => current,
                _ => return Some(InferredType::Mixed),
            };
        }
        Some(inferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Sample {
        Sample::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![CellValue::Integer(1), "a".into()],
                vec![CellValue::Integer(2), "b".into()],
                vec![CellValue::Integer(1), "c".into()],
                vec![CellValue::Float(2.0), "d".into()],
                vec![CellValue::Integer(3), "e".into()],
            ],
        )
    }

    #[test]
    fn test_cell_from_json() {
        assert_eq!(CellValue::from(json!(5)), CellValue::Integer(5));
        assert_eq!(CellValue::from(json!(1.5)), CellValue::Float(1.5));
        assert_eq!(CellValue::from(json!("x")), CellValue::Text("x".into()));
        assert_eq!(
            CellValue::from(json!("2024-02-29")),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert!(matches!(
            CellValue::from(json!("2024-02-29T10:00:00Z")),
            CellValue::DateTime(_)
        ));
        assert!(CellValue::from(json!(null)).is_null());
    }

    #[test]
    fn test_whole_float_keys_match_integers() {
        assert_eq!(CellValue::Float(2.0).key(), CellValue::Integer(2).key());
        assert_ne!(CellValue::Float(2.5).key(), CellValue::Integer(2).key());
        assert_ne!(CellValue::Text("2".into()).key(), CellValue::Integer(2).key());
    }

    #[test]
    fn test_duplicate_keys_in_first_seen_order() {
        let dups = sample().duplicate_keys(&["id".to_string()]).unwrap();
        assert_eq!(
            dups,
            vec![
                (vec![CellValue::Integer(1)], 2),
                (vec![CellValue::Integer(2)], 2),
            ]
        );
        assert!(sample().duplicate_keys(&["ghost".to_string()]).is_none());
    }

    #[test]
    fn test_null_key_tuples_are_not_duplicates() {
        let s = Sample::new(
            vec!["region".into(), "day".into()],
            vec![
                vec![CellValue::Null, CellValue::Null],
                vec![CellValue::Null, CellValue::Null],
                vec!["eu".into(), CellValue::Null],
                vec!["eu".into(), CellValue::Null],
                vec!["eu".into(), CellValue::Integer(1)],
                vec!["eu".into(), CellValue::Integer(1)],
            ],
        );
        let keys = vec!["region".to_string(), "day".to_string()];
        assert_eq!(
            s.duplicate_keys(&keys).unwrap(),
            vec![(vec![CellValue::Text("eu".into()), CellValue::Integer(1)], 2)]
        );
    }

    #[test]
    fn test_infer_column_type() {
        let s = Sample::new(
            vec!["n".into(), "t".into(), "m".into(), "e".into()],
            vec![
                vec![CellValue::Integer(1), "x".into(), CellValue::Integer(1), CellValue::Null],
                vec![CellValue::Float(2.5), CellValue::Null, "y".into(), CellValue::Null],
            ],
        );
        assert_eq!(s.infer_column_type("n"), Some(InferredType::Numeric));
        assert_eq!(s.infer_column_type("t"), Some(InferredType::Text));
        assert_eq!(s.infer_column_type("m"), Some(InferredType::Mixed));
        assert_eq!(s.infer_column_type("e"), Some(InferredType::Unknown));
        assert_eq!(s.infer_column_type("ghost"), None);
    }

    #[test]
    fn test_join_compatibility() {
        assert!(InferredType::Numeric.join_compatible(InferredType::Numeric));
        assert!(!InferredType::Numeric.join_compatible(InferredType::Text));
        assert!(!InferredType::Temporal.join_compatible(InferredType::Text));
        assert!(InferredType::Unknown.join_compatible(InferredType::Text));
    }

    #[test]
    fn test_from_json_rows_and_head() {
        let mut row = serde_json::Map::new();
        row.insert("id".into(), json!(7));
        let s = Sample::from_json_rows(vec!["id".into(), "name".into()], vec![row.clone(), row]);
        assert_eq!(s.rows[0], vec![CellValue::Integer(7), CellValue::Null]);
        assert_eq!(s.head(1).row_count(), 1);
        assert_eq!(s.head(10).row_count(), 2);
    }
}
