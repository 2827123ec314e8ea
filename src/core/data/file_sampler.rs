// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sampler reading pre-extracted rows from `<dir>/<entity>.json`.
//!
//! Two layouts are accepted:
//!
//! ```json
//! [{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]
//! {"columns": ["id", "name"], "rows": [[1, "a"], [2, "b"]]}
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::sample::{CellValue, Sample};
use super::sampler::DataSampler;
use crate::core::error::{ValidatorError, ValidatorResult};

#[derive(Deserialize)]
#[serde(untagged)]
enum SampleFile {
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Objects(Vec<Map<String, Value>>),
}

pub struct JsonFileSampler {
    dir: PathBuf,
}

impl JsonFileSampler {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn parse(entity: &str, content: &str, row_limit: usize) -> ValidatorResult<Sample> {
        let file: SampleFile = serde_json::from_str(content)
            .map_err(|e| ValidatorError::sampling_with_source(entity, "malformed sample file", Box::new(e)))?;

        Ok(match file {
            SampleFile::Table { columns, rows } => {
                let rows = rows
                    .into_iter()
                    .take(row_limit)
                    .map(|row| {
                        let mut cells: Vec<CellValue> = row.into_iter().map(CellValue::from).collect();
                        cells.resize(columns.len(), CellValue::Null);
                        cells
                    })
                    .collect();
                Sample::new(columns, rows)
            }
            SampleFile::Objects(rows) => {
                let mut columns: Vec<String> = Vec::new();
                for row in &rows {
                    for key in row.keys() {
                        if !columns.contains(key) {
                            columns.push(key.clone());
                        }
                    }
                }
                Sample::from_json_rows(columns, rows.into_iter().take(row_limit).collect())
            }
        })
    }
}

#[async_trait]
impl DataSampler for JsonFileSampler {
    async fn sample(&self, entity: &str, row_limit: usize) -> ValidatorResult<Sample> {
        let path = self.dir.join(format!("{}.json", entity));
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ValidatorError::sampling_with_source(
                entity,
                format!("cannot read {}", path.display()),
                Box::new(e),
            )
        })?;
        Self::parse(entity, &content, row_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_rows_collect_every_key() {
        let sample = JsonFileSampler::parse(
            "users",
            r#"[{"id": 1}, {"id": 2, "name": "b"}, {"id": 3}]"#,
            2,
        )
        .unwrap();
        assert_eq!(sample.columns, vec!["id", "name"]);
        assert_eq!(sample.row_count(), 2);
        assert_eq!(sample.rows[0][1], CellValue::Null);
    }

    #[test]
    fn test_table_layout_pads_short_rows() {
        let sample = JsonFileSampler::parse(
            "users",
            r#"{"columns": ["id", "name"], "rows": [[1, "a"], [2]]}"#,
            10,
        )
        .unwrap();
        assert_eq!(sample.rows[1], vec![CellValue::Integer(2), CellValue::Null]);
    }

    #[tokio::test]
    async fn test_missing_file_is_sampling_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("users.json"), "[]").unwrap();
        let sampler = JsonFileSampler::new(dir.path());

        assert!(sampler.sample("users", 10).await.unwrap().is_empty());
        assert!(matches!(
            sampler.sample("orders", 10).await,
            Err(ValidatorError::Sampling { .. })
        ));
    }
}
