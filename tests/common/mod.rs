// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use entity_validator::core::config::{ProjectConfig, ValidatorSettings};
use entity_validator::core::data::{CellValue, DataSampler, Sample};
use entity_validator::core::error::{ValidatorError, ValidatorResult};

pub fn project(yaml: &str) -> ProjectConfig {
    ProjectConfig::from_yaml_str(yaml).expect("test configuration should parse")
}

/// Fast-failing settings: short timeout, no cache, no retry delay
pub fn test_settings() -> ValidatorSettings {
    let mut settings = ValidatorSettings {
        sample_timeout: Duration::from_millis(200),
        cache_ttl: Duration::ZERO,
        ..ValidatorSettings::default()
    };
    settings.retry.max_attempts = 1;
    settings
}

pub fn int_column(column: &str, values: impl IntoIterator<Item = i64>) -> Sample {
    Sample::new(
        vec![column.to_string()],
        values.into_iter().map(|v| vec![CellValue::Integer(v)]).collect(),
    )
}

/// Serves fixed samples; `hung` never answers and unknown entities fail
#[derive(Default)]
pub struct FixtureSampler {
    samples: HashMap<String, Sample>,
}

impl FixtureSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entity: &str, sample: Sample) -> Self {
        self.samples.insert(entity.to_string(), sample);
        self
    }
}

#[async_trait]
impl DataSampler for FixtureSampler {
    async fn sample(&self, entity: &str, row_limit: usize) -> ValidatorResult<Sample> {
        if entity == "hung" {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.samples
            .get(entity)
            .map(|sample| sample.head(row_limit))
            .ok_or_else(|| ValidatorError::sampling(entity, "connection refused"))
    }
}
