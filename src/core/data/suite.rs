// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-Aware Validator Suite
//!
//! Samples every involved entity once, in parallel on a bounded worker pool,
//! then runs the entity and foreign-key validators over the samples.
//!
//! ```text
//! processing order ──► sample tasks (Semaphore-bounded, per-attempt timeout)
//!                          │
//!                          ▼
//!                   entity → Result<Sample>
//!                          │
//!        ┌─────────────────┴──────────────────┐
//!        ▼                                    ▼
//!  entity validators                 foreign-key validators
//!  (columns, keys, empty)            (integrity, type compatibility)
//! ```
//!
//! A failed sample degrades that entity to one `SAMPLE_UNAVAILABLE` issue.
//! Dropping the returned future aborts outstanding sample tasks.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::sample::Sample;
use super::sampler::{DataSampler, SampleFetcher, TtlSampleCache};
use super::validators::{
    ColumnExistenceValidator, EmptyResultValidator, EntityDataContext, EntityDataValidator,
    ForeignKeyDataContext, ForeignKeyDataValidator, ForeignKeyIntegrityValidator,
    NaturalKeyUniquenessValidator, TypeCompatibilityValidator,
};
use crate::core::config::{ProjectConfig, ValidatorSettings};
use crate::core::error::{ValidatorError, ValidatorResult};
use crate::core::validation::circular_dependency::analyze;
use crate::core::validation::dependency_graph::DependencyGraph;
use crate::core::validation::issue::{codes, Priority, ValidationIssue, ValidationResult};

type SampleOutcome = ValidatorResult<Arc<Sample>>;

/// Which row cap a foreign-key validator reads its samples under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowBudget {
    Join,
    TypeInference,
}

pub struct DataValidationSuite {
    fetcher: SampleFetcher,
    sample_limit: usize,
    fk_sample_limit: usize,
    type_sample_limit: usize,
    max_sample_rows: usize,
    match_threshold: f64,
    max_concurrency: usize,
    entity_validators: Vec<Box<dyn EntityDataValidator>>,
    foreign_key_validators: Vec<(RowBudget, Box<dyn ForeignKeyDataValidator>)>,
}

impl DataValidationSuite {
    /// Suite over `sampler` configured from settings; caches samples when
    /// `cache_ttl` is non-zero
    pub fn new(sampler: Arc<dyn DataSampler>, settings: &ValidatorSettings) -> Self {
        let mut fetcher =
            SampleFetcher::new(sampler, settings.sample_timeout).with_retry(settings.retry.clone());
        if !settings.cache_ttl.is_zero() {
            fetcher = fetcher.with_cache(Arc::new(TtlSampleCache::new(settings.cache_ttl)));
        }
        Self::with_fetcher(fetcher, settings)
    }

    pub fn with_fetcher(fetcher: SampleFetcher, settings: &ValidatorSettings) -> Self {
        Self {
            fetcher,
            sample_limit: settings.sample_limit,
            fk_sample_limit: settings.fk_sample_limit,
            type_sample_limit: settings.type_sample_limit,
            max_sample_rows: settings.max_sample_rows(),
            match_threshold: settings.match_threshold,
            max_concurrency: settings.max_concurrency.max(1),
            entity_validators: vec![
                Box::new(ColumnExistenceValidator),
                Box::new(NaturalKeyUniquenessValidator),
                Box::new(EmptyResultValidator),
            ],
            foreign_key_validators: vec![
                (
                    RowBudget::Join,
                    Box::new(ForeignKeyIntegrityValidator) as Box<dyn ForeignKeyDataValidator>,
                ),
                (RowBudget::TypeInference, Box::new(TypeCompatibilityValidator)),
            ],
        }
    }

    /// Validate every entity of the configuration
    pub async fn validate(&self, config: &ProjectConfig) -> ValidationResult {
        self.validate_entities(config, &config.entity_names()).await
    }

    /// Validate the named entities; foreign-key targets are sampled as needed
    pub async fn validate_entities(&self, config: &ProjectConfig, targets: &[String]) -> ValidationResult {
        let graph = DependencyGraph::from_config(config);
        let order = analyze(&graph).processing_order(&graph);
        let requested: HashSet<&str> = targets.iter().map(String::as_str).collect();

        let entities: Vec<_> = order
            .iter()
            .filter(|name| requested.contains(name.as_str()))
            .filter_map(|name| config.entity(name))
            .collect();

        let mut to_sample: Vec<String> = entities.iter().map(|e| e.name.clone()).collect();
        for entity in &entities {
            for target in entity.foreign_keys.iter().filter_map(|fk| fk.entity.as_ref()) {
                if config.has_entity(target) && !to_sample.contains(target) {
                    to_sample.push(target.clone());
                }
            }
        }

        let samples = self.sample_all(to_sample).await;
        let mut result = ValidationResult::new();
        let mut reported_unavailable: HashSet<String> = HashSet::new();

        for entity in &entities {
            let sample = match samples.get(&entity.name) {
                Some(Ok(sample)) => Arc::clone(sample),
                Some(Err(e)) => {
                    result.push(unavailable(&entity.name, None, e));
                    reported_unavailable.insert(entity.name.clone());
                    continue;
                }
                None => continue,
            };

            let head = sample.head(self.sample_limit);
            let ctx = EntityDataContext {
                config,
                entity,
                sample: &head,
            };
            for validator in &self.entity_validators {
                result.extend(validator.validate(&ctx));
            }

            for (index, fk) in entity.foreign_keys.iter().enumerate() {
                let Some(remote_name) = fk.entity.as_deref() else {
                    continue;
                };
                let remote = match samples.get(remote_name) {
                    Some(Ok(remote)) => remote,
                    Some(Err(e)) => {
                        if !requested.contains(remote_name) && reported_unavailable.insert(remote_name.to_string()) {
                            result.push(unavailable(
                                &entity.name,
                                Some(format!("foreign_keys[{}]", index)),
                                e,
                            ));
                        }
                        continue;
                    }
                    None => continue,
                };

                let local_fk = sample.head(self.fk_sample_limit);
                let remote_fk = remote.head(self.fk_sample_limit);
                let local_type = sample.head(self.type_sample_limit);
                let remote_type = remote.head(self.type_sample_limit);

                for (budget, validator) in &self.foreign_key_validators {
                    let (local, remote) = match budget {
                        RowBudget::Join => (&local_fk, &remote_fk),
                        RowBudget::TypeInference => (&local_type, &remote_type),
                    };
                    result.extend(validator.validate(&ForeignKeyDataContext {
                        entity,
                        index,
                        foreign_key: fk,
                        local,
                        remote,
                        match_threshold: self.match_threshold,
                    }));
                }
            }
        }

        log::info!(
            "Data validation: {} entities, {} sampled, {} error(s), {} warning(s)",
            entities.len(),
            samples.len(),
            result.error_count,
            result.warning_count
        );
        result
    }

    /// Sample entities concurrently, at most `max_concurrency` at a time
    async fn sample_all(&self, entities: Vec<String>) -> HashMap<String, SampleOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let row_limit = self.max_sample_rows;
        let mut tasks: JoinSet<(String, SampleOutcome)> = JoinSet::new();

        for entity in entities {
            let fetcher = self.fetcher.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => AssertUnwindSafe(fetcher.fetch(&entity, row_limit))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| Err(ValidatorError::sampling(&entity, "sampler panicked"))),
                    Err(_) => Err(ValidatorError::sampling(&entity, "worker pool closed")),
                };
                (entity, outcome)
            });
        }

        let mut samples = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((entity, outcome)) => {
                    if let Err(e) = &outcome {
                        log::warn!("Sampling '{}' failed: {}", entity, e);
                    }
                    samples.insert(entity, outcome);
                }
                Err(e) => log::error!("Sample task did not complete: {}", e),
            }
        }
        samples
    }
}

fn unavailable(entity: &str, field: Option<String>, error: &ValidatorError) -> ValidationIssue {
    let mut issue = ValidationIssue::data_error(
        codes::SAMPLE_UNAVAILABLE,
        format!("Data checks for '{}' could not run: {}", entity, error),
    )
    .with_entity(entity)
    .with_priority(Priority::High)
    .with_suggestion("Check the entity's data source and dependencies, then re-run data validation");
    if let Some(field) = field {
        issue = issue.with_field(field);
    }
    issue
}
