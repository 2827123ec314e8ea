// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validation Service
//!
//! Entry point combining the dependency graph, the structural composite and,
//! when a sampler is configured, the data-aware suite. Results of the two
//! passes are merged by concatenation.

use std::sync::Arc;

use serde::Serialize;

use crate::core::config::{ProjectConfig, ValidatorSettings};
use crate::core::data::{DataSampler, DataValidationSuite};
use crate::core::validation::{
    analyze, Cycle, DependencyGraph, StructuralValidator, ValidationResult,
};

/// Which passes to run and over which entities
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    pub include_data: bool,
    /// Restrict data checks to these entities; `None` means all
    pub entities: Option<Vec<String>>,
}

impl ValidationOptions {
    pub fn structural_only() -> Self {
        Self::default()
    }

    pub fn with_data() -> Self {
        Self {
            include_data: true,
            entities: None,
        }
    }
}

/// Dependency graph summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphReport {
    pub entities: Vec<String>,
    pub edges: Vec<(String, String)>,
    /// Dependency-first order; absent when cycles exist
    pub order: Option<Vec<String>>,
    pub cycles: Vec<Cycle>,
}

pub struct ValidationService {
    structural: StructuralValidator,
    data: Option<DataValidationSuite>,
    settings: ValidatorSettings,
}

impl ValidationService {
    pub fn new(settings: ValidatorSettings) -> Self {
        Self {
            structural: StructuralValidator::new(),
            data: None,
            settings,
        }
    }

    /// Enable data-aware validation through `sampler`
    pub fn with_sampler(mut self, sampler: Arc<dyn DataSampler>) -> Self {
        self.data = Some(DataValidationSuite::new(sampler, &self.settings));
        self
    }

    #[inline]
    pub fn settings(&self) -> &ValidatorSettings {
        &self.settings
    }

    #[inline]
    pub fn has_data_validation(&self) -> bool {
        self.data.is_some()
    }

    pub fn graph(&self, config: &ProjectConfig) -> GraphReport {
        let graph = DependencyGraph::from_config(config);
        let analysis = analyze(&graph);
        GraphReport {
            entities: graph.nodes().to_vec(),
            edges: graph
                .edges()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            order: analysis.order,
            cycles: analysis.cycles,
        }
    }

    pub fn validate_structure(&self, config: &ProjectConfig) -> ValidationResult {
        self.structural.validate(config)
    }

    /// Structural pass plus the data pass when a sampler is configured
    pub async fn validate(&self, config: &ProjectConfig) -> ValidationResult {
        let options = ValidationOptions {
            include_data: self.data.is_some(),
            entities: None,
        };
        self.validate_with_options(config, &options).await
    }

    pub async fn validate_with_options(
        &self,
        config: &ProjectConfig,
        options: &ValidationOptions,
    ) -> ValidationResult {
        let mut result = self.validate_structure(config);
        if !options.include_data {
            return result;
        }

        match &self.data {
            Some(suite) => {
                let data = match &options.entities {
                    Some(entities) => suite.validate_entities(config, entities).await,
                    None => suite.validate(config).await,
                };
                result.merge(data);
            }
            None => log::warn!("Data validation requested but no sampler is configured"),
        }
        result
    }
}
