// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structural Specification Composite
//!
//! A fixed, ordered list of independent checks run over one configuration
//! snapshot. Every check runs even when earlier ones found problems, and the
//! composite never fails: it only accumulates issues.
//!
//! | Order | Specification | Checks |
//! |-------|---------------|--------|
//! | 1 | `required_fields` | entities section, per-type required fields |
//! | 2 | `entity_exists` | `depends_on` / `source` / foreign-key targets |
//! | 3 | `circular_dependency` | cycles in the dependency graph |
//! | 4 | `data_source_exists` | entity and append `data_source` names |
//! | 5 | `sql_entity` | `data_source` + non-empty `query`, no `source` |
//! | 6 | `fixed_entity` | `values` rows match `columns`, no `source` |
//! | 7 | `foreign_key` | key lists, `cross` joins, `extra_columns` |
//! | 8 | `unnest` | `value_vars`, `var_name`, `value_name`, `id_vars` |
//! | 9 | `drop_duplicates` | boolean, string or list |
//! | 10 | `surrogate_id` | uniqueness and `_id` suffix |
//! | 11 | `append` | append block shape and `append_mode` |

use serde_yaml::Value;

use super::circular_dependency::{analyze, GraphAnalysis};
use super::dependency_graph::DependencyGraph;
use super::issue::{IssueCategory, ValidationIssue, ValidationResult};
use super::specifications::{
    AppendSpecification, CircularDependencySpecification, DataSourceExistsSpecification,
    DropDuplicatesSpecification, EntityExistsSpecification, FixedEntitySpecification,
    ForeignKeySpecification, RequiredFieldsSpecification, SqlEntitySpecification,
    SurrogateIdSpecification, UnnestSpecification,
};
use crate::core::config::{DataSourceRegistry, ProjectConfig};

/// Read-only inputs shared by every specification
pub struct SpecificationContext<'a> {
    pub config: &'a ProjectConfig,
    pub graph: &'a DependencyGraph,
    pub analysis: &'a GraphAnalysis,
    pub registry: &'a dyn DataSourceRegistry,
}

impl<'a> SpecificationContext<'a> {
    /// `(name, block)` for every entity with a string name, in document order
    pub fn entities(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.config
            .entities()
            .into_iter()
            .flat_map(|entities| entities.iter())
            .filter_map(|(k, v)| k.as_str().map(|name| (name, v)))
    }
}

/// One structural check
pub trait ConfigSpecification: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue>;
}

/// Ordered list of specifications run as one pass
pub struct CompositeSpecification {
    specifications: Vec<Box<dyn ConfigSpecification>>,
}

impl Default for CompositeSpecification {
    fn default() -> Self {
        Self::standard()
    }
}

impl CompositeSpecification {
    /// The standard, ordered set of structural checks
    pub fn standard() -> Self {
        Self {
            specifications: vec![
                Box::new(RequiredFieldsSpecification),
                Box::new(EntityExistsSpecification),
                Box::new(CircularDependencySpecification),
                Box::new(DataSourceExistsSpecification),
                Box::new(SqlEntitySpecification),
                Box::new(FixedEntitySpecification),
                Box::new(ForeignKeySpecification),
                Box::new(UnnestSpecification),
                Box::new(DropDuplicatesSpecification),
                Box::new(SurrogateIdSpecification),
                Box::new(AppendSpecification),
            ],
        }
    }

    /// Compose a custom ordered list
    pub fn with_specifications(specifications: Vec<Box<dyn ConfigSpecification>>) -> Self {
        Self { specifications }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.specifications.iter().map(|s| s.name()).collect()
    }

    /// Run every specification and aggregate the issues
    pub fn validate(&self, ctx: &SpecificationContext<'_>) -> ValidationResult {
        let mut result = ValidationResult::new();
        for specification in &self.specifications {
            let issues = specification.check(ctx);
            if !issues.is_empty() {
                log::debug!(
                    "Specification '{}' reported {} issue(s)",
                    specification.name(),
                    issues.len()
                );
            }
            result.extend(
                issues
                    .into_iter()
                    .map(|issue| issue.with_category(IssueCategory::Structural)),
            );
        }
        result
    }
}

/// Structural validation entry point: builds the graph and runs the composite
#[derive(Default)]
pub struct StructuralValidator {
    composite: CompositeSpecification,
}

impl StructuralValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_composite(composite: CompositeSpecification) -> Self {
        Self { composite }
    }

    /// Validate against the document's own `options.data_sources`
    pub fn validate(&self, config: &ProjectConfig) -> ValidationResult {
        self.validate_with_registry(config, config)
    }

    /// Validate against an external data-source registry
    pub fn validate_with_registry(
        &self,
        config: &ProjectConfig,
        registry: &dyn DataSourceRegistry,
    ) -> ValidationResult {
        let graph = DependencyGraph::from_config(config);
        let analysis = analyze(&graph);
        self.validate_with_graph(config, &graph, &analysis, registry)
    }

    /// Validate with a graph the caller already built
    pub fn validate_with_graph(
        &self,
        config: &ProjectConfig,
        graph: &DependencyGraph,
        analysis: &GraphAnalysis,
        registry: &dyn DataSourceRegistry,
    ) -> ValidationResult {
        let ctx = SpecificationContext {
            config,
            graph,
            analysis,
            registry,
        };
        let result = self.composite.validate(&ctx);
        log::info!(
            "Structural validation: {} error(s), {} warning(s) across {} entities",
            result.error_count,
            result.warning_count,
            graph.nodes().len()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validation::issue::codes;

    struct AlwaysWarn;

    impl ConfigSpecification for AlwaysWarn {
        fn name(&self) -> &'static str {
            "always_warn"
        }

        fn check(&self, _ctx: &SpecificationContext<'_>) -> Vec<ValidationIssue> {
            vec![ValidationIssue::data_warning("CUSTOM", "custom")]
        }
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(
            CompositeSpecification::standard().names(),
            vec![
                "required_fields",
                "entity_exists",
                "circular_dependency",
                "data_source_exists",
                "sql_entity",
                "fixed_entity",
                "foreign_key",
                "unnest",
                "drop_duplicates",
                "surrogate_id",
                "append",
            ]
        );
    }

    #[test]
    fn test_composite_tags_issues_structural() {
        let config = ProjectConfig::from_yaml_str("entities: {}").unwrap();
        let validator = StructuralValidator::with_composite(
            CompositeSpecification::with_specifications(vec![Box::new(AlwaysWarn)]),
        );
        let result = validator.validate(&config);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].category, IssueCategory::Structural);
    }

    #[test]
    fn test_missing_entities_section_does_not_stop_other_checks() {
        let config = ProjectConfig::from_yaml_str("options: {}").unwrap();
        let result = StructuralValidator::new().validate(&config);
        assert!(!result.is_valid);
        assert_eq!(result.error_count, 1);
        assert!(result.has_code(codes::MISSING_ENTITIES_SECTION));
    }
}
