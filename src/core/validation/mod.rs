// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structural Validation
//!
//! Checks a configuration document without touching any data:
//! - Dependency graph construction from `depends_on`, `source` and foreign keys
//! - Circular dependency detection and topological ordering
//! - An ordered composite of shape and reference specifications
//!
//! Issues and results defined here are shared with the data-aware suite.

pub mod circular_dependency;
pub mod dependency_graph;
pub mod issue;
pub mod specification;
pub mod specifications;

pub use circular_dependency::{
    analyze, detect_circular_dependencies, format_cycle, topological_order, Cycle, GraphAnalysis,
};
pub use dependency_graph::DependencyGraph;
pub use issue::{codes, IssueCategory, Priority, Severity, ValidationIssue, ValidationResult};
pub use specification::{
    CompositeSpecification, ConfigSpecification, SpecificationContext, StructuralValidator,
};
