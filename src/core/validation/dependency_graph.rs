// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity Dependency Graph
//!
//! Builds the directed graph `entity → dependency` from `depends_on`,
//! `source`, and foreign-key targets. References to names that are not
//! entities are dropped here; the entity-reference specification reports them.

use std::collections::{BTreeMap, HashSet};

use crate::core::config::ProjectConfig;

/// Immutable snapshot of entity dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Entity names in document order
    nodes: Vec<String>,
    /// entity → dependencies, declaration order, existing entities only
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph for every entity of a configuration
    pub fn from_config(config: &ProjectConfig) -> Self {
        let entities = config.entity_configs();
        Self::from_dependencies(
            entities
                .iter()
                .map(|entity| (entity.name.clone(), entity.dependencies())),
        )
    }

    /// Build from `(entity, dependencies)` pairs
    ///
    /// Dependencies naming an entity absent from the pairs become no edge.
    pub fn from_dependencies<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let pairs: Vec<(String, Vec<String>)> = pairs
            .into_iter()
            .map(|(node, deps)| (node.into(), deps.into_iter().map(Into::into).collect()))
            .collect();

        let mut nodes: Vec<String> = Vec::with_capacity(pairs.len());
        let mut known: HashSet<String> = HashSet::with_capacity(pairs.len());
        for (node, _) in &pairs {
            if known.insert(node.clone()) {
                nodes.push(node.clone());
            }
        }

        let mut edges: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (node, deps) in pairs {
            let entry = edges.entry(node).or_default();
            for dep in deps {
                if known.contains(&dep) && !entry.contains(&dep) {
                    entry.push(dep);
                }
            }
        }

        Self { nodes, edges }
    }

    #[inline]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    #[inline]
    pub fn contains(&self, node: &str) -> bool {
        self.edges.contains_key(node)
    }

    /// Direct dependencies of `node`
    pub fn dependencies_of(&self, node: &str) -> &[String] {
        self.edges.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entities that directly depend on `node`, in document order
    pub fn dependents_of(&self, node: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|candidate| self.dependencies_of(candidate).iter().any(|d| d == node))
            .map(String::as_str)
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// All `(entity, dependency)` edges
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.iter().flat_map(move |node| {
            self.dependencies_of(node)
                .iter()
                .map(move |dep| (node.as_str(), dep.as_str()))
        })
    }
}
