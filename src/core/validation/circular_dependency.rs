// SPDX-License-Identifier: MIT OR Apache-2.0

//! Circular Dependency Detection
//!
//! Three-color depth-first search over a [`DependencyGraph`] snapshot:
//! - unvisited nodes are white
//! - nodes on the current DFS path are gray
//! - finished nodes are black
//!
//! An edge into a gray node is a back edge; the cycle is the DFS stack from
//! that node to the current one. Post-order finish gives a topological order
//! in which every entity follows its dependencies.
//!
//! ```text
//! A depends on B
//! B depends on C
//! C depends on A
//! → Cycle: A → B → C → A
//! ```

use std::collections::{HashMap, HashSet};

use super::dependency_graph::DependencyGraph;

/// Ordered entity names returning to the first one
pub type Cycle = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Gray,
    Black,
}

/// Outcome of analyzing a dependency graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphAnalysis {
    /// Dependency-first order; `None` when the graph has cycles
    pub order: Option<Vec<String>>,
    pub cycles: Vec<Cycle>,
}

impl GraphAnalysis {
    #[inline]
    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Best-effort processing order: the topological order, or finish order
    /// ignoring back edges when cycles exist
    pub fn processing_order(&self, graph: &DependencyGraph) -> Vec<String> {
        match &self.order {
            Some(order) => order.clone(),
            None => walk(graph).finish_order,
        }
    }
}

struct Walk {
    finish_order: Vec<String>,
    cycles: Vec<Cycle>,
}

/// Analyze a graph: cycles and, if there are none, a topological order
pub fn analyze(graph: &DependencyGraph) -> GraphAnalysis {
    let walk = walk(graph);
    let order = walk.cycles.is_empty().then_some(walk.finish_order);
    GraphAnalysis {
        order,
        cycles: walk.cycles,
    }
}

/// Every distinct cycle in the graph
pub fn detect_circular_dependencies(graph: &DependencyGraph) -> Vec<Cycle> {
    walk(graph).cycles
}

/// Topological order, or every cycle that prevents one
pub fn topological_order(graph: &DependencyGraph) -> Result<Vec<String>, Vec<Cycle>> {
    let walk = walk(graph);
    if walk.cycles.is_empty() {
        Ok(walk.finish_order)
    } else {
        Err(walk.cycles)
    }
}

/// Render a cycle as `A → B → A`
pub fn format_cycle(cycle: &[String]) -> String {
    cycle.join(" → ")
}

fn walk(graph: &DependencyGraph) -> Walk {
    let mut colors: HashMap<&str, Color> = HashMap::with_capacity(graph.nodes().len());
    let mut walk = Walk {
        finish_order: Vec::with_capacity(graph.nodes().len()),
        cycles: Vec::new(),
    };
    let mut seen_cycles: HashSet<Vec<String>> = HashSet::new();

    for start in graph.nodes() {
        if !colors.contains_key(start.as_str()) {
            dfs_visit(start, graph, &mut colors, &mut walk, &mut seen_cycles);
        }
    }

    walk
}

/// Iterative visit; each frame is a gray node and the index of its next edge,
/// so the frames are also the current DFS path
fn dfs_visit<'g>(
    root: &'g str,
    graph: &'g DependencyGraph,
    colors: &mut HashMap<&'g str, Color>,
    walk: &mut Walk,
    seen_cycles: &mut HashSet<Vec<String>>,
) {
    let mut frames: Vec<(&'g str, usize)> = vec![(root, 0)];
    colors.insert(root, Color::Gray);

    while let Some(frame) = frames.last_mut() {
        let (node, next_edge) = *frame;
        let Some(dep) = graph.dependencies_of(node).get(next_edge) else {
            frames.pop();
            colors.insert(node, Color::Black);
            walk.finish_order.push(node.to_string());
            continue;
        };
        frame.1 += 1;

        match colors.get(dep.as_str()) {
            None => {
                colors.insert(dep, Color::Gray);
                frames.push((dep, 0));
            }
            Some(Color::Gray) => {
                // Back edge: the cycle is the path suffix starting at `dep`
                if let Some(start) = frames.iter().position(|(n, _)| *n == dep.as_str()) {
                    let mut cycle: Cycle = frames[start..].iter().map(|(n, _)| n.to_string()).collect();
                    if seen_cycles.insert(canonical_rotation(&cycle)) {
                        cycle.push(dep.clone());
                        walk.cycles.push(cycle);
                    }
                }
            }
            Some(Color::Black) => {}
        }
    }
}

/// Rotate an open cycle so it starts at its smallest name
fn canonical_rotation(cycle: &[String]) -> Vec<String> {
    let Some(min_idx) = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };
    cycle[min_idx..]
        .iter()
        .chain(cycle[..min_idx].iter())
        .cloned()
        .collect()
}
