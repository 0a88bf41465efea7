//! Dependency graph model built per root artifact.
//!
//! The graph is owned by the resolution call that built it and is never
//! persisted; nodes are artifact paths, edges carry the reference kind
//! that produced them.

use super::extract::ReferenceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directed edge: `source` references `target` via `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: PathBuf,
    pub target: PathBuf,
    pub kind: ReferenceKind,
}

/// One resolved node in the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub path: PathBuf,
    /// Depth at which this node was first expanded (root = 0).
    pub depth: usize,
    /// Raw reference strings that resolved to concrete targets.
    pub direct_dependencies: Vec<String>,
    /// Resolved targets in discovery order.
    pub resolved: Vec<PathBuf>,
    /// Set when the depth bound stopped expansion at this node.
    pub depth_limited: bool,
    /// Set when the node content could not be read.
    pub unreadable: bool,
}

impl GraphNode {
    pub fn new(path: PathBuf, depth: usize) -> Self {
        Self {
            path,
            depth,
            direct_dependencies: Vec::new(),
            resolved: Vec::new(),
            depth_limited: false,
            unreadable: false,
        }
    }
}

/// A back-edge closing a cycle: (source, target) where target is already
/// on the traversal path.
pub type CircularEdge = (PathBuf, PathBuf);

/// Dependency graph for one root artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub root: PathBuf,
    pub nodes: BTreeMap<PathBuf, GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Back-edges in discovery order.
    pub cycles: Vec<CircularEdge>,
    /// Deepest expansion level reached.
    pub max_depth_reached: usize,
}

impl DependencyGraph {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    /// Resolved targets of the root node itself.
    pub fn direct_dependencies(&self) -> &[PathBuf] {
        self.nodes
            .get(&self.root)
            .map(|n| n.resolved.as_slice())
            .unwrap_or(&[])
    }

    /// Sorted, deduplicated union of every node reachable from the root,
    /// excluding the root itself.
    pub fn flat_dependencies(&self) -> Vec<PathBuf> {
        let mut deps: Vec<PathBuf> = self
            .nodes
            .keys()
            .filter(|path| **path != self.root)
            .cloned()
            .collect();
        // Edge targets that were never expanded (depth bound) still count.
        for edge in &self.edges {
            if edge.target != self.root && !self.nodes.contains_key(&edge.target) {
                deps.push(edge.target.clone());
            }
        }
        deps.sort();
        deps.dedup();
        deps
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

/// Summary numbers for one root's dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyStatistics {
    pub root: PathBuf,
    pub direct_dependency_count: usize,
    pub total_dependency_count: usize,
    pub max_depth: usize,
    pub circular_dependencies: Vec<CircularEdge>,
    pub has_circular_dependencies: bool,
}

impl DependencyStatistics {
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        Self {
            root: graph.root.clone(),
            direct_dependency_count: graph.direct_dependencies().len(),
            total_dependency_count: graph.flat_dependencies().len(),
            max_depth: graph.max_depth_reached,
            circular_dependencies: graph.cycles.clone(),
            has_circular_dependencies: graph.has_cycles(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_nodes() -> DependencyGraph {
        let mut graph = DependencyGraph::new(PathBuf::from("/app/a.js"));
        let mut root = GraphNode::new(PathBuf::from("/app/a.js"), 0);
        root.resolved = vec![PathBuf::from("/app/b.js")];
        root.direct_dependencies = vec!["./b".to_string()];
        graph.nodes.insert(root.path.clone(), root);
        graph
            .nodes
            .insert(PathBuf::from("/app/b.js"), GraphNode::new(PathBuf::from("/app/b.js"), 1));
        graph.edges.push(GraphEdge {
            source: PathBuf::from("/app/a.js"),
            target: PathBuf::from("/app/b.js"),
            kind: ReferenceKind::Require,
        });
        graph.max_depth_reached = 1;
        graph
    }

    #[test]
    fn test_flat_dependencies_exclude_root() {
        let graph = graph_with_nodes();
        let flat = graph.flat_dependencies();
        assert_eq!(flat, vec![PathBuf::from("/app/b.js")]);
    }

    #[test]
    fn test_flat_dependencies_include_unexpanded_edge_targets() {
        let mut graph = graph_with_nodes();
        graph.edges.push(GraphEdge {
            source: PathBuf::from("/app/b.js"),
            target: PathBuf::from("/app/c.js"),
            kind: ReferenceKind::EsImport,
        });
        let flat = graph.flat_dependencies();
        assert!(flat.contains(&PathBuf::from("/app/c.js")));
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn test_statistics_from_graph() {
        let graph = graph_with_nodes();
        let stats = DependencyStatistics::from_graph(&graph);
        assert_eq!(stats.direct_dependency_count, 1);
        assert_eq!(stats.total_dependency_count, 1);
        assert_eq!(stats.max_depth, 1);
        assert!(!stats.has_circular_dependencies);
    }
}
