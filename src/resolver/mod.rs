//! Cross-artifact dependency resolution.
//!
//! The resolver extracts typed references from artifact content, maps them
//! to concrete files under the configured base directory, and builds a
//! bounded-depth dependency graph per root with path-local cycle
//! detection. Resolution results are cached per (path, content-hash) pair;
//! the cache is a performance optimization only and may be discarded at
//! any time.
//!
//! Failure semantics: malformed content yields zero references, unresolved
//! references are dropped without error, and traversal always terminates
//! because depth is bounded and back-edges are never recursed.

mod extract;
mod graph;

pub use extract::{Reference, ReferenceKind, extract_references};
pub use graph::{CircularEdge, DependencyGraph, DependencyStatistics, GraphEdge, GraphNode};

use crate::artifact::content_hash;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Default maximum traversal depth.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// How many parent directories above the base dir are searched when
/// mapping dotted class names to namespace roots.
const NAMESPACE_SEARCH_LEVELS: usize = 3;

// Framework and vendor resources are never analyzed or edged.
static EXTERNAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)[\\/]ext[\\/]",
        r"(?i)[\\/]extjs[\\/]",
        r"(?i)[\\/]node_modules[\\/]",
        r"(?i)^Ext\.",
        r"(?i)\.min\.js$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Configuration for dependency resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Base directory for rooted and namespace resolution.
    pub base_dir: PathBuf,
    /// Maximum traversal depth (root = 0).
    pub max_depth: usize,
    /// Extension tried first when a reference omits one.
    pub default_extension: String,
}

impl ResolverConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            default_extension: "js".to_string(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    content_hash: String,
    resolved: Vec<(Reference, PathBuf)>,
}

/// Resolves artifact references into a dependency graph.
pub struct DependencyResolver {
    config: ResolverConfig,
    cache: HashMap<PathBuf, CacheEntry>,
}

impl DependencyResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// True when a reference or path points at a framework/vendor resource
    /// that must not be analyzed.
    pub fn is_external(&self, reference: &str) -> bool {
        EXTERNAL_PATTERNS.iter().any(|p| p.is_match(reference))
    }

    /// Map one raw reference to a concrete artifact path.
    ///
    /// Tries, in order: dotted-namespace mapping from the base dir and its
    /// parents, relative to the referencing artifact (with then without
    /// the default extension), absolute, then rooted at the base dir.
    /// First hit wins; no hit means the reference is unresolved.
    pub fn resolve(&self, raw: &str, from: &Path) -> Option<PathBuf> {
        let ext = &self.config.default_extension;
        let from_dir = from.parent().unwrap_or(&self.config.base_dir);

        if is_dotted_name(raw) {
            let mut rel: PathBuf = raw.split('.').collect();
            rel.set_extension(ext);
            let mut root = self.config.base_dir.clone();
            for _ in 0..=NAMESPACE_SEARCH_LEVELS {
                let candidate = root.join(&rel);
                if candidate.is_file() {
                    return Some(normalize(&candidate));
                }
                if !root.pop() {
                    break;
                }
            }
        }

        let with_ext = format!("{}.{}", raw, ext);
        for candidate in [from_dir.join(&with_ext), from_dir.join(raw)] {
            if candidate.is_file() {
                return Some(normalize(&candidate));
            }
        }

        let as_path = Path::new(raw);
        if as_path.is_absolute() && as_path.is_file() {
            return Some(normalize(as_path));
        }

        for candidate in [
            self.config.base_dir.join(&with_ext),
            self.config.base_dir.join(raw),
        ] {
            if candidate.is_file() {
                return Some(normalize(&candidate));
            }
        }

        None
    }

    /// Extract and resolve every reference in `content`, deduplicated by
    /// target in discovery order. Cached per (path, content-hash).
    pub fn resolve_all(&mut self, path: &Path, content: &str) -> Vec<(Reference, PathBuf)> {
        let hash = content_hash(content);
        if let Some(entry) = self.cache.get(path) {
            if entry.content_hash == hash {
                return entry.resolved.clone();
            }
        }

        let mut resolved = Vec::new();
        let mut seen = HashSet::new();
        for reference in extract_references(content) {
            if self.is_external(&reference.raw) {
                continue;
            }
            let Some(target) = self.resolve(&reference.raw, path) else {
                tracing::debug!(reference = %reference.raw, from = %path.display(), "unresolved reference dropped");
                continue;
            };
            if self.is_external(&target.to_string_lossy()) {
                continue;
            }
            if seen.insert(target.clone()) {
                resolved.push((reference, target));
            }
        }

        self.cache.insert(
            path.to_path_buf(),
            CacheEntry {
                content_hash: hash,
                resolved: resolved.clone(),
            },
        );
        resolved
    }

    /// Build the dependency graph for `root`, bounded by the configured
    /// maximum depth. Back-edges to nodes on the current traversal path
    /// are recorded as cycles and not recursed.
    pub fn build_graph(&mut self, root: &Path) -> DependencyGraph {
        let root = self.absolutize(root);
        let mut graph = DependencyGraph::new(root.clone());
        let mut stack = Vec::new();
        self.visit(&root, 0, &mut stack, &mut graph);
        graph
    }

    fn visit(
        &mut self,
        path: &PathBuf,
        depth: usize,
        stack: &mut Vec<PathBuf>,
        graph: &mut DependencyGraph,
    ) {
        if graph.contains(path) {
            return;
        }

        let mut node = GraphNode::new(path.clone(), depth);
        graph.max_depth_reached = graph.max_depth_reached.max(depth);

        if depth >= self.config.max_depth {
            node.depth_limited = true;
            graph.nodes.insert(path.clone(), node);
            return;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "artifact unreadable during resolution");
                node.unreadable = true;
                graph.nodes.insert(path.clone(), node);
                return;
            }
        };

        let resolved = self.resolve_all(path, &content);
        stack.push(path.clone());

        for (reference, target) in resolved {
            if target == *path {
                continue;
            }
            node.direct_dependencies.push(reference.raw.clone());
            node.resolved.push(target.clone());
            graph.edges.push(GraphEdge {
                source: path.clone(),
                target: target.clone(),
                kind: reference.kind,
            });

            if stack.contains(&target) {
                graph.cycles.push((path.clone(), target.clone()));
                continue;
            }
            self.visit(&target, depth + 1, stack, graph);
        }

        stack.pop();
        graph.nodes.insert(path.clone(), node);
    }

    /// Deduplicated union of every artifact reachable from `root`,
    /// excluding the root itself, sorted for determinism.
    pub fn all_dependencies_flat(&mut self, root: &Path) -> Vec<PathBuf> {
        self.build_graph(root).flat_dependencies()
    }

    /// Back-edges discovered while traversing from `root`, in discovery
    /// order.
    pub fn detect_circular_dependencies(&mut self, root: &Path) -> Vec<CircularEdge> {
        self.build_graph(root).cycles
    }

    pub fn statistics(&mut self, root: &Path) -> DependencyStatistics {
        DependencyStatistics::from_graph(&self.build_graph(root))
    }

    /// Drop all cached resolutions. Safe at any time; the cache is never a
    /// correctness dependency.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.config.base_dir.join(path))
        }
    }
}

fn is_dotted_name(raw: &str) -> bool {
    raw.contains('.')
        && !raw.contains('/')
        && !raw.contains('\\')
        && !raw.starts_with('.')
}

/// Lexically normalize `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn resolver(dir: &TempDir) -> DependencyResolver {
        DependencyResolver::new(ResolverConfig::new(dir.path()))
    }

    #[test]
    fn test_resolve_relative_with_default_extension() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "app/a.js", "import b from './b';");
        write(&dir, "app/b.js", "");

        let mut resolver = resolver(&dir);
        let graph = resolver.build_graph(&a);

        assert_eq!(graph.direct_dependencies().len(), 1);
        assert!(graph.direct_dependencies()[0].ends_with("app/b.js"));
    }

    #[test]
    fn test_resolve_dotted_namespace() {
        let dir = tempdir().unwrap();
        let grid = write(
            &dir,
            "app/view/UserGrid.js",
            "requires: ['App.store.Users'],",
        );
        write(&dir, "App/store/Users.js", "");

        let mut resolver = resolver(&dir);
        let graph = resolver.build_graph(&grid);

        assert_eq!(graph.direct_dependencies().len(), 1);
        assert!(graph.direct_dependencies()[0].ends_with("App/store/Users.js"));
    }

    #[test]
    fn test_unresolved_reference_is_dropped() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a.js", "import missing from './missing';");

        let mut resolver = resolver(&dir);
        let graph = resolver.build_graph(&a);

        assert!(graph.direct_dependencies().is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_framework_references_are_external() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a.js", "requires: ['Ext.grid.Panel'],");
        // Even if a matching file exists it must not become an edge.
        write(&dir, "Ext/grid/Panel.js", "");

        let mut resolver = resolver(&dir);
        let graph = resolver.build_graph(&a);

        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_cycle_detection_on_three_node_loop() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a.js", "import b from './b';");
        write(&dir, "b.js", "import c from './c';");
        write(&dir, "c.js", "import a from './a';");

        let mut resolver = resolver(&dir);
        let cycles = resolver.detect_circular_dependencies(&a);

        assert_eq!(cycles.len(), 1);
        let (source, target) = &cycles[0];
        assert!(source.ends_with("c.js"));
        assert!(target.ends_with("a.js"));

        // Traversal terminated and covered all three nodes.
        let graph = resolver.build_graph(&a);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_depth_bound_stops_traversal() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a.js", "import b from './b';");
        write(&dir, "b.js", "import c from './c';");
        write(&dir, "c.js", "import d from './d';");
        write(&dir, "d.js", "");

        let mut resolver =
            DependencyResolver::new(ResolverConfig::new(dir.path()).with_max_depth(2));
        let graph = resolver.build_graph(&a);

        // c is reached at depth 2 and not expanded further.
        let c = graph
            .nodes
            .values()
            .find(|n| n.path.ends_with("c.js"))
            .unwrap();
        assert!(c.depth_limited);
        assert!(!graph.contains(&normalize(&dir.path().join("d.js"))));
    }

    #[test]
    fn test_flat_dependencies_deduplicated_and_sorted() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a.js", "import b from './b';\nimport c from './c';");
        write(&dir, "b.js", "import c from './c';");
        write(&dir, "c.js", "");

        let mut resolver = resolver(&dir);
        let flat = resolver.all_dependencies_flat(&a);

        assert_eq!(flat.len(), 2);
        let mut sorted = flat.clone();
        sorted.sort();
        assert_eq!(flat, sorted);
    }

    #[test]
    fn test_resolution_is_deterministic_and_idempotent() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a.js", "import b from './b';\nrequires: ['App.x.Y'],");
        write(&dir, "b.js", "import a from './a';");
        write(&dir, "App/x/Y.js", "");

        let mut resolver = resolver(&dir);
        let first_flat = resolver.all_dependencies_flat(&a);
        let first_cycles = resolver.detect_circular_dependencies(&a);
        let second_flat = resolver.all_dependencies_flat(&a);
        let second_cycles = resolver.detect_circular_dependencies(&a);

        assert_eq!(first_flat, second_flat);
        assert_eq!(first_cycles, second_cycles);
    }

    #[test]
    fn test_clear_cache_preserves_results() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a.js", "import b from './b';");
        write(&dir, "b.js", "");

        let mut resolver = resolver(&dir);
        let before = resolver.all_dependencies_flat(&a);
        resolver.clear_cache();
        let after = resolver.all_dependencies_flat(&a);
        assert_eq!(before, after);
    }

    #[test]
    fn test_statistics_reports_counts_and_depth() {
        let dir = tempdir().unwrap();
        let a = write(&dir, "a.js", "import b from './b';");
        write(&dir, "b.js", "import c from './c';");
        write(&dir, "c.js", "");

        let mut resolver = resolver(&dir);
        let stats = resolver.statistics(&a);

        assert_eq!(stats.direct_dependency_count, 1);
        assert_eq!(stats.total_dependency_count, 2);
        assert_eq!(stats.max_depth, 2);
        assert!(!stats.has_circular_dependencies);
    }

    #[test]
    fn test_unreadable_root_yields_empty_graph() {
        let dir = tempdir().unwrap();
        let mut resolver = resolver(&dir);
        let graph = resolver.build_graph(&dir.path().join("missing.js"));

        assert_eq!(graph.node_count(), 1);
        assert!(graph.nodes.values().next().unwrap().unreadable);
        assert!(graph.flat_dependencies().is_empty());
    }

    #[test]
    fn test_normalize_collapses_parent_components() {
        let normalized = normalize(Path::new("/app/sub/../a.js"));
        assert_eq!(normalized, PathBuf::from("/app/a.js"));
    }
}
