//! Dependency tracking for incremental rebuilds.
//!
//! Edges are discovered while rendering: every `list`, `include`, template
//! application or `read_json` of a cataloged file adds `from → to` meaning
//! "rendering `from` read `to`". The graph may contain cycles (two templates
//! including each other); queries only ever look at direct neighbours.
//!
//! ```text
//!  build pass ──► DependencyRecord ──► DependencyState::apply()
//!                   (edges seen                │
//!                    this pass)                ▼
//!                                      graph used to expand the
//!                                      next rebuild set
//! ```

use rustc_hash::{FxHashMap, FxHashSet};

// ============================================================================
// Graph
// ============================================================================

/// Directed graph keyed by relative input path.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// from → files it depends on
    forward: FxHashMap<String, FxHashSet<String>>,
    /// to → files depending on it
    reverse: FxHashMap<String, FxHashSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` if missing.
    pub fn add_node(&mut self, node: &str) {
        if !self.forward.contains_key(node) {
            self.forward.insert(node.to_owned(), FxHashSet::default());
        }
        if !self.reverse.contains_key(node) {
            self.reverse.insert(node.to_owned(), FxHashSet::default());
        }
    }

    /// Record `from → to`. Idempotent; missing endpoints are registered.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        self.add_node(from);
        self.add_node(to);
        if let Some(deps) = self.forward.get_mut(from) {
            deps.insert(to.to_owned());
        }
        if let Some(dependents) = self.reverse.get_mut(to) {
            dependents.insert(from.to_owned());
        }
    }

    pub fn contains(&self, node: &str) -> bool {
        self.forward.contains_key(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.forward.keys().map(String::as_str)
    }

    /// Files `node` read during its last render.
    pub fn dependencies_of(&self, node: &str) -> impl Iterator<Item = &str> {
        self.forward
            .get(node)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Files whose last render read `node`.
    pub fn dependents_of(&self, node: &str) -> impl Iterator<Item = &str> {
        self.reverse
            .get(node)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Drop every outgoing edge of `node`, keeping the node.
    pub fn clear_dependencies(&mut self, node: &str) {
        let Some(old) = self.forward.get_mut(node) else {
            return;
        };
        for to in std::mem::take(old) {
            if let Some(dependents) = self.reverse.get_mut(&to) {
                dependents.remove(node);
            }
        }
    }

    /// Copy `node` and its outgoing edges from `other` into `self`.
    fn merge_from(&mut self, other: &Self, node: &str) {
        self.add_node(node);
        for to in other.dependencies_of(node) {
            self.add_dependency(node, to);
        }
    }
}

// ============================================================================
// Per-build record and cross-build state
// ============================================================================

/// Everything one build pass learned about dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyRecord {
    /// Pass covered the whole catalog.
    pub full: bool,
    /// Edges recorded this pass, with a node for every cataloged file.
    pub graph: DependencyGraph,
    /// Files that called `list` this pass.
    pub always_rebuild: FxHashSet<String>,
    /// Files rendered standalone this pass.
    pub touched: FxHashSet<String>,
    /// Files whose render failed this pass.
    pub failed: FxHashSet<String>,
}

/// Dependency knowledge carried between builds of one watch session.
#[derive(Debug, Clone, Default)]
pub struct DependencyState {
    pub graph: DependencyGraph,
    pub always_rebuild: FxHashSet<String>,
}

impl DependencyState {
    /// Fold the result of a build pass into the carried state.
    ///
    /// A full pass replaces the state. A restricted pass replaces the edges of
    /// files it rendered successfully and only adds to everything else. Failed
    /// renders never lose edges: a render that stops at a missing include
    /// must still be rebuilt once the include reappears.
    pub fn apply(&mut self, record: DependencyRecord) {
        let DependencyRecord {
            full,
            graph,
            always_rebuild,
            touched,
            failed,
        } = record;

        if full {
            let previous = std::mem::replace(
                self,
                Self {
                    graph,
                    always_rebuild,
                },
            );
            for node in &failed {
                self.graph.merge_from(&previous.graph, node);
                if previous.always_rebuild.contains(node) {
                    self.always_rebuild.insert(node.clone());
                }
            }
            return;
        }

        for node in graph.nodes() {
            let replace = touched.contains(node) && !failed.contains(node);
            if replace {
                self.graph.add_node(node);
                self.graph.clear_dependencies(node);
                if !always_rebuild.contains(node) {
                    self.always_rebuild.remove(node);
                }
            }
            self.graph.merge_from(&graph, node);
            if always_rebuild.contains(node) {
                self.always_rebuild.insert(node.to_owned());
            }
        }
    }
}
