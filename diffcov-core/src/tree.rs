//! Hierarchical accumulator of per-file coverage totals.
//!
//! Nodes are keyed by path segment and stored in a `petgraph` graph with
//! parent→child edges only. Leaves carry the file's [`CoverageProfile`].
//! Totals are rolled up exactly once, by [`CoverageTree::collect`], after
//! every leaf has been attached.

use std::collections::BTreeMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use serde::Serialize;

use crate::types::{CoverageProfile, CoverageTotals};

#[derive(Debug)]
struct TreeNode {
    name: String,
    children: BTreeMap<String, NodeIndex>,
    totals: CoverageTotals,
    profile: Option<CoverageProfile>,
}

impl TreeNode {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: BTreeMap::new(),
            totals: CoverageTotals::default(),
            profile: None,
        }
    }
}

/// Flattened view of one tree node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeInfo {
    /// Module path joined with every segment down to this node.
    pub path: String,
    /// Last path segment (the module path for the root).
    pub name: String,
    /// Distance from the root.
    pub depth: usize,
    pub is_leaf: bool,
    #[serde(flatten)]
    pub totals: CoverageTotals,
    pub coverage_profile: Option<CoverageProfile>,
}

/// Coverage tree rooted at the module path.
#[derive(Debug)]
pub struct CoverageTree {
    graph: DiGraph<TreeNode, ()>,
    root: NodeIndex,
}

impl CoverageTree {
    pub fn new(module_path: &str) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(TreeNode::new(module_path));
        Self { graph, root }
    }

    /// Attach `profile` at the node for its repository-relative file name.
    ///
    /// Several profiles can be attributed to one file; their totals add up
    /// and the node keeps the first profile.
    pub fn insert(&mut self, profile: CoverageProfile) {
        let node = self.find_or_create(&profile.file_name);
        let weight = &mut self.graph[node];
        weight.totals += CoverageTotals::from_profile(&profile);
        weight.profile.get_or_insert(profile);
    }

    fn find_or_create(&mut self, file_name: &str) -> NodeIndex {
        let mut current = self.root;
        for segment in file_name.split('/').filter(|s| !s.is_empty()) {
            let existing = self.graph[current].children.get(segment).copied();
            current = match existing {
                Some(child) => child,
                None => {
                    let child = self.graph.add_node(TreeNode::new(segment));
                    self.graph.add_edge(current, child, ());
                    self.graph[current]
                        .children
                        .insert(segment.to_string(), child);
                    child
                }
            };
        }
        current
    }

    /// Roll leaf totals up to every ancestor in one post-order pass.
    pub fn collect(&mut self) {
        let mut dfs = DfsPostOrder::new(&self.graph, self.root);
        while let Some(node) = dfs.next(&self.graph) {
            if self.graph[node].children.is_empty() {
                continue;
            }
            let mut sum = CoverageTotals::default();
            for &child in self.graph[node].children.values() {
                sum += self.graph[child].totals;
            }
            self.graph[node].totals = sum;
        }
    }

    /// Totals of the root node.
    pub fn statistics(&self) -> CoverageTotals {
        self.graph[self.root].totals
    }

    /// Every node in pre-order, children in lexical order.
    pub fn all(&self) -> Vec<NodeInfo> {
        let mut out = Vec::with_capacity(self.graph.node_count());
        let root = &self.graph[self.root];
        self.flatten(self.root, root.name.clone(), 0, &mut out);
        out
    }

    fn flatten(&self, node: NodeIndex, path: String, depth: usize, out: &mut Vec<NodeInfo>) {
        let weight = &self.graph[node];
        out.push(NodeInfo {
            path: path.clone(),
            name: weight.name.clone(),
            depth,
            is_leaf: weight.children.is_empty(),
            totals: weight.totals,
            coverage_profile: weight.profile.clone(),
        });
        for (segment, &child) in &weight.children {
            let child_path = if path.is_empty() {
                segment.clone()
            } else {
                format!("{}/{}", path, segment)
            };
            self.flatten(child, child_path, depth + 1, out);
        }
    }
}
