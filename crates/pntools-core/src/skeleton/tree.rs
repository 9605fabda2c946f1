//! Rooted neuron skeleton backed by petgraph::DiGraph.
//!
//! Edges run parent -> child and are weighted with the Euclidean distance
//! between the two nodes, so cable length and path distances fall out of the
//! edge weights directly.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::config::{Connector, NodeType, Relation, TreeNode};
use crate::error::{PnError, Result};
use crate::geometry::{self, Point};
use crate::volume::Volume;

/// A traced neuron: a single rooted tree of nodes plus its synapse sites.
#[derive(Debug, Clone)]
pub struct Skeleton {
    skeleton_id: i64,
    name: Option<String>,
    graph: DiGraph<TreeNode, f64>,
    /// O(1) node ID -> NodeIndex lookup.
    id_index: HashMap<i64, NodeIndex>,
    root: Option<NodeIndex>,
    soma: Option<i64>,
    connectors: Vec<Connector>,
}

impl Skeleton {
    /// Build and validate a skeleton from a flat node table.
    ///
    /// The table must describe exactly one tree: unique node IDs, one root,
    /// every parent present and no cycles. An empty table gives the empty
    /// skeleton.
    pub fn from_nodes(skeleton_id: i64, nodes: Vec<TreeNode>) -> Result<Self> {
        let invalid = |reason: String| PnError::InvalidSkeleton {
            skeleton_id,
            reason,
        };

        let mut graph = DiGraph::with_capacity(nodes.len(), nodes.len());
        let mut id_index = HashMap::with_capacity(nodes.len());
        let mut roots = Vec::new();

        for node in nodes {
            if !geometry::is_finite(&node.position()) {
                return Err(invalid(format!(
                    "node {} has non-finite coordinates",
                    node.node_id
                )));
            }
            if node.parent_id == Some(node.node_id) {
                return Err(invalid(format!("node {} is its own parent", node.node_id)));
            }
            let node_id = node.node_id;
            let is_root = node.parent_id.is_none();
            let idx = graph.add_node(node);
            if id_index.insert(node_id, idx).is_some() {
                return Err(invalid(format!("duplicate node id {node_id}")));
            }
            if is_root {
                roots.push(idx);
            }
        }

        if graph.node_count() > 0 && roots.len() != 1 {
            return Err(invalid(format!(
                "expected exactly one root, found {}",
                roots.len()
            )));
        }

        let child_indices: Vec<NodeIndex> = graph.node_indices().collect();
        for child_idx in child_indices {
            let child = &graph[child_idx];
            let Some(parent_id) = child.parent_id else {
                continue;
            };
            let Some(&parent_idx) = id_index.get(&parent_id) else {
                return Err(invalid(format!(
                    "node {} references missing parent {parent_id}",
                    child.node_id
                )));
            };
            let length = nalgebra::distance(&graph[parent_idx].position(), &child.position());
            graph.add_edge(parent_idx, child_idx, length);
        }

        let root = roots.first().copied();
        if let Some(root_idx) = root {
            let mut reached = 0;
            let mut bfs = Bfs::new(&graph, root_idx);
            while bfs.next(&graph).is_some() {
                reached += 1;
            }
            if reached != graph.node_count() {
                return Err(invalid(format!(
                    "{} nodes are not reachable from the root (cycle)",
                    graph.node_count() - reached
                )));
            }
        }

        Ok(Self {
            skeleton_id,
            name: None,
            graph,
            id_index,
            root,
            soma: None,
            connectors: Vec::new(),
        })
    }

    /// A skeleton with no nodes.
    pub fn empty(skeleton_id: i64) -> Self {
        Self {
            skeleton_id,
            name: None,
            graph: DiGraph::new(),
            id_index: HashMap::new(),
            root: None,
            soma: None,
            connectors: Vec::new(),
        }
    }

    /// An empty skeleton carrying this skeleton's ID and name.
    pub fn empty_like(&self) -> Self {
        let mut empty = Self::empty(self.skeleton_id);
        empty.name = self.name.clone();
        empty
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_soma(mut self, soma: i64) -> Result<Self> {
        self.set_soma(soma)?;
        Ok(self)
    }

    /// Attach connectors; connectors on nodes outside the skeleton are dropped.
    pub fn with_connectors(mut self, connectors: Vec<Connector>) -> Self {
        self.connectors = connectors
            .into_iter()
            .filter(|c| self.id_index.contains_key(&c.node_id))
            .collect();
        self
    }

    pub fn set_soma(&mut self, soma: i64) -> Result<()> {
        self.index_of(soma)?;
        self.soma = Some(soma);
        Ok(())
    }

    // --- Accessors ---

    pub fn id(&self) -> i64 {
        self.skeleton_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn soma(&self) -> Option<i64> {
        self.soma
    }

    pub fn root(&self) -> Option<i64> {
        self.root.map(|idx| self.graph[idx].node_id)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, node_id: i64) -> bool {
        self.id_index.contains_key(&node_id)
    }

    pub fn node(&self, node_id: i64) -> Option<&TreeNode> {
        self.id_index.get(&node_id).map(|&idx| &self.graph[idx])
    }

    pub fn position(&self, node_id: i64) -> Option<Point> {
        self.node(node_id).map(TreeNode::position)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.graph.node_weights()
    }

    /// All node IDs, sorted.
    pub fn node_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.id_index.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Node table sorted by node ID.
    pub fn to_nodes(&self) -> Vec<TreeNode> {
        let mut nodes: Vec<TreeNode> = self.graph.node_weights().cloned().collect();
        nodes.sort_by_key(|n| n.node_id);
        nodes
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    /// Connectors at which this neuron receives input.
    pub fn postsynapses(&self) -> impl Iterator<Item = &Connector> {
        self.connectors
            .iter()
            .filter(|c| c.relation == Relation::Postsynaptic)
    }

    /// Connectors at which this neuron provides output.
    pub fn presynapses(&self) -> impl Iterator<Item = &Connector> {
        self.connectors
            .iter()
            .filter(|c| c.relation == Relation::Presynaptic)
    }

    // --- Topology ---

    fn index_of(&self, node_id: i64) -> Result<NodeIndex> {
        self.id_index
            .get(&node_id)
            .copied()
            .ok_or(PnError::UnknownNode {
                skeleton_id: self.skeleton_id,
                node_id,
            })
    }

    pub fn parent(&self, node_id: i64) -> Option<i64> {
        self.node(node_id).and_then(|n| n.parent_id)
    }

    /// Child node IDs, sorted.
    pub fn children(&self, node_id: i64) -> Vec<i64> {
        let Some(&idx) = self.id_index.get(&node_id) else {
            return Vec::new();
        };
        let mut children: Vec<i64> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|c| self.graph[c].node_id)
            .collect();
        children.sort_unstable();
        children
    }

    fn child_count(&self, idx: NodeIndex) -> usize {
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .count()
    }

    pub fn node_type(&self, node_id: i64) -> Option<NodeType> {
        let idx = *self.id_index.get(&node_id)?;
        if Some(idx) == self.root {
            return Some(NodeType::Root);
        }
        Some(match self.child_count(idx) {
            0 => NodeType::End,
            1 => NodeType::Regular,
            _ => NodeType::Branch,
        })
    }

    /// Non-root nodes with more than one child, sorted.
    pub fn branch_points(&self) -> Vec<i64> {
        self.sorted_ids_where(|idx| Some(idx) != self.root && self.child_count(idx) > 1)
    }

    /// Nodes without children, sorted. A lone root counts as a leaf.
    pub fn leaves(&self) -> Vec<i64> {
        self.sorted_ids_where(|idx| self.child_count(idx) == 0)
    }

    fn sorted_ids_where(&self, pred: impl Fn(NodeIndex) -> bool) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .graph
            .node_indices()
            .filter(|&idx| pred(idx))
            .map(|idx| self.graph[idx].node_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    // --- Distances ---

    /// Total cable length.
    pub fn cable_length(&self) -> f64 {
        self.graph.edge_weights().sum()
    }

    /// Cable between pairs of nodes that are both in `nodes`.
    pub fn cable_within(&self, nodes: &HashSet<i64>) -> f64 {
        self.graph
            .edge_references()
            .filter(|e| {
                nodes.contains(&self.graph[e.source()].node_id)
                    && nodes.contains(&self.graph[e.target()].node_id)
            })
            .map(|e| *e.weight())
            .sum()
    }

    /// Distance of every node to the root along the tree.
    pub fn root_distances(&self) -> HashMap<i64, f64> {
        let mut dist = HashMap::with_capacity(self.len());
        let Some(root) = self.root else {
            return dist;
        };
        dist.insert(self.graph[root].node_id, 0.0);
        let mut bfs = Bfs::new(&self.graph, root);
        while let Some(idx) = bfs.next(&self.graph) {
            let base = dist[&self.graph[idx].node_id];
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                dist.insert(self.graph[edge.target()].node_id, base + edge.weight());
            }
        }
        dist
    }

    /// Node IDs from `node_id` up to and including the root.
    pub fn path_to_root(&self, node_id: i64) -> Result<Vec<i64>> {
        let mut idx = self.index_of(node_id)?;
        let mut path = vec![node_id];
        while let Some(parent) = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
        {
            path.push(self.graph[parent].node_id);
            idx = parent;
        }
        Ok(path)
    }

    /// Node IDs from the root down to `node_id`.
    pub fn neurite_to(&self, node_id: i64) -> Result<Vec<i64>> {
        let mut path = self.path_to_root(node_id)?;
        path.reverse();
        Ok(path)
    }

    pub fn distance_to_root(&self, node_id: i64) -> Result<f64> {
        let mut idx = self.index_of(node_id)?;
        let mut total = 0.0;
        while let Some(edge) = self.graph.edges_directed(idx, Direction::Incoming).next() {
            total += edge.weight();
            idx = edge.source();
        }
        Ok(total)
    }

    /// Distance between two nodes along the tree.
    pub fn dist_between(&self, a: i64, b: i64) -> Result<f64> {
        let mut ancestors: HashMap<NodeIndex, f64> = HashMap::new();
        let mut idx = self.index_of(a)?;
        let mut acc = 0.0;
        ancestors.insert(idx, acc);
        while let Some(edge) = self.graph.edges_directed(idx, Direction::Incoming).next() {
            acc += edge.weight();
            idx = edge.source();
            ancestors.insert(idx, acc);
        }

        let mut idx = self.index_of(b)?;
        let mut acc = 0.0;
        loop {
            if let Some(up) = ancestors.get(&idx) {
                return Ok(acc + up);
            }
            let Some(edge) = self.graph.edges_directed(idx, Direction::Incoming).next() else {
                return Err(PnError::InvalidSkeleton {
                    skeleton_id: self.skeleton_id,
                    reason: format!("nodes {a} and {b} share no ancestor"),
                });
            };
            acc += edge.weight();
            idx = edge.source();
        }
    }

    /// Leaves ordered by distance to root, farthest first; ties go to the
    /// smaller node ID.
    pub fn leaves_by_distance(&self) -> Vec<(i64, f64)> {
        let dist = self.root_distances();
        let mut leaves: Vec<(i64, f64)> = self
            .leaves()
            .into_iter()
            .map(|id| (id, dist.get(&id).copied().unwrap_or(0.0)))
            .collect();
        leaves.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        leaves
    }

    /// The longest root-to-leaf path, root first. Empty for an empty skeleton.
    pub fn longest_neurite(&self) -> Vec<i64> {
        match self.leaves_by_distance().first() {
            Some(&(leaf, _)) => self.neurite_to(leaf).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    // --- Transformations ---

    /// Reroot the tree at `new_root`, flipping the parent links on the path
    /// between the old and the new root.
    pub fn reroot(&mut self, new_root: i64) -> Result<()> {
        let start = self.index_of(new_root)?;
        if Some(start) == self.root {
            return Ok(());
        }

        let mut new_parent: HashMap<i64, Option<i64>> = HashMap::with_capacity(self.len());
        new_parent.insert(new_root, None);
        let mut queue = VecDeque::from([start]);
        while let Some(idx) = queue.pop_front() {
            let node_id = self.graph[idx].node_id;
            for nb in self.graph.neighbors_undirected(idx) {
                let nb_id = self.graph[nb].node_id;
                if !new_parent.contains_key(&nb_id) {
                    new_parent.insert(nb_id, Some(node_id));
                    queue.push_back(nb);
                }
            }
        }

        let nodes = self
            .to_nodes()
            .into_iter()
            .map(|mut n| {
                n.parent_id = new_parent.get(&n.node_id).copied().flatten();
                n
            })
            .collect();
        let rebuilt = Skeleton::from_nodes(self.skeleton_id, nodes)?;
        self.graph = rebuilt.graph;
        self.id_index = rebuilt.id_index;
        self.root = rebuilt.root;
        Ok(())
    }

    /// Nodes whose position lies inside `volume`.
    pub fn nodes_within(&self, volume: &Volume) -> HashSet<i64> {
        self.graph
            .node_weights()
            .filter(|n| volume.contains(&n.position()))
            .map(|n| n.node_id)
            .collect()
    }

    /// Smallest connected set of nodes containing every node in `nodes`.
    pub fn connected_closure(&self, nodes: &HashSet<i64>) -> HashSet<i64> {
        let mut closure: HashSet<i64> = HashSet::new();
        for &node_id in nodes {
            let Ok(path) = self.path_to_root(node_id) else {
                continue;
            };
            for id in path {
                if !closure.insert(id) {
                    break;
                }
            }
        }

        // Trim the stem between the root and the lowest common ancestor.
        let mut current = self.root();
        while let Some(id) = current {
            if nodes.contains(&id) {
                break;
            }
            let in_closure: Vec<i64> = self
                .children(id)
                .into_iter()
                .filter(|c| closure.contains(c))
                .collect();
            if in_closure.len() != 1 {
                break;
            }
            closure.remove(&id);
            current = in_closure.first().copied();
        }
        closure
    }

    /// Keep only `keep`, splitting into fragments where the kept nodes are
    /// disconnected. Each fragment is rooted at the kept node whose parent was
    /// removed; fragments come largest first, then by root ID.
    pub fn subset(&self, keep: &HashSet<i64>) -> Result<Vec<Skeleton>> {
        let mut fragment_roots = Vec::new();
        for id in self.node_ids() {
            if !keep.contains(&id) {
                continue;
            }
            match self.parent(id) {
                Some(p) if keep.contains(&p) => {}
                _ => fragment_roots.push(id),
            }
        }

        let mut fragments = Vec::with_capacity(fragment_roots.len());
        for root_id in fragment_roots {
            let mut nodes = Vec::new();
            let mut members = HashSet::new();
            let mut queue = VecDeque::from([root_id]);
            while let Some(id) = queue.pop_front() {
                let Some(node) = self.node(id) else {
                    continue;
                };
                let mut node = node.clone();
                if id == root_id {
                    node.parent_id = None;
                }
                nodes.push(node);
                members.insert(id);
                queue.extend(self.children(id).into_iter().filter(|c| keep.contains(c)));
            }

            let mut fragment = Skeleton::from_nodes(self.skeleton_id, nodes)?;
            fragment.name = self.name.clone();
            fragment.soma = self.soma.filter(|s| members.contains(s));
            fragment.connectors = self
                .connectors
                .iter()
                .filter(|c| members.contains(&c.node_id))
                .cloned()
                .collect();
            fragments.push(fragment);
        }

        fragments.sort_by(|a, b| b.len().cmp(&a.len()).then(a.root().cmp(&b.root())));
        Ok(fragments)
    }
}

/// Outcome of a pruning operation: one tree, or the fragments left behind
/// when pruning disconnected it.
#[derive(Debug, Clone)]
pub enum Pruned {
    Skeleton(Skeleton),
    Fragments(Vec<Skeleton>),
}

impl Pruned {
    /// Wrap the output of [`Skeleton::subset`]; no fragments gives an empty
    /// skeleton shaped like `original`.
    pub fn from_fragments(original: &Skeleton, mut fragments: Vec<Skeleton>) -> Self {
        match fragments.len() {
            0 => Pruned::Skeleton(original.empty_like()),
            1 => Pruned::Skeleton(fragments.remove(0)),
            _ => Pruned::Fragments(fragments),
        }
    }

    pub fn fragments(&self) -> &[Skeleton] {
        match self {
            Pruned::Skeleton(s) => std::slice::from_ref(s),
            Pruned::Fragments(f) => f,
        }
    }

    pub fn is_fragmented(&self) -> bool {
        matches!(self, Pruned::Fragments(_))
    }

    pub fn node_count(&self) -> usize {
        self.fragments().iter().map(Skeleton::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    pub fn node_ids(&self) -> BTreeSet<i64> {
        self.fragments()
            .iter()
            .flat_map(|s| s.node_ids())
            .collect()
    }

    pub fn cable_length(&self) -> f64 {
        self.fragments().iter().map(Skeleton::cable_length).sum()
    }
}
