//! Mixed graphs with per-side endpoint marks.
//!
//! Purpose
//! - One graph type serves every phase: the complete undirected start graph of
//!   FAS, the DAG implied by an order, the CPDAG after Meek propagation and the
//!   PAG produced by the FCI rules.
//!
//! Why this design
//! - Marks are stored per directed slot: `marks[x][y]` is the mark at `y` on the
//!   edge `x - y`. Both slots are written together, so an unordered pair never
//!   has more than one edge and endpoint edits are O(1).
//! - Every query that returns several nodes returns them sorted by index, which
//!   keeps the searches built on top deterministic regardless of hash order.
//! - No cycle checks on mutation; DAG-producing callers enforce acyclicity.
//!
//! References
//! - Zhang (2008), "On the completeness of orientation rules for causal
//!   discovery in the presence of latent confounders and selection bias".
//! - Code cross-refs: `paths` (ancestry, d-separation), `random` (test DAGs).

pub mod paths;
pub mod random;
mod record;
mod types;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::error::GraphError;

pub use record::{EdgeRecord, GraphRecord};
pub use types::{Edge, Endpoint, Node, NodeId, Triple, VarKind};

#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    marks: Vec<HashMap<NodeId, Endpoint>>,
    ambiguous: BTreeSet<Triple>,
    underlines: BTreeSet<Triple>,
}

impl PartialEq for Graph {
    /// Same node names in the same order, same edges with the same marks.
    /// Triple annotations are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.marks == other.marks
    }
}

impl Graph {
    /// Empty graph over `nodes`. Names must be unique.
    pub fn new(nodes: Vec<Node>) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, n) in nodes.iter().enumerate() {
            if index.insert(n.name.clone(), NodeId(i)).is_some() {
                return Err(GraphError::DuplicateNode(n.name.clone()));
            }
        }
        let marks = vec![HashMap::new(); nodes.len()];
        Ok(Self {
            nodes,
            index,
            marks,
            ambiguous: BTreeSet::new(),
            underlines: BTreeSet::new(),
        })
    }

    /// Empty graph over continuous variables named `names`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, GraphError> {
        Self::new(
            names
                .iter()
                .map(|s| Node::continuous(s.as_ref()))
                .collect(),
        )
    }

    /// Same nodes as `self`, no edges.
    pub fn empty_like(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            index: self.index.clone(),
            marks: vec![HashMap::new(); self.nodes.len()],
            ambiguous: BTreeSet::new(),
            underlines: BTreeSet::new(),
        }
    }

    /// Complete undirected graph over `nodes`.
    pub fn complete(nodes: Vec<Node>) -> Result<Self, GraphError> {
        let mut g = Self::new(nodes)?;
        let n = g.num_nodes();
        for i in 0..n {
            for j in i + 1..n {
                g.put(NodeId(i), NodeId(j), Endpoint::Tail, Endpoint::Tail);
            }
        }
        Ok(g)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn require_id(&self, name: &str) -> Result<NodeId, GraphError> {
        self.id_of(name)
            .ok_or_else(|| GraphError::UnknownName(name.to_string()))
    }

    fn check(&self, id: NodeId) -> Result<(), GraphError> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(id.0))
        }
    }

    fn put(&mut self, x: NodeId, y: NodeId, at_x: Endpoint, at_y: Endpoint) {
        self.marks[x.0].insert(y, at_y);
        self.marks[y.0].insert(x, at_x);
    }

    /// Insert `x - y` with mark `at_x` at `x` and `at_y` at `y`.
    pub fn add_edge(
        &mut self,
        x: NodeId,
        y: NodeId,
        at_x: Endpoint,
        at_y: Endpoint,
    ) -> Result<(), GraphError> {
        self.check(x)?;
        self.check(y)?;
        if x == y {
            return Err(GraphError::SelfLoop(self.name(x).to_string()));
        }
        if self.is_adjacent(x, y) {
            return Err(GraphError::DuplicateEdge(
                self.name(x).to_string(),
                self.name(y).to_string(),
            ));
        }
        self.put(x, y, at_x, at_y);
        Ok(())
    }

    /// `x --> y`
    pub fn add_directed(&mut self, x: NodeId, y: NodeId) -> Result<(), GraphError> {
        self.add_edge(x, y, Endpoint::Tail, Endpoint::Arrow)
    }

    /// `x --- y`
    pub fn add_undirected(&mut self, x: NodeId, y: NodeId) -> Result<(), GraphError> {
        self.add_edge(x, y, Endpoint::Tail, Endpoint::Tail)
    }

    /// `x o-o y`
    pub fn add_nondirected(&mut self, x: NodeId, y: NodeId) -> Result<(), GraphError> {
        self.add_edge(x, y, Endpoint::Circle, Endpoint::Circle)
    }

    /// `x <-> y`
    pub fn add_bidirected(&mut self, x: NodeId, y: NodeId) -> Result<(), GraphError> {
        self.add_edge(x, y, Endpoint::Arrow, Endpoint::Arrow)
    }

    /// Remove `x - y`; returns whether an edge was present.
    pub fn remove_edge(&mut self, x: NodeId, y: NodeId) -> bool {
        if x.0 >= self.nodes.len() || y.0 >= self.nodes.len() {
            return false;
        }
        let had = self.marks[x.0].remove(&y).is_some();
        self.marks[y.0].remove(&x);
        had
    }

    pub fn remove_all_edges(&mut self) {
        for m in &mut self.marks {
            m.clear();
        }
        self.ambiguous.clear();
        self.underlines.clear();
    }

    #[inline]
    pub fn is_adjacent(&self, x: NodeId, y: NodeId) -> bool {
        self.marks
            .get(x.0)
            .map(|m| m.contains_key(&y))
            .unwrap_or(false)
    }

    /// Mark at `y` on the edge `x - y`.
    #[inline]
    pub fn endpoint(&self, x: NodeId, y: NodeId) -> Option<Endpoint> {
        self.marks.get(x.0).and_then(|m| m.get(&y).copied())
    }

    /// Set the mark at `y` on the existing edge `x - y`.
    pub fn set_endpoint(&mut self, x: NodeId, y: NodeId, e: Endpoint) -> Result<(), GraphError> {
        self.check(x)?;
        self.check(y)?;
        match self.marks[x.0].get_mut(&y) {
            Some(slot) => {
                *slot = e;
                Ok(())
            }
            None => Err(GraphError::MissingEdge(
                self.name(x).to_string(),
                self.name(y).to_string(),
            )),
        }
    }

    /// Replace `x - y` by `x --> y` (adding it if absent).
    pub fn orient_directed(&mut self, x: NodeId, y: NodeId) -> Result<(), GraphError> {
        self.check(x)?;
        self.check(y)?;
        if x == y {
            return Err(GraphError::SelfLoop(self.name(x).to_string()));
        }
        self.put(x, y, Endpoint::Tail, Endpoint::Arrow);
        Ok(())
    }

    /// Set every mark on every edge to `e`.
    pub fn reorient_all_with(&mut self, e: Endpoint) {
        for m in &mut self.marks {
            for v in m.values_mut() {
                *v = e;
            }
        }
    }

    /// Neighbours of `x`, sorted.
    pub fn adjacent(&self, x: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.marks[x.0].keys().copied().collect();
        out.sort_unstable();
        out
    }

    pub fn degree(&self, x: NodeId) -> usize {
        self.marks[x.0].len()
    }

    pub fn max_degree(&self) -> usize {
        self.marks.iter().map(|m| m.len()).max().unwrap_or(0)
    }

    pub fn edge(&self, x: NodeId, y: NodeId) -> Option<Edge> {
        let at_y = self.endpoint(x, y)?;
        let at_x = self.endpoint(y, x)?;
        Some(Edge::new(x, y, at_x, at_y))
    }

    /// All edges, sorted by `(a, b)`.
    pub fn edges(&self) -> Vec<Edge> {
        let mut out = Vec::new();
        for (i, m) in self.marks.iter().enumerate() {
            let x = NodeId(i);
            for (&y, &at_y) in m {
                if x < y {
                    let at_x = self.marks[y.0][&x];
                    out.push(Edge::new(x, y, at_x, at_y));
                }
            }
        }
        out.sort_unstable_by_key(|e| (e.a, e.b));
        out
    }

    pub fn num_edges(&self) -> usize {
        self.marks.iter().map(|m| m.len()).sum::<usize>() / 2
    }

    /// Neighbours `y` of `x` whose edge carries mark `e` at `x`.
    pub fn nodes_into(&self, x: NodeId, e: Endpoint) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.marks[x.0]
            .keys()
            .copied()
            .filter(|&y| self.endpoint(y, x) == Some(e))
            .collect();
        out.sort_unstable();
        out
    }

    /// `x --> y`
    #[inline]
    pub fn is_directed(&self, x: NodeId, y: NodeId) -> bool {
        self.endpoint(y, x) == Some(Endpoint::Tail) && self.endpoint(x, y) == Some(Endpoint::Arrow)
    }

    /// `x --- y`
    #[inline]
    pub fn is_undirected(&self, x: NodeId, y: NodeId) -> bool {
        self.endpoint(y, x) == Some(Endpoint::Tail) && self.endpoint(x, y) == Some(Endpoint::Tail)
    }

    /// `x <-> y`
    #[inline]
    pub fn is_bidirected(&self, x: NodeId, y: NodeId) -> bool {
        self.endpoint(y, x) == Some(Endpoint::Arrow) && self.endpoint(x, y) == Some(Endpoint::Arrow)
    }

    pub fn parents(&self, x: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.marks[x.0]
            .keys()
            .copied()
            .filter(|&p| self.is_directed(p, x))
            .collect();
        out.sort_unstable();
        out
    }

    pub fn children(&self, x: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.marks[x.0]
            .keys()
            .copied()
            .filter(|&c| self.is_directed(x, c))
            .collect();
        out.sort_unstable();
        out
    }

    /// `x *-> y <-* z`
    pub fn is_collider(&self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        self.endpoint(x, y) == Some(Endpoint::Arrow) && self.endpoint(z, y) == Some(Endpoint::Arrow)
    }

    /// Collider at `y` with `x` and `z` non-adjacent.
    pub fn is_def_collider(&self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        x != z && !self.is_adjacent(x, z) && self.is_collider(x, y, z)
    }

    /// `y` is known not to be a collider on `x - y - z`: an underline, or a tail at `y`.
    pub fn is_def_noncollider(&self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        if self.is_underline_triple(x, y, z) {
            return true;
        }
        self.endpoint(x, y) == Some(Endpoint::Tail) || self.endpoint(z, y) == Some(Endpoint::Tail)
    }

    fn valid_triple(&self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        x != z && self.is_adjacent(x, y) && self.is_adjacent(z, y)
    }

    /// Record `x - y - z` as ambiguous. Returns false (and records nothing) unless
    /// `x != z` and both ends are adjacent to `y`.
    pub fn add_ambiguous_triple(&mut self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        if !self.valid_triple(x, y, z) {
            return false;
        }
        self.ambiguous.insert(Triple::new(x, y, z));
        true
    }

    pub fn remove_ambiguous_triple(&mut self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        self.ambiguous.remove(&Triple::new(x, y, z))
    }

    pub fn is_ambiguous_triple(&self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        self.ambiguous.contains(&Triple::new(x, y, z))
    }

    pub fn ambiguous_triples(&self) -> impl Iterator<Item = &Triple> {
        self.ambiguous.iter()
    }

    /// Record `x - y - z` as a known non-collider (drawn underlined).
    pub fn add_underline_triple(&mut self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        if !self.valid_triple(x, y, z) {
            return false;
        }
        self.underlines.insert(Triple::new(x, y, z));
        true
    }

    pub fn remove_underline_triple(&mut self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        self.underlines.remove(&Triple::new(x, y, z))
    }

    pub fn is_underline_triple(&self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        self.underlines.contains(&Triple::new(x, y, z))
    }

    pub fn underline_triples(&self) -> impl Iterator<Item = &Triple> {
        self.underlines.iter()
    }

    pub fn clear_triples(&mut self) {
        self.ambiguous.clear();
        self.underlines.clear();
    }

    /// Drop triple annotations whose edges no longer exist.
    pub fn prune_triples(&mut self) {
        let stale: Vec<Triple> = self
            .ambiguous
            .iter()
            .chain(self.underlines.iter())
            .filter(|t| !self.valid_triple(t.x, t.y, t.z))
            .copied()
            .collect();
        for t in stale {
            self.ambiguous.remove(&t);
            self.underlines.remove(&t);
        }
    }

    /// Same adjacencies as `other`, ignoring marks.
    pub fn same_skeleton(&self, other: &Graph) -> bool {
        self.nodes == other.nodes
            && self
                .marks
                .iter()
                .zip(&other.marks)
                .all(|(a, b)| a.len() == b.len() && a.keys().all(|k| b.contains_key(k)))
    }

    /// `A --> B`, `A o-> B`, `A <-> B`, `A --- B`, `A o-o B`.
    /// An arrowhead on the left is flipped to the right for readability.
    pub fn edge_string(&self, e: &Edge) -> String {
        let (l, r, ml, mr) = if e.at_a == Endpoint::Arrow && e.at_b != Endpoint::Arrow {
            (e.b, e.a, e.at_b, e.at_a)
        } else {
            (e.a, e.b, e.at_a, e.at_b)
        };
        let left = match ml {
            Endpoint::Tail => '-',
            Endpoint::Arrow => '<',
            Endpoint::Circle => 'o',
        };
        let right = match mr {
            Endpoint::Tail => '-',
            Endpoint::Arrow => '>',
            Endpoint::Circle => 'o',
        };
        format!("{} {}-{} {}", self.name(l), left, right, self.name(r))
    }

    /// Display strings of all edges, sorted.
    pub fn edge_strings(&self) -> Vec<String> {
        let mut out: Vec<String> = self.edges().iter().map(|e| self.edge_string(e)).collect();
        out.sort();
        out
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.nodes.iter().map(|n| n.name.as_str()).collect();
        writeln!(f, "Graph Nodes:")?;
        writeln!(f, "{}", names.join(";"))?;
        writeln!(f)?;
        writeln!(f, "Graph Edges:")?;
        for (i, e) in self.edges().iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, self.edge_string(e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
