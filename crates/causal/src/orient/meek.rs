//! Meek's rules R1–R4 on partially directed graphs.

use crate::graph::{Endpoint, Graph, NodeId};
use crate::knowledge::BoundKnowledge;

/// Fixed-point propagation of Meek's rules over undirected edges.
///
/// With `revert_to_unshielded_colliders`, every directed edge that is not part
/// of an unshielded collider (and not required) is first made undirected, which
/// turns a DAG into its CPDAG.
pub struct MeekRules<'k> {
    k: &'k BoundKnowledge,
    revert: bool,
    verbose: bool,
}

impl<'k> MeekRules<'k> {
    pub fn new(k: &'k BoundKnowledge) -> Self {
        Self {
            k,
            revert: false,
            verbose: false,
        }
    }

    pub fn revert_to_unshielded_colliders(mut self, yes: bool) -> Self {
        self.revert = yes;
        self
    }

    pub fn verbose(mut self, yes: bool) -> Self {
        self.verbose = yes;
        self
    }

    /// Apply the rules until a full pass changes nothing. Returns the number of
    /// edges oriented.
    pub fn propagate(&self, g: &mut Graph) -> usize {
        if self.revert {
            self.revert(g);
        }
        let mut oriented = self.orient_by_knowledge(g);
        loop {
            let mut changed = false;
            for e in g.edges() {
                if !g.is_undirected(e.a, e.b) {
                    continue;
                }
                for (a, b) in [(e.a, e.b), (e.b, e.a)] {
                    if let Some(rule) = self.implied(g, a, b) {
                        if self.may_orient(a, b) {
                            let _ = g.orient_directed(a, b);
                            step!(self.verbose, rule, from = g.name(a), to = g.name(b), "meek");
                            oriented += 1;
                            changed = true;
                            break;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        oriented
    }

    fn may_orient(&self, a: NodeId, b: NodeId) -> bool {
        !self.k.is_forbidden(a, b) && !self.k.is_required(b, a)
    }

    /// Which rule, if any, forces the undirected `a --- b` into `a --> b`.
    fn implied(&self, g: &Graph, a: NodeId, b: NodeId) -> Option<&'static str> {
        let adj_a = g.adjacent(a);
        // R1: c --> a --- b, c and b non-adjacent.
        if adj_a
            .iter()
            .any(|&c| c != b && g.is_directed(c, a) && !g.is_adjacent(c, b))
        {
            return Some("R1");
        }
        // R2: a --> c --> b.
        if adj_a
            .iter()
            .any(|&c| c != b && g.is_directed(a, c) && g.is_directed(c, b))
        {
            return Some("R2");
        }
        let und: Vec<NodeId> = adj_a
            .iter()
            .copied()
            .filter(|&c| c != b && g.is_undirected(a, c))
            .collect();
        // R3: a --- c --> b, a --- d --> b, c and d non-adjacent.
        let into_b: Vec<NodeId> = und.iter().copied().filter(|&c| g.is_directed(c, b)).collect();
        for (i, &c) in into_b.iter().enumerate() {
            if into_b[i + 1..].iter().any(|&d| !g.is_adjacent(c, d)) {
                return Some("R3");
            }
        }
        // R4: a --- c --> d --> b, a adjacent to d, c and b non-adjacent.
        for &c in &und {
            if g.is_adjacent(c, b) {
                continue;
            }
            for d in g.children(c) {
                if d != a && d != b && g.is_directed(d, b) && g.is_adjacent(a, d) {
                    return Some("R4");
                }
            }
        }
        None
    }

    fn revert(&self, g: &mut Graph) {
        let mut undo = Vec::new();
        for e in g.edges() {
            let (x, y) = if g.is_directed(e.a, e.b) {
                (e.a, e.b)
            } else if g.is_directed(e.b, e.a) {
                (e.b, e.a)
            } else {
                continue;
            };
            let in_collider = g
                .parents(y)
                .into_iter()
                .any(|z| z != x && !g.is_adjacent(x, z));
            if !in_collider && !self.k.is_required(x, y) {
                undo.push((x, y));
            }
        }
        for (x, y) in undo {
            let _ = g.set_endpoint(x, y, Endpoint::Tail);
        }
    }

    fn orient_by_knowledge(&self, g: &mut Graph) -> usize {
        if self.k.is_empty() {
            return 0;
        }
        let mut n = 0;
        for e in g.edges() {
            if !g.is_undirected(e.a, e.b) {
                continue;
            }
            for (a, b) in [(e.a, e.b), (e.b, e.a)] {
                let forced = self.k.is_required(a, b) || self.k.is_forbidden(b, a);
                if forced && self.may_orient(a, b) {
                    let _ = g.orient_directed(a, b);
                    n += 1;
                    break;
                }
            }
        }
        n
    }
}
