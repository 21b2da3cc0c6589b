//! Backward equivalence search over a CPDAG.
//!
//! Repeatedly applies the single best score-improving edge deletion
//! (Chickering 2002, "Optimal structure identification with greedy search",
//! the Delete operator) and re-completes the graph to a CPDAG.

use crate::choice::{pick, DepthChoices};
use crate::graph::{Endpoint, Graph, NodeId};
use crate::knowledge::BoundKnowledge;
use crate::oracle::{diff_or_neg_inf, Score};
use crate::orient::MeekRules;

struct Deletion {
    x: NodeId,
    y: NodeId,
    h: Vec<NodeId>,
    gain: f64,
}

/// Delete edges from the CPDAG `g` while some deletion strictly improves the
/// score. `depth` bounds the size of the subset `H`; −1 = unbounded.
/// Returns the number of deletions.
pub(crate) fn backward(
    score: &dyn Score,
    k: &BoundKnowledge,
    g: &mut Graph,
    depth: i32,
    verbose: bool,
) -> usize {
    let mut deleted = 0;
    while let Some(d) = best_deletion(score, k, g, depth) {
        g.remove_edge(d.x, d.y);
        for &h in &d.h {
            if g.is_undirected(d.y, h) {
                let _ = g.orient_directed(d.y, h);
            }
            if g.is_undirected(d.x, h) {
                let _ = g.orient_directed(d.x, h);
            }
        }
        step!(
            verbose,
            x = g.name(d.x),
            y = g.name(d.y),
            h = ?d.h.iter().map(|v| g.name(*v)).collect::<Vec<_>>(),
            gain = d.gain,
            "bes delete"
        );
        MeekRules::new(k)
            .revert_to_unshielded_colliders(true)
            .propagate(g);
        deleted += 1;
    }
    deleted
}

fn best_deletion(score: &dyn Score, k: &BoundKnowledge, g: &Graph, depth: i32) -> Option<Deletion> {
    let mut best: Option<Deletion> = None;
    for e in g.edges() {
        if !k.no_edge_required(e.a, e.b) {
            continue;
        }
        let pairs = match (e.at_a, e.at_b) {
            (Endpoint::Tail, Endpoint::Arrow) => vec![(e.a, e.b)],
            (Endpoint::Arrow, Endpoint::Tail) => vec![(e.b, e.a)],
            (Endpoint::Tail, Endpoint::Tail) => vec![(e.a, e.b), (e.b, e.a)],
            _ => Vec::new(),
        };
        for (x, y) in pairs {
            // Undirected neighbours of y adjacent to x.
            let na_yx: Vec<NodeId> = g
                .adjacent(y)
                .into_iter()
                .filter(|&h| h != x && g.is_undirected(y, h) && g.is_adjacent(h, x))
                .collect();
            let parents_y: Vec<NodeId> = g.parents(y).into_iter().filter(|&p| p != x).collect();
            for idx in DepthChoices::new(na_yx.len(), depth) {
                let h = pick(&na_yx, &idx);
                let rest: Vec<NodeId> = na_yx.iter().copied().filter(|n| !h.contains(n)).collect();
                if !is_clique(g, &rest) {
                    continue;
                }
                let mut cond = rest;
                cond.extend(parents_y.iter().copied());
                cond.sort_unstable();
                let d = diff_or_neg_inf(score, x, y, &cond);
                if !d.is_finite() {
                    continue;
                }
                let gain = -d;
                if gain > 0.0 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(Deletion { x, y, h, gain });
                }
            }
        }
    }
    best
}

fn is_clique(g: &Graph, nodes: &[NodeId]) -> bool {
    nodes
        .iter()
        .enumerate()
        .all(|(i, &a)| nodes[i + 1..].iter().all(|&b| g.is_adjacent(a, b)))
}
