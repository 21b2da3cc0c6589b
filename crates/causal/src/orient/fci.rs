//! FCI propagation over circle marks.
//!
//! Each rule only turns a circle into an arrow or a tail, and the setters below
//! refuse anything else, so every loop here stops after at most one change per
//! mark.

use std::collections::{BTreeSet, VecDeque};

use crate::cancel::CancelToken;
use crate::graph::{Endpoint, Graph, NodeId};
use crate::knowledge::BoundKnowledge;
use crate::sepset::SepsetProducer;

use super::{pag_arrowhead_allowed, OrientCfg};

use Endpoint::{Arrow, Circle, Tail};

pub(super) struct FciRules<'a> {
    pub k: &'a BoundKnowledge,
    pub sepsets: &'a dyn SepsetProducer,
    pub cfg: &'a OrientCfg,
    pub cancel: &'a CancelToken,
}

impl FciRules<'_> {
    /// Run every enabled rule until none applies. Returns the number of marks
    /// changed and whether cancellation cut the run short.
    pub fn final_orientation(&self, g: &mut Graph) -> (usize, bool) {
        let mut total = 0;
        loop {
            if self.cancel.is_cancelled() {
                return (total, true);
            }
            let mut changed = self.r1_to_r3(g);
            if self.cfg.discriminating_path_rule {
                let (n, stopped) = self.discriminating_paths(g);
                changed += n;
                if stopped {
                    return (total + changed, true);
                }
            }
            if self.cfg.complete_rule_set {
                changed += self.r5(g);
                changed += self.r6_r7(g);
                changed += self.r8(g);
                changed += self.r9(g);
                changed += self.r10(g);
            }
            total += changed;
            if changed == 0 {
                return (total, false);
            }
        }
    }

    fn limit(&self) -> Option<usize> {
        usize::try_from(self.cfg.max_path_length).ok()
    }

    fn log(&self, g: &Graph, rule: &'static str, x: NodeId, y: NodeId) {
        if let Some(e) = g.edge(x, y) {
            step!(self.cfg.verbose, rule, edge = %g.edge_string(&e), "fci");
        }
    }

    /// Arrowhead at `y` on `x - y`, only over a circle.
    fn set_arrow(&self, g: &mut Graph, x: NodeId, y: NodeId) -> bool {
        if g.endpoint(x, y) != Some(Circle) || !pag_arrowhead_allowed(g, self.k, x, y) {
            return false;
        }
        g.set_endpoint(x, y, Arrow).is_ok()
    }

    /// Tail at `y` on `x - y`, only over a circle. Refused when it would make
    /// `y --> x` against the knowledge.
    fn set_tail(&self, g: &mut Graph, x: NodeId, y: NodeId) -> bool {
        if g.endpoint(x, y) != Some(Circle) {
            return false;
        }
        if g.endpoint(y, x) == Some(Arrow) && (self.k.is_forbidden(y, x) || self.k.is_required(x, y))
        {
            return false;
        }
        g.set_endpoint(x, y, Tail).is_ok()
    }

    /// Turn `x o-* y` into `x --> y` when the knowledge allows it and the mark
    /// at `y` is not a tail.
    fn set_directed(&self, g: &mut Graph, x: NodeId, y: NodeId) -> bool {
        if g.endpoint(y, x) != Some(Circle) || g.endpoint(x, y) == Some(Tail) {
            return false;
        }
        if self.k.is_forbidden(x, y) || self.k.is_required(y, x) {
            return false;
        }
        let arrow = g.endpoint(x, y) == Some(Arrow) || g.set_endpoint(x, y, Arrow).is_ok();
        arrow && g.set_endpoint(y, x, Tail).is_ok()
    }

    fn r1_to_r3(&self, g: &mut Graph) -> usize {
        let mut total = 0;
        loop {
            let n = self.r1(g) + self.r2(g) + self.r3(g);
            total += n;
            if n == 0 {
                return total;
            }
        }
    }

    /// `a *-> b o-* c`, `a` and `c` non-adjacent: `b --> c`.
    fn r1(&self, g: &mut Graph) -> usize {
        let mut n = 0;
        for b in g.node_ids().collect::<Vec<_>>() {
            let adj = g.adjacent(b);
            for &a in &adj {
                if g.endpoint(a, b) != Some(Arrow) {
                    continue;
                }
                for &c in &adj {
                    if c == a || g.is_adjacent(a, c) || g.endpoint(c, b) != Some(Circle) {
                        continue;
                    }
                    if self.set_directed(g, b, c) {
                        self.log(g, "R1", b, c);
                        n += 1;
                    }
                }
            }
        }
        n
    }

    /// `a --> b *-> c` or `a *-> b --> c`, with `a *-o c`: `a *-> c`.
    fn r2(&self, g: &mut Graph) -> usize {
        let mut n = 0;
        for a in g.node_ids().collect::<Vec<_>>() {
            for c in g.adjacent(a) {
                if g.endpoint(a, c) != Some(Circle) {
                    continue;
                }
                let through = g.adjacent(a).into_iter().any(|b| {
                    b != c
                        && g.is_adjacent(b, c)
                        && ((g.is_directed(a, b) && g.endpoint(b, c) == Some(Arrow))
                            || (g.endpoint(a, b) == Some(Arrow) && g.is_directed(b, c)))
                });
                if through && self.set_arrow(g, a, c) {
                    self.log(g, "R2", a, c);
                    n += 1;
                }
            }
        }
        n
    }

    /// `a *-> b <-* c`, `a *-o d o-* c`, `a` and `c` non-adjacent, `d *-o b`:
    /// `d *-> b`.
    fn r3(&self, g: &mut Graph) -> usize {
        let mut n = 0;
        for b in g.node_ids().collect::<Vec<_>>() {
            let adj = g.adjacent(b);
            for &d in &adj {
                if g.endpoint(d, b) != Some(Circle) {
                    continue;
                }
                let into_b: Vec<NodeId> = adj
                    .iter()
                    .copied()
                    .filter(|&a| {
                        a != d
                            && g.endpoint(a, b) == Some(Arrow)
                            && g.endpoint(a, d) == Some(Circle)
                    })
                    .collect();
                let found = into_b.iter().enumerate().any(|(i, &a)| {
                    into_b[i + 1..].iter().any(|&c| !g.is_adjacent(a, c))
                });
                if found && self.set_arrow(g, d, b) {
                    self.log(g, "R3", d, b);
                    n += 1;
                }
            }
        }
        n
    }

    /// Zhang's R4: for each `b o-* c` with some `a <-* b` and `a --> c`, look
    /// for a discriminating path back from `a` and settle `<a, b, c>`.
    fn discriminating_paths(&self, g: &mut Graph) -> (usize, bool) {
        let mut n = 0;
        if self.limit().is_some_and(|l| l < 3) {
            return (0, false);
        }
        for b in g.node_ids().collect::<Vec<_>>() {
            if self.cancel.is_cancelled() {
                return (n, true);
            }
            let adj = g.adjacent(b);
            for &c in &adj {
                for &a in &adj {
                    if g.endpoint(c, b) != Some(Circle) {
                        break;
                    }
                    if a == c || !g.is_adjacent(a, c) {
                        continue;
                    }
                    if g.endpoint(b, a) != Some(Arrow) || !g.is_directed(a, c) {
                        continue;
                    }
                    if let Some(theta) = self.discriminating_start(g, a, b, c) {
                        n += self.orient_discriminated(g, theta, a, b, c);
                    }
                }
            }
        }
        (n, false)
    }

    /// Breadth-first walk back from `a` through colliders that are parents
    /// of `c`. Returns the first node reached that is not adjacent to `c`.
    fn discriminating_start(&self, g: &Graph, a: NodeId, b: NodeId, c: NodeId) -> Option<NodeId> {
        let limit = self.limit();
        let mut seen: BTreeSet<NodeId> = [a, b, c].into_iter().collect();
        // (node, nodes from `a` to it inclusive)
        let mut queue = VecDeque::from([(a, 1usize)]);
        while let Some((t, len)) = queue.pop_front() {
            for d in g.adjacent(t) {
                if seen.contains(&d) || g.endpoint(d, t) != Some(Arrow) {
                    continue;
                }
                // Edges on <d, ..., a, b, c>.
                if limit.is_some_and(|l| len + 2 > l) {
                    continue;
                }
                if !g.is_adjacent(d, c) {
                    return Some(d);
                }
                if g.is_directed(d, c) && g.endpoint(t, d) == Some(Arrow) {
                    seen.insert(d);
                    queue.push_back((d, len + 1));
                }
            }
        }
        None
    }

    fn orient_discriminated(&self, g: &mut Graph, theta: NodeId, a: NodeId, b: NodeId, c: NodeId) -> usize {
        let Some(sepset) = self.sepsets.sepset(theta, c) else {
            tracing::debug!(
                theta = g.name(theta),
                c = g.name(c),
                "no sepset for discriminating path"
            );
            return 0;
        };
        let mut n = 0;
        if sepset.contains(&b) {
            if self.set_tail(g, c, b) {
                n += 1;
                if self.set_arrow(g, b, c) {
                    n += 1;
                }
            }
        } else {
            if self.set_arrow(g, a, b) {
                n += 1;
            }
            if self.set_arrow(g, c, b) {
                n += 1;
            }
        }
        if n > 0 {
            self.log(g, "R4", b, c);
        }
        n
    }

    /// `a o-o b` closed by an uncovered circle path `<a, c, ..., d, b>` with
    /// `a`, `d` and `b`, `c` non-adjacent: every edge involved becomes `---`.
    fn r5(&self, g: &mut Graph) -> usize {
        let mut n = 0;
        for e in g.edges() {
            let (a, b) = (e.a, e.b);
            if !is_circle_edge(g, a, b) {
                continue;
            }
            let Some(path) = self.uncovered_circle_path(g, a, b) else {
                continue;
            };
            for (u, v) in path.windows(2).map(|w| (w[0], w[1])).chain([(a, b)]) {
                n += usize::from(self.set_tail(g, u, v));
                n += usize::from(self.set_tail(g, v, u));
            }
            self.log(g, "R5", a, b);
        }
        n
    }

    fn uncovered_circle_path(&self, g: &Graph, a: NodeId, b: NodeId) -> Option<Vec<NodeId>> {
        for c in g.adjacent(a) {
            if c == b || g.is_adjacent(c, b) || !is_circle_edge(g, a, c) {
                continue;
            }
            let mut path = vec![a, c];
            if extend_uncovered(
                g,
                &mut path,
                b,
                self.limit(),
                &|u, v| is_circle_edge(g, u, v),
                &|p: &[NodeId]| !g.is_adjacent(p[p.len() - 2], a),
            ) {
                return Some(path);
            }
        }
        None
    }

    /// R6: `a --- b o-* c` gives `b --* c`. R7: `a --o b o-* c` with `a`, `c`
    /// non-adjacent gives `b --* c`.
    fn r6_r7(&self, g: &mut Graph) -> usize {
        let mut n = 0;
        for b in g.node_ids().collect::<Vec<_>>() {
            let adj = g.adjacent(b);
            for &c in &adj {
                for &a in &adj {
                    if g.endpoint(c, b) != Some(Circle) {
                        break;
                    }
                    if a == c || g.endpoint(b, a) != Some(Tail) {
                        continue;
                    }
                    let rule = match g.endpoint(a, b) {
                        Some(Tail) => "R6",
                        Some(Circle) if !g.is_adjacent(a, c) => "R7",
                        _ => continue,
                    };
                    if self.set_tail(g, c, b) {
                        self.log(g, rule, b, c);
                        n += 1;
                    }
                }
            }
        }
        n
    }

    /// Every `a o-> c`, i.e. the candidates for R8–R10.
    fn partially_directed(g: &Graph) -> Vec<(NodeId, NodeId)> {
        let mut out = Vec::new();
        for e in g.edges() {
            for (a, c) in [(e.a, e.b), (e.b, e.a)] {
                if g.endpoint(c, a) == Some(Circle) && g.endpoint(a, c) == Some(Arrow) {
                    out.push((a, c));
                }
            }
        }
        out
    }

    /// `a --> b --> c` or `a --o b --> c`, with `a o-> c`: `a --> c`.
    fn r8(&self, g: &mut Graph) -> usize {
        let mut n = 0;
        for (a, c) in Self::partially_directed(g) {
            let through = g.adjacent(a).into_iter().any(|b| {
                b != c
                    && g.endpoint(b, a) == Some(Tail)
                    && matches!(g.endpoint(a, b), Some(Arrow) | Some(Circle))
                    && g.is_directed(b, c)
            });
            if through && self.set_directed(g, a, c) {
                self.log(g, "R8", a, c);
                n += 1;
            }
        }
        n
    }

    /// `a o-> c` with an uncovered potentially directed path `<a, b, ..., c>`,
    /// `b` and `c` non-adjacent: `a --> c`.
    fn r9(&self, g: &mut Graph) -> usize {
        let mut n = 0;
        for (a, c) in Self::partially_directed(g) {
            if self.r9_applies(g, a, c) && self.set_directed(g, a, c) {
                self.log(g, "R9", a, c);
                n += 1;
            }
        }
        n
    }

    fn r9_applies(&self, g: &Graph, a: NodeId, c: NodeId) -> bool {
        g.adjacent(a).into_iter().any(|b| {
            if b == c || g.is_adjacent(b, c) || !potentially_directed(g, a, b) {
                return false;
            }
            let mut path = vec![a, b];
            extend_uncovered(
                g,
                &mut path,
                c,
                self.limit(),
                &|u, v| potentially_directed(g, u, v),
                &|_: &[NodeId]| true,
            )
        })
    }

    /// `a o-> c <-- b`, `c <-- d`, with uncovered potentially directed paths
    /// from `a` to `b` and to `d` whose first steps are distinct and
    /// non-adjacent: `a --> c`.
    fn r10(&self, g: &mut Graph) -> usize {
        let mut n = 0;
        for (a, c) in Self::partially_directed(g) {
            if self.r10_applies(g, a, c) && self.set_directed(g, a, c) {
                self.log(g, "R10", a, c);
                n += 1;
            }
        }
        n
    }

    fn r10_applies(&self, g: &Graph, a: NodeId, c: NodeId) -> bool {
        let parents: Vec<NodeId> = g.parents(c).into_iter().filter(|&p| p != a).collect();
        if parents.len() < 2 {
            return false;
        }
        let firsts: Vec<BTreeSet<NodeId>> =
            parents.iter().map(|&p| self.first_steps(g, a, p, c)).collect();
        for i in 0..firsts.len() {
            for j in i + 1..firsts.len() {
                for &mu in &firsts[i] {
                    if firsts[j].iter().any(|&om| om != mu && !g.is_adjacent(mu, om)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Second nodes of the uncovered potentially directed paths from `a` to
    /// `target` that avoid `c`.
    fn first_steps(&self, g: &Graph, a: NodeId, target: NodeId, c: NodeId) -> BTreeSet<NodeId> {
        let mut out = BTreeSet::new();
        for mu in g.adjacent(a) {
            if mu == c || !potentially_directed(g, a, mu) {
                continue;
            }
            if mu == target {
                out.insert(mu);
                continue;
            }
            let mut path = vec![a, mu];
            if extend_uncovered(
                g,
                &mut path,
                target,
                self.limit(),
                &|u, v| v != c && potentially_directed(g, u, v),
                &|_: &[NodeId]| true,
            ) {
                out.insert(mu);
            }
        }
        out
    }
}

fn is_circle_edge(g: &Graph, u: NodeId, v: NodeId) -> bool {
    g.endpoint(u, v) == Some(Circle) && g.endpoint(v, u) == Some(Circle)
}

/// `u *-* v` can still be read as `u --> v`: no arrowhead at `u`, no tail at
/// `v`.
fn potentially_directed(g: &Graph, u: NodeId, v: NodeId) -> bool {
    matches!(g.endpoint(v, u), Some(Tail) | Some(Circle))
        && matches!(g.endpoint(u, v), Some(Arrow) | Some(Circle))
}

/// Depth-first extension of `path` to an uncovered path ending at `target`
/// whose every edge passes `step` and which `accept` approves. On success
/// `path` holds the whole path. `limit` bounds the number of edges.
fn extend_uncovered(
    g: &Graph,
    path: &mut Vec<NodeId>,
    target: NodeId,
    limit: Option<usize>,
    step: &dyn Fn(NodeId, NodeId) -> bool,
    accept: &dyn Fn(&[NodeId]) -> bool,
) -> bool {
    let Some(&last) = path.last() else {
        return false;
    };
    if limit.is_some_and(|l| path.len() > l) {
        return false;
    }
    for v in g.adjacent(last) {
        if path.contains(&v) || !step(last, v) {
            continue;
        }
        if path.len() >= 2 && g.is_adjacent(path[path.len() - 2], v) {
            continue;
        }
        path.push(v);
        if v == target {
            if accept(path) {
                return true;
            }
        } else if extend_uncovered(g, path, target, limit, step, accept) {
            return true;
        }
        path.pop();
    }
    false
}
