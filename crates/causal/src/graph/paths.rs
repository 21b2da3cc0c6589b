//! Path queries: ancestry, causal orders, d-separation, possible-d-sep.

use std::collections::{BTreeSet, HashSet, VecDeque};

use super::{Endpoint, Graph, NodeId};

/// Ancestors of `of` along directed edges, including `of` itself.
pub fn ancestors(g: &Graph, of: &[NodeId]) -> BTreeSet<NodeId> {
    let mut seen: BTreeSet<NodeId> = BTreeSet::new();
    let mut stack: Vec<NodeId> = of.to_vec();
    while let Some(n) = stack.pop() {
        if seen.insert(n) {
            stack.extend(g.parents(n));
        }
    }
    seen
}

/// Whether there is a directed path `a --> ... --> b` (or `a == b`).
pub fn is_ancestor_of(g: &Graph, a: NodeId, b: NodeId) -> bool {
    ancestors(g, &[b]).contains(&a)
}

/// Whether the directed part of `g` contains a cycle.
pub fn has_directed_cycle(g: &Graph) -> bool {
    let n = g.num_nodes();
    let mut indegree: Vec<usize> = (0..n).map(|i| g.parents(NodeId(i)).len()).collect();
    let mut queue: VecDeque<NodeId> = (0..n)
        .filter(|&i| indegree[i] == 0)
        .map(NodeId)
        .collect();
    let mut seen = 0;
    while let Some(x) = queue.pop_front() {
        seen += 1;
        for c in g.children(x) {
            indegree[c.0] -= 1;
            if indegree[c.0] == 0 {
                queue.push_back(c);
            }
        }
    }
    seen < n
}

/// Order of the nodes of `initial` in which every node comes after its parents.
///
/// Each pass walks `initial` left to right and appends every node whose parents
/// (restricted to `initial`) are already placed, so ties keep the initial order.
/// Nodes stuck on a directed cycle are appended in initial order at the end.
pub fn causal_order(g: &Graph, initial: &[NodeId]) -> Vec<NodeId> {
    let members: HashSet<NodeId> = initial.iter().copied().collect();
    let mut placed: HashSet<NodeId> = HashSet::with_capacity(initial.len());
    let mut order = Vec::with_capacity(initial.len());
    while order.len() < initial.len() {
        let before = order.len();
        for &x in initial {
            if placed.contains(&x) {
                continue;
            }
            let ready = g
                .parents(x)
                .iter()
                .all(|p| !members.contains(p) || placed.contains(p));
            if ready {
                placed.insert(x);
                order.push(x);
            }
        }
        if order.len() == before {
            for &x in initial {
                if placed.insert(x) {
                    order.push(x);
                }
            }
        }
    }
    order
}

/// A DAG with the skeleton and unshielded colliders of the partially directed
/// `g` (Dor and Tarsi, 1992), or `None` when `g` admits no such extension.
///
/// Repeatedly removes a sink whose undirected neighbours are adjacent to all
/// of its other neighbours and orients those undirected edges into it. The
/// lowest-indexed qualifying node goes first.
pub fn dag_extension(g: &Graph) -> Option<Graph> {
    let mut out = g.clone();
    let mut work = g.clone();
    let mut alive: BTreeSet<NodeId> = g.node_ids().collect();
    while !alive.is_empty() {
        let sink = alive.iter().copied().find(|&x| {
            if !work.children(x).is_empty() {
                return false;
            }
            let adj = work.adjacent(x);
            adj.iter()
                .filter(|&&y| work.is_undirected(x, y))
                .all(|&y| adj.iter().all(|&z| z == y || work.is_adjacent(y, z)))
        })?;
        for y in work.adjacent(sink) {
            if work.is_undirected(sink, y) {
                out.orient_directed(y, sink).ok()?;
            }
            work.remove_edge(sink, y);
        }
        alive.remove(&sink);
    }
    Some(out)
}

/// d-separation of `x` and `y` given `z` over the directed edges of `g`.
///
/// Reachability ("Bayes ball"): a trail may pass a non-collider outside `z`
/// and a collider with a descendant in `z`.
pub fn is_dseparated(g: &Graph, x: NodeId, y: NodeId, z: &[NodeId]) -> bool {
    if x == y {
        return false;
    }
    let zset: HashSet<NodeId> = z.iter().copied().collect();
    if zset.contains(&x) || zset.contains(&y) {
        return true;
    }
    let anc_z = ancestors(g, z);
    // `true` = arriving from a child (moving up), `false` = arriving from a parent.
    let mut visited: HashSet<(NodeId, bool)> = HashSet::new();
    let mut stack = vec![(x, true)];
    while let Some((n, up)) = stack.pop() {
        if !visited.insert((n, up)) {
            continue;
        }
        if n == y {
            return false;
        }
        let blocked = zset.contains(&n);
        if up {
            if !blocked {
                stack.extend(g.parents(n).into_iter().map(|p| (p, true)));
                stack.extend(g.children(n).into_iter().map(|c| (c, false)));
            }
        } else {
            if !blocked {
                stack.extend(g.children(n).into_iter().map(|c| (c, false)));
            }
            if anc_z.contains(&n) {
                stack.extend(g.parents(n).into_iter().map(|p| (p, true)));
            }
        }
    }
    true
}

/// Possible-d-sep set of `x` (excluding `y`): nodes reachable from `x` by a path
/// on which every inner node is a collider or sits in a triangle.
/// `max_path_length` counts edges; −1 means no bound.
pub fn possible_dsep(g: &Graph, x: NodeId, y: NodeId, max_path_length: i32) -> Vec<NodeId> {
    let mut found: BTreeSet<NodeId> = BTreeSet::new();
    let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
    let mut queue: VecDeque<(NodeId, NodeId, usize)> = VecDeque::new();
    for b in g.adjacent(x) {
        seen.insert((x, b));
        queue.push_back((x, b, 1));
        found.insert(b);
    }
    while let Some((a, b, len)) = queue.pop_front() {
        if max_path_length >= 0 && len >= max_path_length as usize {
            continue;
        }
        for c in g.adjacent(b) {
            if c == a || c == x {
                continue;
            }
            let collider = g.endpoint(a, b) == Some(Endpoint::Arrow)
                && g.endpoint(c, b) == Some(Endpoint::Arrow);
            if !(collider || g.is_adjacent(a, c)) {
                continue;
            }
            if seen.insert((b, c)) {
                found.insert(c);
                queue.push_back((b, c, len + 1));
            }
        }
    }
    found.remove(&x);
    found.remove(&y);
    found.into_iter().collect()
}
