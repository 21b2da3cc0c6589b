//! Per-target local BOSS with a union merge.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;

use crate::cancel::CancelToken;
use crate::error::{OracleError, SearchError};
use crate::graph::{Endpoint, Graph, Node, NodeId};
use crate::knowledge::{BoundKnowledge, Knowledge};
use crate::oracle::{IndependenceResult, IndependenceTest, Score};
use crate::scorer::{grow_shrink, ScorerCfg};

use super::{Boss, LocalCfg, LocalResult};

/// A score seen through a subset of its variables.
struct WindowScore {
    inner: Arc<dyn Score>,
    vars: Vec<NodeId>,
    nodes: Vec<Node>,
}

/// An independence test seen through a subset of its variables.
struct WindowTest {
    inner: Arc<dyn IndependenceTest>,
    vars: Vec<NodeId>,
    nodes: Vec<Node>,
}

fn lift(vars: &[NodeId], local: &[NodeId]) -> Vec<NodeId> {
    local.iter().map(|v| vars[v.0]).collect()
}

impl Score for WindowScore {
    fn variables(&self) -> &[Node] {
        &self.nodes
    }

    fn local_score(&self, node: NodeId, parents: &[NodeId]) -> Result<f64, OracleError> {
        self.inner
            .local_score(self.vars[node.0], &lift(&self.vars, parents))
    }

    fn local_score_diff(&self, x: NodeId, y: NodeId, z: &[NodeId]) -> Result<f64, OracleError> {
        self.inner
            .local_score_diff(self.vars[x.0], self.vars[y.0], &lift(&self.vars, z))
    }
}

impl IndependenceTest for WindowTest {
    fn variables(&self) -> &[Node] {
        &self.nodes
    }

    fn check(&self, x: NodeId, y: NodeId, z: &[NodeId]) -> Result<IndependenceResult, OracleError> {
        self.inner
            .check(self.vars[x.0], self.vars[y.0], &lift(&self.vars, z))
    }
}

/// Run BOSS once per target, each on its own scorer, and merge.
///
/// With `find_markov_blanket`, target `t` searches over `t` and its Markov
/// blanket (grow-shrink against the score) and contributes the edges at `t`;
/// otherwise every target searches all variables and contributes the edges
/// at `t` of the full result. Merge: union of contributed edges; a pair
/// directed both ways is dropped; a directed edge beats an undirected one;
/// duplicates collapse.
pub fn boss_local(
    score: Arc<dyn Score>,
    test: Option<Arc<dyn IndependenceTest>>,
    scorer_cfg: ScorerCfg,
    knowledge: &Knowledge,
    cfg: &LocalCfg,
    cancel: &CancelToken,
) -> Result<LocalResult, SearchError> {
    cfg.validate()?;
    let nodes: Vec<Node> = score.variables().to_vec();
    let blank = Graph::new(nodes.clone())?;
    let k = knowledge.bind(&nodes);
    let targets: Vec<NodeId> = (0..nodes.len()).map(NodeId).collect();

    let pool = match cfg.num_threads {
        Some(n) => Some(rayon::ThreadPoolBuilder::new().num_threads(n).build()?),
        None => None,
    };
    let run = || -> Vec<Result<Option<(Vec<NodeId>, Graph)>, SearchError>> {
        targets
            .par_iter()
            .map(|&t| {
                if cancel.is_cancelled() {
                    return Ok(None);
                }
                let window = window_for(score.as_ref(), t, cfg.find_markov_blanket);
                let local = search_window(&score, &test, scorer_cfg, knowledge, cfg, cancel, &window)?;
                Ok(Some((window, local)))
            })
            .collect()
    };
    let results = match &pool {
        Some(p) => p.install(run),
        None => run(),
    };

    let mut windows = Vec::with_capacity(targets.len());
    let mut contributed: Vec<(NodeId, NodeId, Endpoint, Endpoint)> = Vec::new();
    let mut stopped_early = cancel.is_cancelled();
    for (t, r) in targets.iter().copied().zip(results) {
        match r? {
            Some((window, local)) => {
                let Some(ti) = window.iter().position(|&v| v == t).map(NodeId) else {
                    continue;
                };
                for y in local.adjacent(ti) {
                    let (Some(at_t), Some(at_y)) = (local.endpoint(y, ti), local.endpoint(ti, y)) else {
                        continue;
                    };
                    contributed.push((t, window[y.0], at_t, at_y));
                }
                windows.push(window);
            }
            None => {
                stopped_early = true;
                windows.push(Vec::new());
            }
        }
    }

    let (graph, conflicts) = merge(blank, &k, contributed);
    tracing::info!(
        targets = targets.len(),
        edges = graph.num_edges(),
        conflicts = conflicts.len(),
        stopped_early,
        "local boss finished"
    );
    Ok(LocalResult {
        graph,
        windows,
        conflicts,
        stopped_early,
    })
}

/// `t` and its Markov blanket (or every variable), sorted.
fn window_for(score: &dyn Score, t: NodeId, find_markov_blanket: bool) -> Vec<NodeId> {
    let n = score.variables().len();
    if !find_markov_blanket {
        return (0..n).map(NodeId).collect();
    }
    let others: Vec<NodeId> = (0..n).map(NodeId).filter(|&v| v != t).collect();
    let mut window = grow_shrink(score, &BoundKnowledge::default(), t, &others);
    window.push(t);
    window.sort_unstable();
    window
}

/// CPDAG over `window`, in window indices.
fn search_window(
    score: &Arc<dyn Score>,
    test: &Option<Arc<dyn IndependenceTest>>,
    scorer_cfg: ScorerCfg,
    knowledge: &Knowledge,
    cfg: &LocalCfg,
    cancel: &CancelToken,
    window: &[NodeId],
) -> Result<Graph, SearchError> {
    let all = score.variables();
    let nodes: Vec<Node> = window.iter().map(|v| all[v.0].clone()).collect();
    let local_score: Arc<dyn Score> = Arc::new(WindowScore {
        inner: score.clone(),
        vars: window.to_vec(),
        nodes: nodes.clone(),
    });
    // Every window starts from the data order restricted to it.
    let mut boss = Boss::new(local_score, cfg.boss)?
        .with_scorer_cfg(scorer_cfg)
        .with_knowledge(knowledge.clone())
        .with_cancel(cancel.clone());
    if let Some(t) = test {
        boss = boss.with_test(Arc::new(WindowTest {
            inner: t.clone(),
            vars: window.to_vec(),
            nodes,
        }));
    }
    Ok(boss.search()?.cpdag)
}

pub(super) fn merge(
    mut g: Graph,
    k: &BoundKnowledge,
    contributed: Vec<(NodeId, NodeId, Endpoint, Endpoint)>,
) -> (Graph, Vec<(NodeId, NodeId)>) {
    // Per unordered pair: (seen a --> b, seen b --> a). Present = some edge.
    let mut seen: BTreeMap<(NodeId, NodeId), (bool, bool)> = BTreeMap::new();
    for (x, y, at_x, at_y) in contributed {
        let (a, b, at_a, at_b) = if x < y { (x, y, at_x, at_y) } else { (y, x, at_y, at_x) };
        let slot = seen.entry((a, b)).or_default();
        match (at_a, at_b) {
            (Endpoint::Tail, Endpoint::Arrow) => slot.0 = true,
            (Endpoint::Arrow, Endpoint::Tail) => slot.1 = true,
            _ => {}
        }
    }
    let mut conflicts = Vec::new();
    for ((a, b), (fwd, back)) in seen {
        let _ = match (fwd, back) {
            (true, true) => {
                tracing::debug!(a = a.0, b = b.0, "conflicting directions; edge dropped");
                conflicts.push((a, b));
                continue;
            }
            (true, false) => g.add_directed(a, b),
            (false, true) => g.add_directed(b, a),
            (false, false) => g.add_undirected(a, b),
        };
    }
    if !k.is_empty() {
        for (a, b) in conflicts.iter().copied() {
            if !k.no_edge_required(a, b) {
                tracing::warn!(a = a.0, b = b.0, "required edge lost in merge conflict");
            }
        }
    }
    (g, conflicts)
}
