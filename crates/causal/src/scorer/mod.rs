//! Order scorer: a permutation of the variables plus the DAG it implies.
//!
//! Purpose
//! - Holds `pi` (a total order over all variables) and, for every node, the
//!   parents chosen from the nodes before it together with their local score.
//!   The total score is the sum of those local scores.
//! - Permutation searches mutate `pi` through [`OrderScorer::tuck`],
//!   [`OrderScorer::move_to`] and [`OrderScorer::swap`], compare
//!   [`OrderScorer::score`] and undo with [`OrderScorer::go_to_bookmark`].
//!
//! Why this design
//! - A node's fit depends only on the set of nodes before it, so a move that
//!   permutes positions `lo..=hi` refits exactly those positions. Parent
//!   selection visits candidates by node id, which is what lets fits be
//!   memoised by prefix set.
//! - One bookmark slot. `bookmark` overwrites it; `go_to_bookmark` restores it
//!   and keeps it, so a caller can try many moves from the same state.
//! - Oracle failures count as −∞ (see `crate::oracle`), never as a skip.
//!
//! References
//! - Raskutti and Uhler (2018), sparsest permutations.
//! - Lam, Andrews and Ramsey (2022), GRaSP; Andrews et al. (2023), BOSS.

mod types;

pub use types::{Fit, ParentMode, ScorerCfg};

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::SearchError;
use crate::graph::{Graph, Node, NodeId};
use crate::knowledge::{BoundKnowledge, Knowledge};
use crate::oracle::{check_or_dependent, diff_or_neg_inf, score_or_neg_inf, IndependenceTest, Score};
use crate::orient::MeekRules;

use types::Snapshot;

/// Memoised fits kept before the memo is dropped and refilled.
const MEMO_LIMIT: usize = 1 << 16;

pub struct OrderScorer {
    score: Arc<dyn Score>,
    test: Option<Arc<dyn IndependenceTest>>,
    knowledge: BoundKnowledge,
    cfg: ScorerCfg,
    /// Edgeless graph over the variables.
    blank: Graph,
    state: Snapshot,
    bookmark: Option<Snapshot>,
    memo: HashMap<(NodeId, Vec<NodeId>), Fit>,
}

impl OrderScorer {
    /// Scorer over the score's variables in their given order. `test` is
    /// required for [`ParentMode::Pearl`].
    pub fn new(
        score: Arc<dyn Score>,
        test: Option<Arc<dyn IndependenceTest>>,
        cfg: ScorerCfg,
    ) -> Result<Self, SearchError> {
        let n = score.variables().len();
        match (&test, cfg.parent_mode) {
            (None, ParentMode::Pearl) => {
                return Err(SearchError::invalid("pearl parent mode needs an independence test"))
            }
            (Some(t), _) if t.variables().len() != n => {
                return Err(SearchError::invalid(format!(
                    "score has {} variables, test has {}",
                    n,
                    t.variables().len()
                )))
            }
            _ => {}
        }
        let blank = Graph::new(score.variables().to_vec())?;
        let mut out = Self {
            score,
            test,
            knowledge: BoundKnowledge::default(),
            cfg,
            blank,
            state: Snapshot {
                pi: (0..n).map(NodeId).collect(),
                pos: (0..n).collect(),
                fits: Vec::new(),
            },
            bookmark: None,
            memo: HashMap::new(),
        };
        out.refit_all();
        Ok(out)
    }

    /// Parents must respect `knowledge`; refits every node.
    pub fn with_knowledge(mut self, knowledge: &Knowledge) -> Self {
        self.knowledge = knowledge.bind(self.score.variables());
        self.memo.clear();
        self.refit_all();
        self
    }

    /// Drop memoised fits. The current state and the bookmark are kept.
    pub fn clear_cache(&mut self) {
        self.memo.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.memo.len()
    }

    pub fn variables(&self) -> &[Node] {
        self.score.variables()
    }

    pub fn knowledge(&self) -> &BoundKnowledge {
        &self.knowledge
    }

    pub fn len(&self) -> usize {
        self.state.pi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.pi.is_empty()
    }

    pub fn order(&self) -> &[NodeId] {
        &self.state.pi
    }

    /// Replace `pi`. Fails unless `order` is a permutation of the variables.
    pub fn set_order(&mut self, order: &[NodeId]) -> Result<(), SearchError> {
        let n = self.len();
        let mut seen = vec![false; n];
        if order.len() != n {
            return Err(SearchError::invalid(format!(
                "order has {} entries for {} variables",
                order.len(),
                n
            )));
        }
        for &x in order {
            if x.0 >= n || std::mem::replace(&mut seen[x.0], true) {
                return Err(SearchError::invalid(format!("order repeats or misses {x}")));
            }
        }
        self.state.pi = order.to_vec();
        for (i, &x) in order.iter().enumerate() {
            self.state.pos[x.0] = i;
        }
        self.refit_all();
        Ok(())
    }

    pub fn index_of(&self, x: NodeId) -> usize {
        self.state.pos[x.0]
    }

    pub fn get(&self, i: usize) -> NodeId {
        self.state.pi[i]
    }

    /// Sum of the local scores.
    pub fn score(&self) -> f64 {
        self.state.fits.iter().map(|f| f.score).sum()
    }

    pub fn local_score(&self, x: NodeId) -> f64 {
        self.state.fits[x.0].score
    }

    /// Per-node fits, indexed by node.
    pub fn fits(&self) -> &[Fit] {
        &self.state.fits
    }

    pub fn parents(&self, x: NodeId) -> &[NodeId] {
        &self.state.fits[x.0].parents
    }

    pub fn adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.parents(a).contains(&b) || self.parents(b).contains(&a)
    }

    /// `a - b` is an edge whose endpoints share all other parents.
    pub fn covered_edge(&self, a: NodeId, b: NodeId) -> bool {
        if !self.adjacent(a, b) {
            return false;
        }
        let (first, second) = if self.index_of(a) < self.index_of(b) {
            (a, b)
        } else {
            (b, a)
        };
        let rest: Vec<NodeId> = self
            .parents(second)
            .iter()
            .copied()
            .filter(|&p| p != first)
            .collect();
        rest == self.parents(first)
    }

    /// Ancestors of `x` in the implied DAG, including `x`.
    pub fn ancestors(&self, x: NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![x];
        while let Some(n) = stack.pop() {
            if seen.insert(n) {
                stack.extend_from_slice(self.parents(n));
            }
        }
        seen
    }

    pub fn num_edges(&self) -> usize {
        self.state.fits.iter().map(|f| f.parents.len()).sum()
    }

    /// Move `x` to position `j`, shifting the nodes in between.
    pub fn move_to(&mut self, x: NodeId, j: usize) {
        let i = self.index_of(x);
        if i == j || j >= self.len() {
            return;
        }
        let v = self.state.pi.remove(i);
        self.state.pi.insert(j, v);
        let (lo, hi) = (i.min(j), i.max(j));
        self.reindex(lo, hi);
        self.refit(lo, hi);
    }

    pub fn swap(&mut self, a: NodeId, b: NodeId) {
        let (i, j) = (self.index_of(a), self.index_of(b));
        if i == j {
            return;
        }
        self.state.pi.swap(i, j);
        let (lo, hi) = (i.min(j), i.max(j));
        self.reindex(lo, hi);
        self.refit(lo, hi);
    }

    /// Tuck `x` in front of the node at position `j`: `x` and its ancestors
    /// among positions `j + 1..=index_of(x)` move, in their current relative
    /// order, to start at `j`.
    ///
    /// Returns `false` without touching anything unless `j` is before `x`,
    /// `x` is adjacent to the node at `j`, and that edge is not covered.
    pub fn tuck(&mut self, x: NodeId, j: usize) -> bool {
        let i = self.index_of(x);
        if j >= i {
            return false;
        }
        let y = self.get(j);
        if !self.adjacent(x, y) || self.covered_edge(x, y) {
            return false;
        }
        let anc = self.ancestors(x);
        let (moved, rest): (Vec<NodeId>, Vec<NodeId>) = self.state.pi[j..=i]
            .iter()
            .copied()
            .partition(|n| anc.contains(n) && *n != y);
        let mut block = moved;
        block.extend(rest);
        self.state.pi.splice(j..=i, block);
        self.reindex(j, i);
        self.refit(j, i);
        true
    }

    /// Save the current state in the single bookmark slot.
    pub fn bookmark(&mut self) {
        self.bookmark = Some(self.state.clone());
    }

    /// Restore the bookmarked state. Returns `false` if there is none.
    pub fn go_to_bookmark(&mut self) -> bool {
        match &self.bookmark {
            Some(b) => {
                self.state.clone_from(b);
                true
            }
            None => false,
        }
    }

    /// `pi` puts a node before one it may not precede.
    pub fn violates_knowledge(&self) -> bool {
        self.knowledge.violated_by_order(&self.state.pi)
    }

    /// The implied DAG: `p --> x` for each chosen parent.
    pub fn dag(&self) -> Graph {
        let mut g = self.blank.clone();
        for x in 0..self.len() {
            for &p in self.parents(NodeId(x)) {
                let _ = g.add_directed(p, NodeId(x));
            }
        }
        g
    }

    /// The equivalence class of [`Self::dag`] as a CPDAG.
    pub fn cpdag(&self) -> Graph {
        let mut g = self.dag();
        MeekRules::new(&self.knowledge)
            .revert_to_unshielded_colliders(true)
            .propagate(&mut g);
        g
    }

    fn reindex(&mut self, lo: usize, hi: usize) {
        for p in lo..=hi {
            let x = self.state.pi[p];
            self.state.pos[x.0] = p;
        }
    }

    fn refit_all(&mut self) {
        let n = self.len();
        self.state.fits = (0..n)
            .map(|_| Fit {
                parents: Vec::new(),
                score: 0.0,
            })
            .collect();
        if n > 0 {
            self.refit(0, n - 1);
        }
    }

    fn refit(&mut self, lo: usize, hi: usize) {
        for p in lo..=hi {
            let x = self.state.pi[p];
            let prefix = &self.state.pi[..p];
            let fit = if self.cfg.cache_scores {
                let mut key: Vec<NodeId> = prefix.to_vec();
                key.sort_unstable();
                match self.memo.get(&(x, key.clone())) {
                    Some(f) => f.clone(),
                    None => {
                        let f = self.fit(x, prefix);
                        if self.memo.len() >= MEMO_LIMIT {
                            self.memo.clear();
                        }
                        self.memo.insert((x, key), f.clone());
                        f
                    }
                }
            } else {
                self.fit(x, prefix)
            };
            self.state.fits[x.0] = fit;
        }
    }

    fn fit(&self, x: NodeId, prefix: &[NodeId]) -> Fit {
        let mut parents = match self.cfg.parent_mode {
            ParentMode::GrowShrink => grow_shrink(self.score.as_ref(), &self.knowledge, x, prefix),
            ParentMode::Pearl => self.pearl_parents(x, prefix),
        };
        parents.sort_unstable();
        let score = score_or_neg_inf(self.score.as_ref(), x, &parents);
        Fit { parents, score }
    }

    fn pearl_parents(&self, x: NodeId, prefix: &[NodeId]) -> Vec<NodeId> {
        let Some(test) = self.test.as_deref() else {
            return Vec::new();
        };
        let k = &self.knowledge;
        prefix
            .iter()
            .copied()
            .filter(|&z| {
                if k.is_required(z, x) {
                    return true;
                }
                if !k.possible_parent_of(z, x) {
                    return false;
                }
                let rest: Vec<NodeId> = prefix.iter().copied().filter(|&w| w != z).collect();
                !check_or_dependent(test, z, x, &rest).independent
            })
            .collect()
    }
}

/// Grow-shrink parent selection for `x` among `candidates`.
///
/// Grow adds the candidate with the largest positive gain until none is
/// positive; shrink then drops the parent whose removal gains most until no
/// removal gains. Candidates are visited by node id and ties go to the lowest
/// id, so the result depends on the candidate set, not its order. Required
/// parents are always kept and forbidden ones never considered.
pub(crate) fn grow_shrink(
    score: &dyn Score,
    k: &BoundKnowledge,
    x: NodeId,
    candidates: &[NodeId],
) -> Vec<NodeId> {
    let mut parents: Vec<NodeId> = candidates
        .iter()
        .copied()
        .filter(|&z| k.is_required(z, x))
        .collect();
    parents.sort_unstable();
    parents.dedup();
    let mut pool: Vec<NodeId> = candidates
        .iter()
        .copied()
        .filter(|&z| z != x && k.possible_parent_of(z, x) && !parents.contains(&z))
        .collect();
    pool.sort_unstable();
    pool.dedup();

    loop {
        let mut best: Option<(NodeId, f64)> = None;
        for &z in &pool {
            if parents.contains(&z) {
                continue;
            }
            let gain = diff_or_neg_inf(score, z, x, &parents);
            if gain > 0.0 && best.map_or(true, |(_, b)| gain > b) {
                best = Some((z, gain));
            }
        }
        match best {
            Some((z, _)) => {
                let at = parents.partition_point(|&p| p < z);
                parents.insert(at, z);
            }
            None => break,
        }
    }

    loop {
        let mut best: Option<(usize, f64)> = None;
        for (i, &z) in parents.iter().enumerate() {
            if k.is_required(z, x) {
                continue;
            }
            let rest: Vec<NodeId> = parents.iter().copied().filter(|&w| w != z).collect();
            let d = diff_or_neg_inf(score, z, x, &rest);
            if !d.is_finite() {
                continue;
            }
            let gain = -d;
            if gain > 0.0 && best.map_or(true, |(_, b)| gain > b) {
                best = Some((i, gain));
            }
        }
        match best {
            Some((i, _)) => {
                parents.remove(i);
            }
            None => break,
        }
    }
    parents
}
