//! BOSS: permutation search by tucks, with backward equivalence search.
//!
//! Purpose
//! - Hill-climb over variable orders. Each pass walks the current order left
//!   to right and, for node `x` at position `i`, tries `tuck(x, j)` for
//!   `j = i-1` down to `0`. The first tuck that strictly raises the total
//!   score and keeps the order consistent with the knowledge is kept; every
//!   other attempt is undone through the scorer's bookmark.
//! - Optionally runs BES on the CPDAG of the current order and adopts the
//!   causal order of the pruned graph when it scores strictly better.
//! - Stops when a full pass (tucks plus BES) leaves the order unchanged.
//!   Every change strictly raises the score, so the loop terminates.
//! - Multi-start: start `r` uses the data order (`r == 0` with
//!   `use_data_order`) or a shuffle seeded by `ReplayToken::new(seed, r)`,
//!   rearranged to respect the knowledge. The best final score wins and the
//!   first start wins ties.
//!
//! Why this design
//! - The scorer is only ever left at a committed state: a cancelled pass
//!   returns right after restoring the bookmark, so callers get the best
//!   order found so far and never a half-applied move.
//! - `local` fans the same search out per target over independent scorers
//!   and merges the per-target graphs (shared nothing, rayon fan-out).
//!
//! References
//! - Andrews, Ramsey, Sanchez-Romero, Camchong and Kummerfeld (2023),
//!   "Fast scalable and accurate discovery of DAGs using the best order score
//!   search and grow-shrink trees".

mod bes;
mod local;
mod types;

pub use local::boss_local;
pub use types::{BossCfg, BossResult, BossSummary, LocalCfg, LocalResult};

use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::cancel::CancelToken;
use crate::error::SearchError;
use crate::graph::paths::{causal_order, dag_extension};
use crate::graph::NodeId;
use crate::knowledge::Knowledge;
use crate::oracle::{IndependenceTest, Score};
use crate::replay::ReplayToken;
use crate::scorer::{OrderScorer, ScorerCfg};

pub struct Boss {
    score: Arc<dyn Score>,
    test: Option<Arc<dyn IndependenceTest>>,
    scorer_cfg: ScorerCfg,
    knowledge: Knowledge,
    cfg: BossCfg,
    cancel: CancelToken,
}

impl Boss {
    pub fn new(score: Arc<dyn Score>, cfg: BossCfg) -> Result<Self, SearchError> {
        cfg.validate()?;
        Ok(Self {
            score,
            test: None,
            scorer_cfg: ScorerCfg::default(),
            knowledge: Knowledge::empty(),
            cfg,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_scorer_cfg(mut self, scorer_cfg: ScorerCfg) -> Self {
        self.scorer_cfg = scorer_cfg;
        self
    }

    /// Independence test for [`crate::scorer::ParentMode::Pearl`].
    pub fn with_test(mut self, test: Arc<dyn IndependenceTest>) -> Self {
        self.test = Some(test);
        self
    }

    pub fn with_knowledge(mut self, knowledge: Knowledge) -> Self {
        self.knowledge = knowledge;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cfg(&self) -> &BossCfg {
        &self.cfg
    }

    /// Fresh scorer over the score's variables.
    pub fn scorer(&self) -> Result<OrderScorer, SearchError> {
        Ok(
            OrderScorer::new(self.score.clone(), self.test.clone(), self.scorer_cfg)?
                .with_knowledge(&self.knowledge),
        )
    }

    /// Every start, keeping the best.
    pub fn search(&self) -> Result<BossResult, SearchError> {
        let mut scorer = self.scorer()?;
        let data_order: Vec<NodeId> = (0..scorer.len()).map(NodeId).collect();
        let mut best: Option<BossResult> = None;
        let mut stopped_early = false;

        for r in 0..self.cfg.num_starts {
            if self.cancel.is_cancelled() && best.is_some() {
                stopped_early = true;
                break;
            }
            let mut start = data_order.clone();
            if !(r == 0 && self.cfg.use_data_order) {
                let mut rng = ReplayToken::new(self.cfg.seed, r as u64).to_std_rng();
                start.shuffle(&mut rng);
            }
            let start = scorer.knowledge().valid_order(&start);
            scorer.clear_cache();
            scorer.set_order(&start)?;
            let stopped = self.climb(&mut scorer)?;
            let score = scorer.score();
            step!(self.cfg.verbose, start = r, score, edges = scorer.num_edges(), "boss start done");
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(BossResult {
                    order: scorer.order().to_vec(),
                    dag: scorer.dag(),
                    cpdag: scorer.cpdag(),
                    score,
                    best_start: r,
                    stopped_early: false,
                });
            }
            if stopped {
                stopped_early = true;
                break;
            }
        }

        let mut out = match best {
            Some(b) => b,
            None => return Err(SearchError::invalid("no start completed")),
        };
        out.stopped_early = stopped_early;
        tracing::info!(
            score = out.score,
            edges = out.cpdag.num_edges(),
            best_start = out.best_start,
            stopped_early,
            "boss finished"
        );
        Ok(out)
    }

    /// Hill-climb `scorer` from its current order. Returns whether the run was
    /// cancelled; the scorer then holds the best committed order.
    pub fn climb(&self, scorer: &mut OrderScorer) -> Result<bool, SearchError> {
        loop {
            let before = scorer.order().to_vec();
            if self.tuck_pass(scorer) {
                return Ok(true);
            }
            if self.cfg.use_bes {
                self.bes_step(scorer)?;
            }
            if scorer.order() == before.as_slice() {
                return Ok(false);
            }
        }
    }

    /// One left-to-right pass of first-improvement tucks. Returns `true` if
    /// cancelled.
    fn tuck_pass(&self, scorer: &mut OrderScorer) -> bool {
        let pass: Vec<NodeId> = scorer.order().to_vec();
        for x in pass {
            if self.cancel.is_cancelled() {
                return true;
            }
            let current = scorer.score();
            scorer.bookmark();
            let i = scorer.index_of(x);
            for j in (0..i).rev() {
                if !scorer.tuck(x, j) {
                    continue;
                }
                if scorer.score() > current && !scorer.violates_knowledge() {
                    step!(
                        self.cfg.verbose,
                        node = %scorer.variables()[x.0].name,
                        from = i,
                        to = j,
                        score = scorer.score(),
                        "tuck"
                    );
                    break;
                }
                scorer.go_to_bookmark();
            }
        }
        false
    }

    /// BES on the current CPDAG; adopt the pruned graph's causal order only if
    /// it scores strictly better.
    fn bes_step(&self, scorer: &mut OrderScorer) -> Result<(), SearchError> {
        let before = scorer.score();
        let mut g = scorer.cpdag();
        let deleted = bes::backward(
            self.score.as_ref(),
            scorer.knowledge(),
            &mut g,
            self.cfg.depth,
            self.cfg.verbose,
        );
        if deleted == 0 {
            return Ok(());
        }
        let Some(dag) = dag_extension(&g) else {
            tracing::debug!("bes result has no dag extension; ignored");
            return Ok(());
        };
        let order = causal_order(&dag, scorer.order());
        scorer.bookmark();
        scorer.set_order(&order)?;
        if scorer.score() > before && !scorer.violates_knowledge() {
            step!(self.cfg.verbose, deleted, score = scorer.score(), "bes accepted");
        } else {
            scorer.go_to_bookmark();
        }
        Ok(())
    }
}
