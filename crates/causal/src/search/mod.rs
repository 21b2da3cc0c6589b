//! End-to-end pipelines built from the search components.
//!
//! Purpose
//! - [`Pipeline::pc`]: FAS, then R0 and Meek propagation to a CPDAG.
//! - [`Pipeline::fci`]: FAS, R0 in PAG mode, removal of adjacencies separated
//!   by a subset of a possible-d-sep set, then the FCI rules to a PAG.
//! - [`Pipeline::boss_pag`]: BOSS, removal of the shield `a - c` of every
//!   collider `a --> b <-- c` of the BOSS DAG that a greedy sepset search
//!   separates without `b`, then the FCI rules to a PAG.
//! - [`Pipeline::boss`] and [`Pipeline::local`] forward to BOSS and to the
//!   per-target local search with the pipeline's knowledge and cancel token.
//!
//! Why this design
//! - Every stage reads the same knowledge and cancel token. A cancelled stage
//!   hands its partial result on, later stages still run on it, and the
//!   output says `stopped_early`.

mod types;

pub use types::{BossPagCfg, FciCfg, PcCfg, SearchOutput};

use std::sync::Arc;

use crate::boss::{boss_local, Boss, BossCfg, BossResult, LocalCfg, LocalResult};
use crate::cancel::CancelToken;
use crate::choice::{pick, Choices, DepthChoices};
use crate::error::SearchError;
use crate::fas::Fas;
use crate::graph::paths::possible_dsep;
use crate::graph::{Graph, NodeId};
use crate::knowledge::{BoundKnowledge, Knowledge};
use crate::oracle::{check_or_dependent, IndependenceTest, Score};
use crate::orient::{OrientCfg, Orienter};
use crate::scorer::ScorerCfg;
use crate::sepset::{MapSepsets, SepsetMap, SepsetProducer, SepsetStrategy, TestSepsets};

#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    knowledge: Knowledge,
    cancel: CancelToken,
}

/// Recorded sepsets first, then a test-backed search.
struct RecordedThenSearch {
    recorded: MapSepsets,
    search: TestSepsets,
}

impl SepsetProducer for RecordedThenSearch {
    fn sepset(&self, x: NodeId, y: NodeId) -> Option<Vec<NodeId>> {
        self.recorded.sepset(x, y).or_else(|| self.search.sepset(x, y))
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_knowledge(mut self, knowledge: Knowledge) -> Self {
        self.knowledge = knowledge;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    pub fn pc(&self, test: Arc<dyn IndependenceTest>, cfg: &PcCfg) -> Result<SearchOutput, SearchError> {
        cfg.validate()?;
        self.knowledge.check_names(test.variables())?;
        let fas = Fas::new(test, cfg.fas)?
            .with_knowledge(self.knowledge.clone())
            .with_cancel(self.cancel.clone())
            .search()?;
        let mut g = fas.graph;
        let report = self
            .orienter(cfg.orient)?
            .orient(&mut g, &MapSepsets::new(fas.sepsets.clone()));
        tracing::info!(edges = g.num_edges(), tests = fas.num_tests, "pc finished");
        Ok(SearchOutput {
            graph: g,
            sepsets: fas.sepsets,
            stopped_early: fas.stopped_early || report.stopped_early,
            report,
        })
    }

    pub fn fci(&self, test: Arc<dyn IndependenceTest>, cfg: &FciCfg) -> Result<SearchOutput, SearchError> {
        cfg.validate()?;
        self.knowledge.check_names(test.variables())?;
        let fas = Fas::new(test.clone(), cfg.fas)?
            .with_knowledge(self.knowledge.clone())
            .with_cancel(self.cancel.clone())
            .search()?;
        let mut g = fas.graph;
        let mut sepsets = fas.sepsets;
        let mut stopped_early = fas.stopped_early;
        let orienter = self.orienter(cfg.orient)?;
        let k = self.knowledge.bind(g.nodes());

        if cfg.possible_dsep && !stopped_early {
            orienter.orient_colliders(&mut g, &MapSepsets::new(sepsets.clone()), &k);
            let (removed, cancelled) =
                self.remove_by_possible_dsep(&mut g, test.as_ref(), &k, &mut sepsets, cfg);
            stopped_early = cancelled;
            step!(cfg.orient.verbose, removed, "possible-dsep step done");
        }

        let report = orienter.orient(&mut g, &MapSepsets::new(sepsets.clone()));
        tracing::info!(edges = g.num_edges(), sepsets = sepsets.len(), "fci finished");
        Ok(SearchOutput {
            graph: g,
            sepsets,
            stopped_early: stopped_early || report.stopped_early,
            report,
        })
    }

    /// Drop `x - y` when some subset of possible-d-sep(x) or possible-d-sep(y),
    /// of size at most `fas.depth`, separates them. Edges are visited in order
    /// against the graph as it shrinks. Returns the number removed and whether
    /// the step was cancelled.
    fn remove_by_possible_dsep(
        &self,
        g: &mut Graph,
        test: &dyn IndependenceTest,
        k: &BoundKnowledge,
        sepsets: &mut SepsetMap,
        cfg: &FciCfg,
    ) -> (usize, bool) {
        let mut removed = 0;
        for e in g.edges() {
            if self.cancel.is_cancelled() {
                return (removed, true);
            }
            if !k.no_edge_required(e.a, e.b) {
                continue;
            }
            'sides: for (x, y) in [(e.a, e.b), (e.b, e.a)] {
                let pool = possible_dsep(g, x, y, cfg.orient.max_path_length);
                for idx in DepthChoices::new(pool.len(), cfg.fas.depth) {
                    let z = pick(&pool, &idx);
                    let r = check_or_dependent(test, e.a, e.b, &z);
                    if r.independent {
                        step!(
                            cfg.orient.verbose,
                            x = g.name(e.a),
                            y = g.name(e.b),
                            z = ?z.iter().map(|v| g.name(*v)).collect::<Vec<_>>(),
                            "removed by possible-dsep"
                        );
                        g.remove_edge(e.a, e.b);
                        sepsets.set(e.a, e.b, z, r.p_value);
                        removed += 1;
                        break 'sides;
                    }
                }
            }
        }
        (removed, false)
    }

    pub fn boss(
        &self,
        score: Arc<dyn Score>,
        test: Option<Arc<dyn IndependenceTest>>,
        scorer_cfg: ScorerCfg,
        cfg: BossCfg,
    ) -> Result<BossResult, SearchError> {
        self.knowledge.check_names(score.variables())?;
        let mut boss = Boss::new(score, cfg)?
            .with_scorer_cfg(scorer_cfg)
            .with_knowledge(self.knowledge.clone())
            .with_cancel(self.cancel.clone());
        if let Some(t) = test {
            boss = boss.with_test(t);
        }
        boss.search()
    }

    pub fn local(
        &self,
        score: Arc<dyn Score>,
        test: Option<Arc<dyn IndependenceTest>>,
        scorer_cfg: ScorerCfg,
        cfg: &LocalCfg,
    ) -> Result<LocalResult, SearchError> {
        self.knowledge.check_names(score.variables())?;
        boss_local(score, test, scorer_cfg, &self.knowledge, cfg, &self.cancel)
    }

    pub fn boss_pag(
        &self,
        score: Arc<dyn Score>,
        test: Arc<dyn IndependenceTest>,
        cfg: &BossPagCfg,
    ) -> Result<SearchOutput, SearchError> {
        cfg.validate()?;
        if score.variables() != test.variables() {
            return Err(SearchError::invalid("score and test variables differ"));
        }
        let boss = self.boss(score, Some(test.clone()), cfg.scorer, cfg.boss)?;
        let mut g = boss.cpdag.clone();
        let k = self.knowledge.bind(g.nodes());
        let search = TestSepsets::new(g.clone(), test.clone(), SepsetStrategy::Greedy, cfg.sepset)?;
        let (recorded, cancelled) =
            self.remove_shielded_colliders(&boss.dag, &mut g, &search, test.as_ref(), &k, cfg.orient.verbose);

        let producer = RecordedThenSearch {
            recorded: MapSepsets::new(recorded.clone()),
            search: TestSepsets::new(g.clone(), test, SepsetStrategy::Greedy, cfg.sepset)?,
        };
        let report = self.orienter(cfg.orient)?.orient(&mut g, &producer);
        tracing::info!(
            edges = g.num_edges(),
            removed = recorded.len(),
            "boss-pag finished"
        );
        Ok(SearchOutput {
            graph: g,
            sepsets: recorded,
            stopped_early: boss.stopped_early || cancelled || report.stopped_early,
            report,
        })
    }

    /// For each collider `a --> b <-- c` of `dag` with `a - c` still in `g`,
    /// remove `a - c` if `search` separates them by a set without `b`.
    fn remove_shielded_colliders(
        &self,
        dag: &Graph,
        g: &mut Graph,
        search: &dyn SepsetProducer,
        test: &dyn IndependenceTest,
        k: &BoundKnowledge,
        verbose: bool,
    ) -> (SepsetMap, bool) {
        let mut recorded = SepsetMap::new();
        for b in dag.node_ids() {
            if self.cancel.is_cancelled() {
                return (recorded, true);
            }
            let parents = dag.parents(b);
            for idx in Choices::new(parents.len(), 2) {
                let (a, c) = (parents[idx[0]], parents[idx[1]]);
                if !g.is_adjacent(a, c) || !k.no_edge_required(a, c) {
                    continue;
                }
                let Some(set) = search.sepset(a, c) else {
                    continue;
                };
                if set.contains(&b) {
                    continue;
                }
                step!(verbose, a = g.name(a), b = g.name(b), c = g.name(c), "shield removed");
                g.remove_edge(a, c);
                let p = check_or_dependent(test, a, c, &set).p_value;
                recorded.set(a, c, set, p);
            }
        }
        (recorded, false)
    }

    fn orienter(&self, cfg: OrientCfg) -> Result<Orienter, SearchError> {
        Ok(Orienter::new(cfg)?
            .with_knowledge(self.knowledge.clone())
            .with_cancel(self.cancel.clone()))
    }
}

#[cfg(test)]
mod tests;
