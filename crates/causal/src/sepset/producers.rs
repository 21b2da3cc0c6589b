//! Sepset producers.

use std::sync::Arc;

use crate::choice::{pick, DepthChoices};
use crate::error::SearchError;
use crate::graph::paths::possible_dsep;
use crate::graph::{Graph, NodeId};
use crate::oracle::{check_or_dependent, IndependenceTest};

use super::{SepsetMap, SepsetProducer};

/// Answers from a recorded [`SepsetMap`].
#[derive(Clone, Debug, Default)]
pub struct MapSepsets {
    map: SepsetMap,
}

impl MapSepsets {
    pub fn new(map: SepsetMap) -> Self {
        Self { map }
    }

    pub fn map(&self) -> &SepsetMap {
        &self.map
    }
}

impl SepsetProducer for MapSepsets {
    fn sepset(&self, x: NodeId, y: NodeId) -> Option<Vec<NodeId>> {
        self.map.sepset(x, y).map(|s| s.to_vec())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SepsetStrategy {
    /// First independent subset, scanning `adj(x)` then `adj(y)`.
    Greedy,
    /// Among all independent subsets, the one with the smallest p-value.
    MinP,
    /// Among all independent subsets, the one with the largest p-value.
    MaxP,
    /// Greedy over the possible-d-sep sets of `x` and `y`.
    PossibleDsep,
}

#[derive(Clone, Copy, Debug)]
pub struct SepsetCfg {
    /// Largest conditioning set tried; −1 = no bound.
    pub depth: i32,
    /// Path bound for possible-d-sep, in edges; −1 = no bound.
    pub max_path_length: i32,
}

impl Default for SepsetCfg {
    fn default() -> Self {
        Self {
            depth: -1,
            max_path_length: -1,
        }
    }
}

impl SepsetCfg {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.depth < -1 {
            return Err(SearchError::invalid(format!("depth = {} (must be >= -1)", self.depth)));
        }
        if self.max_path_length < -1 {
            return Err(SearchError::invalid(format!(
                "max_path_length = {} (must be >= -1)",
                self.max_path_length
            )));
        }
        Ok(())
    }
}

/// Searches subsets of a candidate pool around `x` and `y` with an
/// independence test. The pool comes from a snapshot of the graph taken at
/// construction (or the last [`TestSepsets::set_graph`]).
#[derive(Clone)]
pub struct TestSepsets {
    graph: Graph,
    test: Arc<dyn IndependenceTest>,
    strategy: SepsetStrategy,
    cfg: SepsetCfg,
}

impl TestSepsets {
    pub fn new(
        graph: Graph,
        test: Arc<dyn IndependenceTest>,
        strategy: SepsetStrategy,
        cfg: SepsetCfg,
    ) -> Result<Self, SearchError> {
        cfg.validate()?;
        Ok(Self {
            graph,
            test,
            strategy,
            cfg,
        })
    }

    pub fn set_graph(&mut self, graph: Graph) {
        self.graph = graph;
    }

    pub fn strategy(&self) -> SepsetStrategy {
        self.strategy
    }

    fn pools(&self, x: NodeId, y: NodeId) -> [Vec<NodeId>; 2] {
        match self.strategy {
            SepsetStrategy::PossibleDsep => [
                possible_dsep(&self.graph, x, y, self.cfg.max_path_length),
                possible_dsep(&self.graph, y, x, self.cfg.max_path_length),
            ],
            _ => {
                let side = |a: NodeId, b: NodeId| -> Vec<NodeId> {
                    self.graph.adjacent(a).into_iter().filter(|&v| v != b).collect()
                };
                [side(x, y), side(y, x)]
            }
        }
    }

    /// Independent candidates in scan order, stopping at the first one for the
    /// greedy strategies.
    fn scan(&self, x: NodeId, y: NodeId, first_only: bool) -> Vec<(Vec<NodeId>, f64)> {
        let mut hits = Vec::new();
        for pool in self.pools(x, y) {
            for idx in DepthChoices::new(pool.len(), self.cfg.depth) {
                let z = pick(&pool, &idx);
                let r = check_or_dependent(self.test.as_ref(), x, y, &z);
                if r.independent {
                    hits.push((z, r.p_value));
                    if first_only {
                        return hits;
                    }
                }
            }
        }
        hits
    }
}

impl SepsetProducer for TestSepsets {
    fn sepset(&self, x: NodeId, y: NodeId) -> Option<Vec<NodeId>> {
        match self.strategy {
            SepsetStrategy::Greedy | SepsetStrategy::PossibleDsep => {
                self.scan(x, y, true).into_iter().next().map(|(z, _)| z)
            }
            SepsetStrategy::MinP => {
                let mut best: Option<(Vec<NodeId>, f64)> = None;
                for (z, p) in self.scan(x, y, false) {
                    if best.as_ref().map_or(true, |(_, bp)| p < *bp) {
                        best = Some((z, p));
                    }
                }
                best.map(|(z, _)| z)
            }
            SepsetStrategy::MaxP => {
                let mut best: Option<(Vec<NodeId>, f64)> = None;
                for (z, p) in self.scan(x, y, false) {
                    if best.as_ref().map_or(true, |(_, bp)| p > *bp) {
                        best = Some((z, p));
                    }
                }
                best.map(|(z, _)| z)
            }
        }
    }
}
