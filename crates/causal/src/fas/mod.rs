//! Fast adjacency search (FAS): skeleton discovery by conditional independence.
//!
//! Purpose
//! - Start from a complete (or given) undirected graph and delete `x - y`
//!   whenever some conditioning set drawn from the neighbours of `x` (or of
//!   `y`) makes them independent, for conditioning-set sizes 0, 1, 2, ...
//!   Each deletion records its separating set.
//!
//! Why this design
//! - Stable variant: the adjacency lists used to draw candidate sets at depth
//!   `d` are frozen before any depth-`d` deletion. The edge scan is then a pure
//!   function of that snapshot, so it runs as a parallel map (rayon) followed
//!   by a sequential apply in edge order. Output does not depend on thread
//!   count or edge insertion order.
//! - Cancellation is checked at each depth and inside the scan. An interrupted
//!   depth is discarded whole, so the returned skeleton is the one after the
//!   last completed depth.
//!
//! References
//! - Colombo & Maathuis (2014), "Order-independent constraint-based causal
//!   structure learning" (PC-stable).

use std::sync::Arc;

use rayon::prelude::*;

use crate::cancel::CancelToken;
use crate::choice::{pick, Choices};
use crate::error::SearchError;
use crate::graph::{Endpoint, Graph, NodeId};
use crate::knowledge::{BoundKnowledge, Knowledge};
use crate::oracle::{check_or_dependent, IndependenceTest};
use crate::sepset::SepsetMap;

/// Cap used when the depth is unbounded.
const UNBOUNDED_DEPTH: usize = 1000;

#[derive(Clone, Copy, Debug)]
pub struct FasCfg {
    /// Largest conditioning set size; −1 = unbounded.
    pub depth: i32,
    /// Worker threads for the per-depth scan; `None` uses rayon's global pool.
    pub num_threads: Option<usize>,
    pub verbose: bool,
}

impl Default for FasCfg {
    fn default() -> Self {
        Self {
            depth: -1,
            num_threads: None,
            verbose: false,
        }
    }
}

impl FasCfg {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.depth < -1 {
            return Err(SearchError::invalid(format!(
                "depth = {} (must be >= -1)",
                self.depth
            )));
        }
        if self.num_threads == Some(0) {
            return Err(SearchError::invalid("num_threads must be >= 1"));
        }
        Ok(())
    }

    fn max_depth(&self) -> usize {
        if self.depth < 0 {
            UNBOUNDED_DEPTH
        } else {
            self.depth as usize
        }
    }
}

#[derive(Clone, Debug)]
pub struct FasResult {
    /// Undirected skeleton.
    pub graph: Graph,
    pub sepsets: SepsetMap,
    /// Last depth whose deletions were applied.
    pub depth_reached: Option<usize>,
    pub num_tests: usize,
    pub stopped_early: bool,
}

/// One deletion found by the scan.
struct Removal {
    x: NodeId,
    y: NodeId,
    set: Vec<NodeId>,
    p_value: f64,
}

enum Scan {
    Keep { tests: usize },
    Remove { removal: Removal, tests: usize },
    Cancelled,
}

pub struct Fas {
    test: Arc<dyn IndependenceTest>,
    knowledge: Knowledge,
    cfg: FasCfg,
    cancel: CancelToken,
}

impl Fas {
    pub fn new(test: Arc<dyn IndependenceTest>, cfg: FasCfg) -> Result<Self, SearchError> {
        cfg.validate()?;
        Ok(Self {
            test,
            knowledge: Knowledge::empty(),
            cfg,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_knowledge(mut self, knowledge: Knowledge) -> Self {
        self.knowledge = knowledge;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run from the complete graph over the test's variables.
    pub fn search(&self) -> Result<FasResult, SearchError> {
        let g = Graph::complete(self.test.variables().to_vec())?;
        self.search_from(g)
    }

    /// Run from `initial`, whose nodes must be the test's variables. Marks are
    /// reset to undirected.
    pub fn search_from(&self, initial: Graph) -> Result<FasResult, SearchError> {
        if initial.nodes() != self.test.variables() {
            return Err(SearchError::invalid(
                "initial graph nodes differ from the test's variables",
            ));
        }
        let k = self.knowledge.bind(initial.nodes());
        let mut g = initial;
        g.reorient_all_with(Endpoint::Tail);
        g.clear_triples();

        for e in g.edges() {
            if k.is_forbidden(e.a, e.b) && k.is_forbidden(e.b, e.a) && k.no_edge_required(e.a, e.b)
            {
                g.remove_edge(e.a, e.b);
                step!(self.cfg.verbose, x = g.name(e.a), y = g.name(e.b), "removed by knowledge");
            }
        }

        let pool = match self.cfg.num_threads {
            Some(n) => Some(rayon::ThreadPoolBuilder::new().num_threads(n).build()?),
            None => None,
        };

        let mut sepsets = SepsetMap::new();
        let mut depth_reached = None;
        let mut num_tests = 0usize;
        let mut stopped_early = false;

        for d in 0..=self.cfg.max_depth() {
            if self.cancel.is_cancelled() {
                stopped_early = true;
                break;
            }
            let adj: Vec<Vec<NodeId>> = g.node_ids().map(|x| g.adjacent(x)).collect();
            let edges: Vec<(NodeId, NodeId)> = g.edges().iter().map(|e| (e.a, e.b)).collect();
            let scan = || -> Vec<Scan> {
                edges
                    .par_iter()
                    .map(|&(x, y)| self.scan_edge(x, y, d, &adj, &k))
                    .collect()
            };
            let results = match &pool {
                Some(p) => p.install(scan),
                None => scan(),
            };
            if self.cancel.is_cancelled() {
                stopped_early = true;
                break;
            }
            let mut removed = 0usize;
            for r in results {
                match r {
                    Scan::Keep { tests } => num_tests += tests,
                    Scan::Remove { removal, tests } => {
                        num_tests += tests;
                        g.remove_edge(removal.x, removal.y);
                        step!(
                            self.cfg.verbose,
                            x = g.name(removal.x),
                            y = g.name(removal.y),
                            sepset = ?removal.set.iter().map(|v| g.name(*v)).collect::<Vec<_>>(),
                            p = removal.p_value,
                            "independent"
                        );
                        sepsets.set(removal.x, removal.y, removal.set, removal.p_value);
                        removed += 1;
                    }
                    Scan::Cancelled => {}
                }
            }
            depth_reached = Some(d);
            tracing::debug!(depth = d, removed, edges = g.num_edges(), "fas depth done");
            let free_degree = g.max_degree().saturating_sub(1);
            if free_degree <= d {
                break;
            }
        }

        tracing::info!(
            edges = g.num_edges(),
            tests = num_tests,
            depth = ?depth_reached,
            stopped_early,
            "fas finished"
        );
        Ok(FasResult {
            graph: g,
            sepsets,
            depth_reached,
            num_tests,
            stopped_early,
        })
    }

    /// Look for a size-`d` separating set for `x - y`, drawing from `x`'s side
    /// first, then `y`'s.
    fn scan_edge(
        &self,
        x: NodeId,
        y: NodeId,
        d: usize,
        adj: &[Vec<NodeId>],
        k: &BoundKnowledge,
    ) -> Scan {
        if self.cancel.is_cancelled() {
            return Scan::Cancelled;
        }
        if !k.no_edge_required(x, y) {
            return Scan::Keep { tests: 0 };
        }
        let mut tests = 0;
        for (a, b) in [(x, y), (y, x)] {
            let cands: Vec<NodeId> = adj[a.0]
                .iter()
                .copied()
                .filter(|&z| z != b && k.possible_parent_of(z, a))
                .collect();
            if cands.len() < d {
                continue;
            }
            for idx in Choices::new(cands.len(), d) {
                let z = pick(&cands, &idx);
                let r = check_or_dependent(self.test.as_ref(), x, y, &z);
                tests += 1;
                if r.independent {
                    return Scan::Remove {
                        removal: Removal {
                            x,
                            y,
                            set: z,
                            p_value: r.p_value,
                        },
                        tests,
                    };
                }
            }
        }
        Scan::Keep { tests }
    }
}

#[cfg(test)]
mod tests;
