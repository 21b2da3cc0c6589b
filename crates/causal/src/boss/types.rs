use serde::Serialize;

use crate::error::SearchError;
use crate::graph::{Graph, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BossCfg {
    /// Independent restarts; the best final score wins, first found on ties.
    pub num_starts: usize,
    /// Start 0 uses the variable order instead of a shuffle.
    pub use_data_order: bool,
    /// Run backward equivalence search after each tuck pass.
    pub use_bes: bool,
    /// Largest BES conditioning subset; −1 = unbounded.
    pub depth: i32,
    /// Start `r` shuffles with `ReplayToken::new(seed, r)`.
    pub seed: u64,
    pub verbose: bool,
}

impl Default for BossCfg {
    fn default() -> Self {
        Self {
            num_starts: 1,
            use_data_order: true,
            use_bes: true,
            depth: -1,
            seed: 0,
            verbose: false,
        }
    }
}

impl BossCfg {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.num_starts == 0 {
            return Err(SearchError::invalid("num_starts must be >= 1"));
        }
        if self.depth < -1 {
            return Err(SearchError::invalid(format!(
                "depth = {} (must be >= -1)",
                self.depth
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct BossResult {
    pub order: Vec<NodeId>,
    pub dag: Graph,
    pub cpdag: Graph,
    pub score: f64,
    /// Index of the start that produced this result.
    pub best_start: usize,
    pub stopped_early: bool,
}

/// Per-target local search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalCfg {
    pub boss: BossCfg,
    /// Restrict each target's search to the target and its Markov blanket.
    pub find_markov_blanket: bool,
    /// Worker threads; `None` uses rayon's global pool.
    pub num_threads: Option<usize>,
}

impl Default for LocalCfg {
    fn default() -> Self {
        Self {
            boss: BossCfg::default(),
            find_markov_blanket: true,
            num_threads: None,
        }
    }
}

impl LocalCfg {
    pub fn validate(&self) -> Result<(), SearchError> {
        self.boss.validate()?;
        if self.num_threads == Some(0) {
            return Err(SearchError::invalid("num_threads must be >= 1"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct LocalResult {
    /// Merged graph over all variables.
    pub graph: Graph,
    /// Variables each target searched over, sorted; empty if skipped.
    pub windows: Vec<Vec<NodeId>>,
    /// Pairs dropped because two targets oriented them in opposite directions.
    pub conflicts: Vec<(NodeId, NodeId)>,
    pub stopped_early: bool,
}

/// Summary written next to CLI outputs.
#[derive(Clone, Debug, Serialize)]
pub struct BossSummary {
    pub score: f64,
    pub best_start: usize,
    pub num_edges: usize,
    pub stopped_early: bool,
}

impl From<&BossResult> for BossSummary {
    fn from(r: &BossResult) -> Self {
        Self {
            score: r.score,
            best_start: r.best_start,
            num_edges: r.cpdag.num_edges(),
            stopped_early: r.stopped_early,
        }
    }
}
