use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// How a node's parents are derived from the nodes before it in the order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParentMode {
    /// Grow-shrink over the prefix, driven by score gains.
    #[default]
    GrowShrink,
    /// Prefix members dependent on the node given the rest of the prefix.
    /// Needs an independence test.
    Pearl,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorerCfg {
    pub parent_mode: ParentMode,
    /// Memoise fits by (node, prefix set).
    pub cache_scores: bool,
}

impl Default for ScorerCfg {
    fn default() -> Self {
        Self {
            parent_mode: ParentMode::GrowShrink,
            cache_scores: true,
        }
    }
}

/// Parents chosen for one node and their local score.
#[derive(Clone, Debug, PartialEq)]
pub struct Fit {
    /// Sorted.
    pub parents: Vec<NodeId>,
    pub score: f64,
}

/// Everything needed to restore the scorer exactly.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Snapshot {
    pub pi: Vec<NodeId>,
    pub pos: Vec<usize>,
    pub fits: Vec<Fit>,
}
