//! Random DAGs for tests, benches and the CLI.
//!
//! Model
//! - Nodes `X1..Xn`, a uniformly random causal order, then `num_edges` distinct
//!   forward pairs drawn without replacement. Deterministic per replay token.

use rand::seq::SliceRandom;

use super::{Graph, NodeId};
use crate::error::SearchError;
use crate::replay::ReplayToken;

#[derive(Clone, Copy, Debug)]
pub struct RandomDagCfg {
    pub num_nodes: usize,
    pub num_edges: usize,
}

impl Default for RandomDagCfg {
    fn default() -> Self {
        Self {
            num_nodes: 10,
            num_edges: 10,
        }
    }
}

impl RandomDagCfg {
    pub fn validate(&self) -> Result<(), SearchError> {
        let max = self.num_nodes * self.num_nodes.saturating_sub(1) / 2;
        if self.num_edges > max {
            return Err(SearchError::invalid(format!(
                "num_edges = {} exceeds the {} possible edges over {} nodes",
                self.num_edges, max, self.num_nodes
            )));
        }
        Ok(())
    }
}

pub fn random_dag(cfg: RandomDagCfg, tok: ReplayToken) -> Result<Graph, SearchError> {
    cfg.validate()?;
    let mut rng = tok.to_std_rng();
    let names: Vec<String> = (1..=cfg.num_nodes).map(|i| format!("X{i}")).collect();
    let mut g = Graph::from_names(&names)?;
    let mut order: Vec<NodeId> = g.node_ids().collect();
    order.shuffle(&mut rng);
    let mut pairs: Vec<(NodeId, NodeId)> = Vec::new();
    for i in 0..order.len() {
        for j in i + 1..order.len() {
            pairs.push((order[i], order[j]));
        }
    }
    pairs.shuffle(&mut rng);
    for &(a, b) in pairs.iter().take(cfg.num_edges) {
        g.add_directed(a, b)?;
    }
    Ok(g)
}
