//! Serializable graph shape used by the CLI and the Python bindings.

use serde::{Deserialize, Serialize};

use super::{Endpoint, Graph, Node};
use crate::error::GraphError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub a: String,
    pub b: String,
    pub mark_a: Endpoint,
    pub mark_b: Endpoint,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub nodes: Vec<String>,
    /// Names of discrete variables; everything else is continuous.
    #[serde(default)]
    pub discrete: Vec<String>,
    pub edges: Vec<EdgeRecord>,
}

impl Graph {
    pub fn to_record(&self) -> GraphRecord {
        GraphRecord {
            nodes: self.nodes().iter().map(|n| n.name.clone()).collect(),
            discrete: self
                .nodes()
                .iter()
                .filter(|n| n.kind == super::VarKind::Discrete)
                .map(|n| n.name.clone())
                .collect(),
            edges: self
                .edges()
                .into_iter()
                .map(|e| EdgeRecord {
                    a: self.name(e.a).to_string(),
                    b: self.name(e.b).to_string(),
                    mark_a: e.at_a,
                    mark_b: e.at_b,
                })
                .collect(),
        }
    }

    pub fn from_record(rec: &GraphRecord) -> Result<Graph, GraphError> {
        let nodes = rec
            .nodes
            .iter()
            .map(|name| {
                if rec.discrete.iter().any(|d| d == name) {
                    Node::discrete(name.as_str())
                } else {
                    Node::continuous(name.as_str())
                }
            })
            .collect();
        let mut g = Graph::new(nodes)?;
        for e in &rec.edges {
            let a = g.require_id(&e.a)?;
            let b = g.require_id(&e.b)?;
            g.add_edge(a, b, e.mark_a, e.mark_b)?;
        }
        Ok(g)
    }
}
