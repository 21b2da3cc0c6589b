//! Plain data types for the graph model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a node inside a [`super::Graph`] and inside the oracle's variable list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Measurement type of a variable. Only carried along; no algorithm branches on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    #[default]
    Continuous,
    Discrete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub kind: VarKind,
}

impl Node {
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Continuous,
        }
    }

    pub fn discrete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Discrete,
        }
    }
}

/// Edge mark at one side of an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Tail,
    Arrow,
    Circle,
}

/// Snapshot of one edge. `a < b` always; `at_a`/`at_b` are the marks at each side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    pub at_a: Endpoint,
    pub at_b: Endpoint,
}

impl Edge {
    pub fn new(x: NodeId, y: NodeId, at_x: Endpoint, at_y: Endpoint) -> Self {
        if x <= y {
            Self {
                a: x,
                b: y,
                at_a: at_x,
                at_b: at_y,
            }
        } else {
            Self {
                a: y,
                b: x,
                at_a: at_y,
                at_b: at_x,
            }
        }
    }

    /// Mark at `n`, if `n` is one of the two ends.
    pub fn endpoint_at(&self, n: NodeId) -> Option<Endpoint> {
        if n == self.a {
            Some(self.at_a)
        } else if n == self.b {
            Some(self.at_b)
        } else {
            None
        }
    }

    /// The end that is not `n`.
    pub fn other(&self, n: NodeId) -> Option<NodeId> {
        if n == self.a {
            Some(self.b)
        } else if n == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn is_directed(&self) -> bool {
        matches!(
            (self.at_a, self.at_b),
            (Endpoint::Tail, Endpoint::Arrow) | (Endpoint::Arrow, Endpoint::Tail)
        )
    }

    pub fn is_undirected(&self) -> bool {
        self.at_a == Endpoint::Tail && self.at_b == Endpoint::Tail
    }
}

/// A path fragment `x - y - z` with `y` in the middle.
/// Ends are stored sorted, so `Triple::new(x, y, z) == Triple::new(z, y, x)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub x: NodeId,
    pub y: NodeId,
    pub z: NodeId,
}

impl Triple {
    pub fn new(x: NodeId, y: NodeId, z: NodeId) -> Self {
        if x <= z {
            Self { x, y, z }
        } else {
            Self { x: z, y, z: x }
        }
    }
}
