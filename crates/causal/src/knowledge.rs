//! Background knowledge: temporal tiers plus explicit forbidden/required pairs.
//!
//! Purpose
//! - Constrain which directed relations a search may introduce. Consumed
//!   read-only by FAS (possible parents, edges that may not be removed), the
//!   order scorer (forced and excluded parents), BOSS (order validity) and the
//!   orientation rules (arrowheads that may not be placed).
//!
//! Why this design
//! - `Knowledge` is an immutable value behind an `Arc`; handing it to a
//!   component is a cheap clone and no component can change what another sees.
//!   Edits go through [`KnowledgeBuilder`], which rejects explicit
//!   required/forbidden contradictions up front. Contradictions that only arise
//!   through tiers (a required pair pointing backwards in time) are allowed,
//!   logged once at build time and reported by [`Knowledge::conflicts`]; the
//!   consumers then skip whichever orientation would break one side.
//! - Searches work on `NodeId`s, so [`Knowledge::bind`] precomputes an
//!   index-based lookup table for a given variable list.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::KnowledgeError;
use crate::graph::{Graph, Node, NodeId};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Inner {
    tiers: Vec<Vec<String>>,
    tier_of: HashMap<String, usize>,
    forbidden_within: BTreeSet<usize>,
    forbidden: BTreeSet<(String, String)>,
    required: BTreeSet<(String, String)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Knowledge {
    inner: Arc<Inner>,
}

impl Knowledge {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> KnowledgeBuilder {
        KnowledgeBuilder::default()
    }

    pub fn is_empty(&self) -> bool {
        let k = &self.inner;
        k.tier_of.is_empty() && k.forbidden.is_empty() && k.required.is_empty()
    }

    pub fn tiers(&self) -> &[Vec<String>] {
        &self.inner.tiers
    }

    pub fn tier_of(&self, name: &str) -> Option<usize> {
        self.inner.tier_of.get(name).copied()
    }

    /// `from` sits in a later tier than `to`, or both share a tier whose
    /// members may not cause each other.
    pub fn is_forbidden_by_tiers(&self, from: &str, to: &str) -> bool {
        match (self.tier_of(from), self.tier_of(to)) {
            (Some(a), Some(b)) => a > b || (a == b && self.inner.forbidden_within.contains(&a)),
            _ => false,
        }
    }

    pub fn is_explicitly_forbidden(&self, from: &str, to: &str) -> bool {
        self.inner
            .forbidden
            .contains(&(from.to_string(), to.to_string()))
    }

    pub fn is_forbidden(&self, from: &str, to: &str) -> bool {
        self.is_forbidden_by_tiers(from, to) || self.is_explicitly_forbidden(from, to)
    }

    pub fn is_required(&self, from: &str, to: &str) -> bool {
        self.inner
            .required
            .contains(&(from.to_string(), to.to_string()))
    }

    /// Neither direction between `x` and `y` is required.
    pub fn no_edge_required(&self, x: &str, y: &str) -> bool {
        !(self.is_required(x, y) || self.is_required(y, x))
    }

    pub fn forbidden_pairs(&self) -> impl Iterator<Item = &(String, String)> {
        self.inner.forbidden.iter()
    }

    pub fn required_pairs(&self) -> impl Iterator<Item = &(String, String)> {
        self.inner.required.iter()
    }

    /// Required pairs that the tiers forbid.
    pub fn conflicts(&self) -> Vec<(String, String)> {
        self.inner
            .required
            .iter()
            .filter(|(a, b)| self.is_forbidden_by_tiers(a, b))
            .cloned()
            .collect()
    }

    /// Whether `g` has a directed edge the knowledge forbids, or misses a
    /// required one.
    pub fn is_violated_by(&self, g: &Graph) -> bool {
        for e in g.edges() {
            let (from, to) = if g.is_directed(e.a, e.b) {
                (e.a, e.b)
            } else if g.is_directed(e.b, e.a) {
                (e.b, e.a)
            } else {
                continue;
            };
            if self.is_forbidden(g.name(from), g.name(to)) {
                return true;
            }
        }
        self.inner.required.iter().any(|(a, b)| {
            match (g.id_of(a), g.id_of(b)) {
                (Some(x), Some(y)) => !g.is_directed(x, y),
                _ => false,
            }
        })
    }

    /// Every name the knowledge mentions must be one of `nodes`.
    pub fn check_names(&self, nodes: &[Node]) -> Result<(), KnowledgeError> {
        let known: BTreeSet<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        let k = &self.inner;
        let mentioned = k
            .tier_of
            .keys()
            .chain(k.forbidden.iter().flat_map(|(a, b)| [a, b]))
            .chain(k.required.iter().flat_map(|(a, b)| [a, b]));
        for name in mentioned {
            if !known.contains(name.as_str()) {
                return Err(KnowledgeError::UnknownVariable(name.clone()));
            }
        }
        Ok(())
    }

    /// Index-based lookup table for `nodes`. Names the knowledge mentions but
    /// `nodes` lacks are ignored.
    pub fn bind(&self, nodes: &[Node]) -> BoundKnowledge {
        if self.is_empty() {
            return BoundKnowledge::default();
        }
        let n = nodes.len();
        let mut forbidden = vec![false; n * n];
        let mut required = vec![false; n * n];
        for (i, a) in nodes.iter().enumerate() {
            for (j, b) in nodes.iter().enumerate() {
                if i == j {
                    continue;
                }
                forbidden[i * n + j] = self.is_forbidden(&a.name, &b.name);
                required[i * n + j] = self.is_required(&a.name, &b.name);
            }
        }
        BoundKnowledge {
            n,
            forbidden,
            required,
            source: self.clone(),
        }
    }

    pub fn to_spec(&self) -> KnowledgeSpec {
        let k = &self.inner;
        KnowledgeSpec {
            tiers: k.tiers.clone(),
            forbidden_within_tiers: k.forbidden_within.iter().copied().collect(),
            forbidden: k.forbidden.iter().cloned().collect(),
            required: k.required.iter().cloned().collect(),
        }
    }
}

/// Accumulates knowledge and freezes it into a [`Knowledge`].
#[derive(Clone, Debug, Default)]
pub struct KnowledgeBuilder {
    inner: Inner,
}

impl KnowledgeBuilder {
    /// Place `name` in `tier`. Tiers are created on demand.
    pub fn add_to_tier(mut self, tier: usize, name: &str) -> Result<Self, KnowledgeError> {
        if let Some(&t) = self.inner.tier_of.get(name) {
            if t == tier {
                return Ok(self);
            }
            return Err(KnowledgeError::AlreadyTiered {
                name: name.to_string(),
                tier: t,
            });
        }
        if self.inner.tiers.len() <= tier {
            self.inner.tiers.resize(tier + 1, Vec::new());
        }
        self.inner.tiers[tier].push(name.to_string());
        self.inner.tier_of.insert(name.to_string(), tier);
        Ok(self)
    }

    pub fn set_tier_forbidden_within(mut self, tier: usize, forbidden: bool) -> Self {
        if forbidden {
            self.inner.forbidden_within.insert(tier);
        } else {
            self.inner.forbidden_within.remove(&tier);
        }
        self
    }

    pub fn set_forbidden(mut self, from: &str, to: &str) -> Result<Self, KnowledgeError> {
        let pair = pair(from, to)?;
        if self.inner.required.contains(&pair) {
            return Err(KnowledgeError::Conflict {
                from: pair.0,
                to: pair.1,
            });
        }
        self.inner.forbidden.insert(pair);
        Ok(self)
    }

    pub fn set_required(mut self, from: &str, to: &str) -> Result<Self, KnowledgeError> {
        let pair = pair(from, to)?;
        if self.inner.forbidden.contains(&pair) {
            return Err(KnowledgeError::Conflict {
                from: pair.0,
                to: pair.1,
            });
        }
        self.inner.required.insert(pair);
        Ok(self)
    }

    pub fn build(self) -> Knowledge {
        let k = Knowledge {
            inner: Arc::new(self.inner),
        };
        for (from, to) in k.conflicts() {
            tracing::warn!(from, to, "required edge points against the tier order");
        }
        k
    }
}

fn pair(from: &str, to: &str) -> Result<(String, String), KnowledgeError> {
    if from == to {
        return Err(KnowledgeError::SelfPair(from.to_string()));
    }
    Ok((from.to_string(), to.to_string()))
}

/// Index-based view of a [`Knowledge`] over a fixed variable list.
#[derive(Clone, Debug, Default)]
pub struct BoundKnowledge {
    n: usize,
    forbidden: Vec<bool>,
    required: Vec<bool>,
    source: Knowledge,
}

impl BoundKnowledge {
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.source
    }

    #[inline]
    fn slot(&self, from: NodeId, to: NodeId) -> Option<usize> {
        (from.0 < self.n && to.0 < self.n).then(|| from.0 * self.n + to.0)
    }

    #[inline]
    pub fn is_forbidden(&self, from: NodeId, to: NodeId) -> bool {
        self.slot(from, to).map_or(false, |i| self.forbidden[i])
    }

    #[inline]
    pub fn is_required(&self, from: NodeId, to: NodeId) -> bool {
        self.slot(from, to).map_or(false, |i| self.required[i])
    }

    #[inline]
    pub fn no_edge_required(&self, x: NodeId, y: NodeId) -> bool {
        !(self.is_required(x, y) || self.is_required(y, x))
    }

    /// `z` may be a parent of `x`.
    #[inline]
    pub fn possible_parent_of(&self, z: NodeId, x: NodeId) -> bool {
        !self.is_forbidden(z, x) && !self.is_required(x, z)
    }

    /// Some earlier node in `order` is forbidden to precede a later one, or a
    /// later node is required to cause an earlier one.
    pub fn violated_by_order(&self, order: &[NodeId]) -> bool {
        if self.is_empty() {
            return false;
        }
        for i in 0..order.len() {
            for j in i + 1..order.len() {
                if self.is_forbidden(order[i], order[j]) || self.is_required(order[j], order[i]) {
                    return true;
                }
            }
        }
        false
    }

    /// Stable rearrangement of `order` that honours every "must precede"
    /// relation (`a` required to cause `b`, or `b` forbidden to cause `a`).
    /// Among ready nodes the earliest in `order` goes first; when the relations
    /// are cyclic the earliest remaining node is placed regardless.
    pub fn valid_order(&self, order: &[NodeId]) -> Vec<NodeId> {
        if self.is_empty() {
            return order.to_vec();
        }
        let must_precede = |a: NodeId, b: NodeId| self.is_required(a, b) || self.is_forbidden(b, a);
        let mut remaining: Vec<NodeId> = order.to_vec();
        let mut out = Vec::with_capacity(order.len());
        while !remaining.is_empty() {
            let pick = remaining
                .iter()
                .position(|&b| !remaining.iter().any(|&a| a != b && must_precede(a, b)));
            let i = match pick {
                Some(i) => i,
                None => {
                    tracing::warn!("knowledge ordering constraints are cyclic");
                    0
                }
            };
            out.push(remaining.remove(i));
        }
        out
    }
}

/// Serializable knowledge, e.g. loaded from JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSpec {
    #[serde(default)]
    pub tiers: Vec<Vec<String>>,
    #[serde(default)]
    pub forbidden_within_tiers: Vec<usize>,
    #[serde(default)]
    pub forbidden: Vec<(String, String)>,
    #[serde(default)]
    pub required: Vec<(String, String)>,
}

impl TryFrom<&KnowledgeSpec> for Knowledge {
    type Error = KnowledgeError;

    fn try_from(spec: &KnowledgeSpec) -> Result<Self, Self::Error> {
        let mut b = Knowledge::builder();
        for (t, names) in spec.tiers.iter().enumerate() {
            for name in names {
                b = b.add_to_tier(t, name)?;
            }
        }
        for &t in &spec.forbidden_within_tiers {
            b = b.set_tier_forbidden_within(t, true);
        }
        for (from, to) in &spec.forbidden {
            b = b.set_forbidden(from, to)?;
        }
        for (from, to) in &spec.required {
            b = b.set_required(from, to)?;
        }
        Ok(b.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn nodes(names: &[&str]) -> Vec<Node> {
        names.iter().map(|n| Node::continuous(*n)).collect()
    }

    #[test]
    fn tiers_forbid_backwards_relations() {
        let k = Knowledge::builder()
            .add_to_tier(0, "A")
            .unwrap()
            .add_to_tier(1, "B")
            .unwrap()
            .add_to_tier(1, "C")
            .unwrap()
            .build();
        assert!(k.is_forbidden("B", "A"));
        assert!(!k.is_forbidden("A", "B"));
        assert!(!k.is_forbidden("B", "C"));
        let k = Knowledge::try_from(&KnowledgeSpec {
            tiers: vec![vec!["A".into()], vec!["B".into(), "C".into()]],
            forbidden_within_tiers: vec![1],
            ..Default::default()
        })
        .unwrap();
        assert!(k.is_forbidden("B", "C"));
        assert!(k.is_forbidden("C", "B"));
        assert!(!k.is_forbidden("D", "A"));
    }

    #[test]
    fn explicit_conflicts_are_rejected() {
        let err = Knowledge::builder()
            .set_required("A", "B")
            .unwrap()
            .set_forbidden("A", "B")
            .unwrap_err();
        assert_eq!(
            err,
            KnowledgeError::Conflict {
                from: "A".into(),
                to: "B".into()
            }
        );
        assert!(Knowledge::builder().set_forbidden("A", "A").is_err());
        assert!(Knowledge::builder()
            .add_to_tier(0, "A")
            .unwrap()
            .add_to_tier(2, "A")
            .is_err());
    }

    #[test]
    fn tier_conflicts_are_reported_not_rejected() {
        let k = Knowledge::builder()
            .add_to_tier(0, "A")
            .unwrap()
            .add_to_tier(1, "B")
            .unwrap()
            .set_required("B", "A")
            .unwrap()
            .build();
        assert_eq!(k.conflicts(), vec![("B".to_string(), "A".to_string())]);
        assert!(k.is_required("B", "A") && k.is_forbidden("B", "A"));
        assert!(!k.no_edge_required("A", "B"));
    }

    #[test]
    fn bound_lookup_matches_names() {
        let k = Knowledge::builder()
            .set_forbidden("A", "C")
            .unwrap()
            .set_required("B", "C")
            .unwrap()
            .build();
        let vars = nodes(&["A", "B", "C"]);
        let b = k.bind(&vars);
        assert!(b.is_forbidden(NodeId(0), NodeId(2)));
        assert!(!b.is_forbidden(NodeId(2), NodeId(0)));
        assert!(b.is_required(NodeId(1), NodeId(2)));
        assert!(!b.possible_parent_of(NodeId(0), NodeId(2)));
        assert!(!b.possible_parent_of(NodeId(2), NodeId(1)));
        assert!(b.possible_parent_of(NodeId(1), NodeId(2)));
        assert!(Knowledge::empty().bind(&vars).is_empty());
        assert!(k.check_names(&vars).is_ok());
        assert!(k.check_names(&nodes(&["A", "B"])).is_err());
    }

    #[test]
    fn valid_order_is_stable() {
        // C must precede A (A --> C forbidden), B must precede C (required).
        let k = Knowledge::builder()
            .set_forbidden("A", "C")
            .unwrap()
            .set_required("B", "C")
            .unwrap()
            .build();
        let b = k.bind(&nodes(&["A", "B", "C", "D"]));
        let (a, bb, c, d) = (NodeId(0), NodeId(1), NodeId(2), NodeId(3));
        let order = b.valid_order(&[a, bb, c, d]);
        assert_eq!(order, vec![bb, c, a, d]);
        assert!(!b.violated_by_order(&order));
        assert!(b.violated_by_order(&[a, bb, c, d]));
        assert_eq!(b.valid_order(&[d, c, bb, a]), vec![d, bb, c, a]);
    }

    #[test]
    fn violated_by_checks_directed_edges_and_required_pairs() {
        let mut g = Graph::from_names(&["A", "B", "C"]).unwrap();
        let k = Knowledge::builder()
            .set_forbidden("A", "B")
            .unwrap()
            .set_required("B", "C")
            .unwrap()
            .build();
        g.add_directed(NodeId(1), NodeId(2)).unwrap();
        assert!(!k.is_violated_by(&g));
        g.add_directed(NodeId(0), NodeId(1)).unwrap();
        assert!(k.is_violated_by(&g));
        g.remove_edge(NodeId(0), NodeId(1));
        g.remove_edge(NodeId(1), NodeId(2));
        assert!(k.is_violated_by(&g));
    }

    #[test]
    fn spec_round_trip() {
        let spec = KnowledgeSpec {
            tiers: vec![vec!["A".into()], vec!["B".into()]],
            forbidden_within_tiers: vec![],
            forbidden: vec![("C".into(), "A".into())],
            required: vec![("A".into(), "B".into())],
        };
        let k = Knowledge::try_from(&spec).unwrap();
        assert_eq!(k.to_spec(), spec);
        assert_eq!(k.tier_of("B"), Some(1));
    }
}
