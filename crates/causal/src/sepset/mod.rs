//! Separating sets: the FAS record and on-demand producers.
//!
//! Purpose
//! - The orientation rules ask one question about non-adjacent `x`, `y`:
//!   which conditioning set, if any, separates them? [`SepsetProducer`] is that
//!   contract. [`MapSepsets`] answers from the record FAS wrote;
//!   [`TestSepsets`] searches with an independence test using one of four
//!   strategies (greedy, min-p, max-p, possible-d-sep).
//!
//! Why this design
//! - Collider decisions derive from `sepset` alone ([`SepsetProducer::classify`]),
//!   so the rule engine behaves identically whichever producer is plugged in.

mod producers;

pub use producers::{MapSepsets, SepsetCfg, SepsetStrategy, TestSepsets};

use std::collections::HashMap;

use crate::graph::NodeId;

/// A separating set and the p-value of the test that found it.
#[derive(Clone, Debug, PartialEq)]
pub struct Sepset {
    pub set: Vec<NodeId>,
    pub p_value: f64,
}

/// Unordered pair → separating set. Each pair is written at most once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SepsetMap {
    map: HashMap<(NodeId, NodeId), Sepset>,
}

#[inline]
fn key(x: NodeId, y: NodeId) -> (NodeId, NodeId) {
    if x <= y {
        (x, y)
    } else {
        (y, x)
    }
}

impl SepsetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `set` for `{x, y}`; the set is stored sorted. Returns false and
    /// keeps the existing entry if the pair was already recorded.
    pub fn set(&mut self, x: NodeId, y: NodeId, mut set: Vec<NodeId>, p_value: f64) -> bool {
        set.sort_unstable();
        match self.map.entry(key(x, y)) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(Sepset { set, p_value });
                true
            }
        }
    }

    pub fn get(&self, x: NodeId, y: NodeId) -> Option<&Sepset> {
        self.map.get(&key(x, y))
    }

    pub fn sepset(&self, x: NodeId, y: NodeId) -> Option<&[NodeId]> {
        self.get(x, y).map(|s| s.set.as_slice())
    }

    pub fn contains(&self, x: NodeId, y: NodeId) -> bool {
        self.map.contains_key(&key(x, y))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Entries sorted by pair.
    pub fn entries(&self) -> Vec<((NodeId, NodeId), &Sepset)> {
        let mut out: Vec<_> = self.map.iter().map(|(k, v)| (*k, v)).collect();
        out.sort_unstable_by_key(|(k, _)| *k);
        out
    }
}

/// What a sepset says about the middle of `x - y - z`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TripleClass {
    /// `y` is outside the separating set of `x` and `z`.
    Collider,
    /// `y` is inside it.
    Noncollider,
    /// No separating set is known.
    Unknown,
}

pub trait SepsetProducer: Send + Sync {
    /// A set separating `x` and `y`, if one is known or can be found.
    fn sepset(&self, x: NodeId, y: NodeId) -> Option<Vec<NodeId>>;

    fn classify(&self, x: NodeId, y: NodeId, z: NodeId) -> TripleClass {
        match self.sepset(x, z) {
            Some(s) if s.contains(&y) => TripleClass::Noncollider,
            Some(_) => TripleClass::Collider,
            None => TripleClass::Unknown,
        }
    }

    fn is_collider(&self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        self.classify(x, y, z) == TripleClass::Collider
    }

    fn is_noncollider(&self, x: NodeId, y: NodeId, z: NodeId) -> bool {
        self.classify(x, y, z) == TripleClass::Noncollider
    }
}
