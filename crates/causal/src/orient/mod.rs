//! Orientation rule engine: from a skeleton and separating sets to a CPDAG or PAG.
//!
//! Purpose
//! - R0 orients unshielded colliders from separating sets. The result is then
//!   propagated to a fixed point: Meek's rules R1–R4 for a CPDAG, or the FCI
//!   rules (R1–R3, the discriminating-path rule, and optionally R5–R10) for a
//!   PAG.
//!
//! Why this design
//! - The engine only reads adjacencies from its input. Marks are reset first
//!   (tails for a CPDAG, circles for a PAG), so running it on its own output
//!   reproduces that output exactly.
//! - Every mark change goes through a setter that consults the knowledge and
//!   refuses changes other than circle (or undirected) to something more
//!   specific. Rules can therefore only add information, which bounds the
//!   fixed-point loops by the number of marks, and a knowledge violation is
//!   skipped rather than raised.
//! - Iteration is over node indices and sorted adjacencies, so conflicting
//!   rule applications are always resolved the same way.
//!
//! References
//! - Meek (1995), "Causal inference and causal explanation with background
//!   knowledge".
//! - Zhang (2008), "On the completeness of orientation rules for causal
//!   discovery in the presence of latent confounders and selection bias".

mod fci;
mod meek;

pub use meek::MeekRules;

use crate::cancel::CancelToken;
use crate::choice::Choices;
use crate::error::SearchError;
use crate::graph::{Endpoint, Graph, NodeId, Triple};
use crate::knowledge::{BoundKnowledge, Knowledge};
use crate::sepset::{SepsetProducer, TripleClass};

use fci::FciRules;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientMode {
    /// No latent confounders: tails and arrows, Meek propagation.
    Cpdag,
    /// Possible latent confounders: circles, FCI propagation.
    Pag,
}

#[derive(Clone, Copy, Debug)]
pub struct OrientCfg {
    pub mode: OrientMode,
    /// PAG only: also apply R5–R10.
    pub complete_rule_set: bool,
    /// PAG only: apply the discriminating-path rule.
    pub discriminating_path_rule: bool,
    /// Longest path examined by path-based rules, in edges; −1 = no bound.
    pub max_path_length: i32,
    pub verbose: bool,
}

impl Default for OrientCfg {
    fn default() -> Self {
        Self {
            mode: OrientMode::Cpdag,
            complete_rule_set: true,
            discriminating_path_rule: true,
            max_path_length: -1,
            verbose: false,
        }
    }
}

impl OrientCfg {
    pub fn pag() -> Self {
        Self {
            mode: OrientMode::Pag,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_path_length < -1 {
            return Err(SearchError::invalid(format!(
                "max_path_length = {} (must be >= -1)",
                self.max_path_length
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrientReport {
    /// Unshielded colliders oriented by R0.
    pub colliders: Vec<Triple>,
    /// Unshielded triples with no usable decision.
    pub ambiguous: Vec<Triple>,
    /// Mark changes made after R0.
    pub propagated: usize,
    pub stopped_early: bool,
}

pub struct Orienter {
    knowledge: Knowledge,
    cfg: OrientCfg,
    cancel: CancelToken,
}

impl Orienter {
    pub fn new(cfg: OrientCfg) -> Result<Self, SearchError> {
        cfg.validate()?;
        Ok(Self {
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

    pub fn cfg(&self) -> &OrientCfg {
        &self.cfg
    }

    /// Orient `g` in place. Adjacencies are never changed.
    pub fn orient(&self, g: &mut Graph, sepsets: &dyn SepsetProducer) -> OrientReport {
        let k = self.knowledge.bind(g.nodes());
        let mut report = self.orient_colliders(g, sepsets, &k);
        match self.cfg.mode {
            OrientMode::Cpdag => {
                let meek = MeekRules::new(&k).verbose(self.cfg.verbose);
                report.propagated = meek.propagate(g);
            }
            OrientMode::Pag => {
                let rules = FciRules {
                    k: &k,
                    sepsets,
                    cfg: &self.cfg,
                    cancel: &self.cancel,
                };
                let (n, stopped) = rules.final_orientation(g);
                report.propagated = n;
                report.stopped_early = stopped;
            }
        }
        tracing::info!(
            mode = ?self.cfg.mode,
            colliders = report.colliders.len(),
            ambiguous = report.ambiguous.len(),
            propagated = report.propagated,
            "orientation finished"
        );
        report
    }

    /// R0 after resetting marks and applying knowledge-forced orientations.
    /// Leaves propagation to the caller.
    pub fn orient_colliders(
        &self,
        g: &mut Graph,
        sepsets: &dyn SepsetProducer,
        k: &BoundKnowledge,
    ) -> OrientReport {
        let reset = match self.cfg.mode {
            OrientMode::Cpdag => Endpoint::Tail,
            OrientMode::Pag => Endpoint::Circle,
        };
        g.reorient_all_with(reset);
        g.clear_triples();
        self.orient_by_knowledge(g, k);

        let mut report = OrientReport::default();
        for y in g.node_ids().collect::<Vec<_>>() {
            let adj = g.adjacent(y);
            for idx in Choices::new(adj.len(), 2) {
                let (x, z) = (adj[idx[0]], adj[idx[1]]);
                if g.is_adjacent(x, z) {
                    continue;
                }
                match sepsets.classify(x, y, z) {
                    TripleClass::Collider => {
                        if self.arrowhead_allowed(g, k, x, y) && self.arrowhead_allowed(g, k, z, y)
                        {
                            self.put_arrow(g, x, y);
                            self.put_arrow(g, z, y);
                            step!(
                                self.cfg.verbose,
                                x = g.name(x),
                                y = g.name(y),
                                z = g.name(z),
                                "collider"
                            );
                            report.colliders.push(Triple::new(x, y, z));
                        } else {
                            g.add_ambiguous_triple(x, y, z);
                            report.ambiguous.push(Triple::new(x, y, z));
                        }
                    }
                    TripleClass::Noncollider => {
                        g.add_underline_triple(x, y, z);
                    }
                    TripleClass::Unknown => {
                        g.add_ambiguous_triple(x, y, z);
                        report.ambiguous.push(Triple::new(x, y, z));
                    }
                }
            }
        }
        report
    }

    /// Required pairs become `a --> b`; a forbidden `a --> b` puts an
    /// arrowhead at `a`.
    fn orient_by_knowledge(&self, g: &mut Graph, k: &BoundKnowledge) {
        if k.is_empty() {
            return;
        }
        for e in g.edges() {
            for (a, b) in [(e.a, e.b), (e.b, e.a)] {
                if k.is_required(a, b) && !k.is_forbidden(a, b) {
                    match self.cfg.mode {
                        OrientMode::Cpdag => {
                            if g.is_undirected(a, b) {
                                let _ = g.orient_directed(a, b);
                            }
                        }
                        OrientMode::Pag => {
                            let _ = g.set_endpoint(b, a, Endpoint::Tail);
                            let _ = g.set_endpoint(a, b, Endpoint::Arrow);
                        }
                    }
                    step!(self.cfg.verbose, from = g.name(a), to = g.name(b), "required");
                } else if k.is_forbidden(a, b) && !k.is_required(a, b) {
                    match self.cfg.mode {
                        OrientMode::Cpdag => {
                            if g.is_undirected(a, b) && !k.is_forbidden(b, a) {
                                let _ = g.orient_directed(b, a);
                            }
                        }
                        OrientMode::Pag => {
                            if g.endpoint(b, a) == Some(Endpoint::Circle) {
                                let _ = g.set_endpoint(b, a, Endpoint::Arrow);
                            }
                        }
                    }
                }
            }
        }
    }

    /// May an arrowhead be placed at `y` on `x - y`?
    fn arrowhead_allowed(&self, g: &Graph, k: &BoundKnowledge, x: NodeId, y: NodeId) -> bool {
        match self.cfg.mode {
            OrientMode::Cpdag => {
                if g.is_directed(x, y) {
                    return true;
                }
                g.is_undirected(x, y) && !k.is_forbidden(x, y) && !k.is_required(y, x)
            }
            OrientMode::Pag => pag_arrowhead_allowed(g, k, x, y),
        }
    }

    fn put_arrow(&self, g: &mut Graph, x: NodeId, y: NodeId) {
        let _ = g.set_endpoint(x, y, Endpoint::Arrow);
        if self.cfg.mode == OrientMode::Cpdag {
            let _ = g.set_endpoint(y, x, Endpoint::Tail);
        }
    }
}

/// PAG arrowhead check: allowed on a circle unless the knowledge requires
/// `y --> x`, or forbids `x --> y` while `x` carries no arrowhead.
pub(crate) fn pag_arrowhead_allowed(g: &Graph, k: &BoundKnowledge, x: NodeId, y: NodeId) -> bool {
    match g.endpoint(x, y) {
        None | Some(Endpoint::Tail) => false,
        Some(Endpoint::Arrow) => true,
        Some(Endpoint::Circle) => {
            if k.is_required(y, x) {
                return false;
            }
            if k.is_forbidden(x, y) && g.endpoint(y, x) != Some(Endpoint::Arrow) {
                return false;
            }
            true
        }
    }
}

#[cfg(test)]
mod tests;
