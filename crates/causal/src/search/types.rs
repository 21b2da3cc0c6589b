use crate::boss::BossCfg;
use crate::error::SearchError;
use crate::fas::FasCfg;
use crate::graph::Graph;
use crate::orient::{OrientCfg, OrientMode, OrientReport};
use crate::scorer::ScorerCfg;
use crate::sepset::{SepsetCfg, SepsetMap};

/// FAS, then R0 and Meek propagation.
#[derive(Clone, Copy, Debug, Default)]
pub struct PcCfg {
    pub fas: FasCfg,
    /// `mode` must be [`OrientMode::Cpdag`].
    pub orient: OrientCfg,
}

impl PcCfg {
    pub fn validate(&self) -> Result<(), SearchError> {
        self.fas.validate()?;
        self.orient.validate()?;
        if self.orient.mode != OrientMode::Cpdag {
            return Err(SearchError::invalid("pc orients in cpdag mode"));
        }
        Ok(())
    }
}

/// FAS, R0 in PAG mode, possible-d-sep removal, then the FCI rules.
#[derive(Clone, Copy, Debug)]
pub struct FciCfg {
    pub fas: FasCfg,
    /// `mode` must be [`OrientMode::Pag`].
    pub orient: OrientCfg,
    /// Run the possible-d-sep removal step. Conditioning sets drawn from
    /// possible-d-sep are bounded by `fas.depth`; paths by
    /// `orient.max_path_length`.
    pub possible_dsep: bool,
}

impl Default for FciCfg {
    fn default() -> Self {
        Self {
            fas: FasCfg::default(),
            orient: OrientCfg::pag(),
            possible_dsep: true,
        }
    }
}

impl FciCfg {
    pub fn validate(&self) -> Result<(), SearchError> {
        self.fas.validate()?;
        self.orient.validate()?;
        if self.orient.mode != OrientMode::Pag {
            return Err(SearchError::invalid("fci orients in pag mode"));
        }
        Ok(())
    }
}

/// BOSS, removal of shielded-collider adjacencies, then the FCI rules.
#[derive(Clone, Copy, Debug)]
pub struct BossPagCfg {
    pub boss: BossCfg,
    pub scorer: ScorerCfg,
    /// `mode` must be [`OrientMode::Pag`].
    pub orient: OrientCfg,
    /// Greedy sepset search used for the removals and as the R0 fallback.
    pub sepset: SepsetCfg,
}

impl Default for BossPagCfg {
    fn default() -> Self {
        Self {
            boss: BossCfg::default(),
            scorer: ScorerCfg::default(),
            orient: OrientCfg::pag(),
            sepset: SepsetCfg::default(),
        }
    }
}

impl BossPagCfg {
    pub fn validate(&self) -> Result<(), SearchError> {
        self.boss.validate()?;
        self.orient.validate()?;
        self.sepset.validate()?;
        if self.orient.mode != OrientMode::Pag {
            return Err(SearchError::invalid("boss-pag orients in pag mode"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SearchOutput {
    /// CPDAG or PAG over the input variables.
    pub graph: Graph,
    /// Separating sets for every adjacency the pipeline removed.
    pub sepsets: SepsetMap,
    pub report: OrientReport,
    pub stopped_early: bool,
}
