//! Causal structure search over score and independence-test oracles.
//!
//! Layout
//! - `graph`: mixed graphs with per-edge endpoint marks, path utilities and
//!   random DAGs. `knowledge`: tiers and forbidden/required pairs.
//! - `oracle`: the `Score` and `IndependenceTest` traits plus two exact
//!   oracles over a known DAG.
//! - `fas`, `sepset`, `orient`: adjacency search, separating sets and the
//!   R0/Meek/FCI orientation rules.
//! - `scorer`, `boss`: the order scorer and BOSS permutation search, global
//!   and per-target.
//! - `search`: end-to-end pipelines (PC, FCI, BOSS followed by FCI
//!   orientation, local BOSS).
//!
//! Logging goes through `tracing`; this crate never installs a subscriber.

/// Per-step event: `info` when `$verbose`, `debug` otherwise.
macro_rules! step {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

pub mod api;
pub mod boss;
pub mod cancel;
pub mod choice;
pub mod error;
pub mod fas;
pub mod graph;
pub mod knowledge;
pub mod oracle;
pub mod orient;
pub mod replay;
pub mod scorer;
pub mod search;
pub mod sepset;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{GraphError, KnowledgeError, OracleError, SearchError};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::boss::{Boss, BossCfg, BossResult, LocalCfg, LocalResult};
    pub use crate::cancel::CancelToken;
    pub use crate::error::SearchError;
    pub use crate::graph::{Endpoint, Graph, Node, NodeId};
    pub use crate::knowledge::Knowledge;
    pub use crate::oracle::{DSepTest, IndependenceTest, Score, TestScore};
    pub use crate::orient::{OrientCfg, Orienter};
    pub use crate::search::{BossPagCfg, FciCfg, PcCfg, Pipeline, SearchOutput};
}
