//! Curated re-export surface (unstable).
//!
//! One import path for callers outside the crate (the CLI and the Python
//! bindings). Module paths stay the source of truth; this list only groups
//! what a caller typically needs.

// Graphs and knowledge
pub use crate::graph::paths::{causal_order, dag_extension, is_dseparated, possible_dsep};
pub use crate::graph::random::{random_dag, RandomDagCfg};
pub use crate::graph::{Edge, EdgeRecord, Endpoint, Graph, GraphRecord, Node, NodeId, Triple, VarKind};
pub use crate::knowledge::{Knowledge, KnowledgeSpec};
// Oracles
pub use crate::oracle::{DSepTest, IndependenceResult, IndependenceTest, Score, TestScore};
// Components
pub use crate::boss::{boss_local, Boss, BossCfg, BossResult, BossSummary, LocalCfg, LocalResult};
pub use crate::fas::{Fas, FasCfg, FasResult};
pub use crate::orient::{MeekRules, OrientCfg, OrientMode, OrientReport, Orienter};
pub use crate::scorer::{OrderScorer, ParentMode, ScorerCfg};
pub use crate::sepset::{MapSepsets, SepsetCfg, SepsetMap, SepsetProducer, SepsetStrategy, TestSepsets};
// Pipelines and plumbing
pub use crate::cancel::CancelToken;
pub use crate::error::SearchError;
pub use crate::replay::ReplayToken;
pub use crate::search::{BossPagCfg, FciCfg, PcCfg, Pipeline, SearchOutput};
