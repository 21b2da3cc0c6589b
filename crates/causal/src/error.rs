//! Error types shared across the crate.
//!
//! Oracle failures never leave this crate as errors: call sites recover them
//! into sentinels (score = −∞, test = dependent). The enums below cover the
//! remaining failure surface: bad configuration, bad graph edits and bad
//! background knowledge.

use thiserror::Error;

/// Errors surfaced by graph construction and mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node index {0} is out of range")]
    UnknownNode(usize),
    #[error("node name '{0}' is not in the graph")]
    UnknownName(String),
    #[error("node name '{0}' appears more than once")]
    DuplicateNode(String),
    #[error("self loop on node {0}")]
    SelfLoop(String),
    #[error("an edge between {0} and {1} already exists")]
    DuplicateEdge(String, String),
    #[error("no edge between {0} and {1}")]
    MissingEdge(String, String),
}

/// Errors surfaced while assembling background knowledge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KnowledgeError {
    #[error("{from} --> {to} cannot be both required and forbidden")]
    Conflict { from: String, to: String },
    #[error("knowledge pair {0} --> {0} refers to a single variable")]
    SelfPair(String),
    #[error("variable '{0}' is not known")]
    UnknownVariable(String),
    #[error("variable '{name}' is already placed in tier {tier}")]
    AlreadyTiered { name: String, tier: usize },
}

/// Failures reported by Score and IndependenceTest implementations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("numeric failure: {0}")]
    Numeric(String),
    #[error("unsupported query: {0}")]
    Unsupported(String),
}

/// Errors surfaced by searches and their configuration.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("worker pool: {0}")]
    ThreadPool(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
}

impl SearchError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        SearchError::InvalidArgument(msg.into())
    }
}

impl From<rayon::ThreadPoolBuildError> for SearchError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        SearchError::ThreadPool(err.to_string())
    }
}
