//! Score and independence-test oracles.
//!
//! Purpose
//! - The searches never compute statistics themselves. They ask a [`Score`]
//!   for the local score of a node given a parent set, or an
//!   [`IndependenceTest`] whether two variables are independent given a
//!   conditioning set. Concrete statistics (BIC, Fisher-Z, ...) live outside
//!   this crate and plug in through these two traits.
//!
//! Why this design
//! - Oracle failures are recovered at the call site: [`score_or_neg_inf`]
//!   turns an error or a non-finite value into −∞, and [`check_or_dependent`]
//!   turns a failed test into "dependent". A failure never removes an edge and
//!   never aborts a search.
//! - Two exact oracles are bundled for testing and demos: [`DSepTest`]
//!   (d-separation in a known DAG) and [`TestScore`] (a score that counts
//!   dependencies reported by any test).

mod dsep;
mod test_score;

pub use dsep::DSepTest;
pub use test_score::TestScore;

use std::sync::Arc;

use crate::error::OracleError;
use crate::graph::{Node, NodeId};

/// Decomposable score over a fixed variable list. Higher is better.
pub trait Score: Send + Sync {
    fn variables(&self) -> &[Node];

    fn local_score(&self, node: NodeId, parents: &[NodeId]) -> Result<f64, OracleError>;

    /// Gain from adding `x` to the parents `z` of `y`.
    fn local_score_diff(&self, x: NodeId, y: NodeId, z: &[NodeId]) -> Result<f64, OracleError> {
        let mut with_x = Vec::with_capacity(z.len() + 1);
        with_x.extend_from_slice(z);
        with_x.push(x);
        Ok(self.local_score(y, &with_x)? - self.local_score(y, z)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndependenceResult {
    pub independent: bool,
    pub p_value: f64,
}

impl IndependenceResult {
    pub fn dependent() -> Self {
        Self {
            independent: false,
            p_value: 0.0,
        }
    }
}

/// Conditional independence oracle over a fixed variable list.
pub trait IndependenceTest: Send + Sync {
    fn variables(&self) -> &[Node];

    fn check(&self, x: NodeId, y: NodeId, z: &[NodeId]) -> Result<IndependenceResult, OracleError>;
}

impl<T: IndependenceTest + ?Sized> IndependenceTest for Arc<T> {
    fn variables(&self) -> &[Node] {
        (**self).variables()
    }

    fn check(&self, x: NodeId, y: NodeId, z: &[NodeId]) -> Result<IndependenceResult, OracleError> {
        (**self).check(x, y, z)
    }
}

/// Local score with failures and non-finite values mapped to −∞.
pub fn score_or_neg_inf(score: &dyn Score, node: NodeId, parents: &[NodeId]) -> f64 {
    finite_or_neg_inf(score.local_score(node, parents), "local_score")
}

/// Score gain with failures and non-finite values mapped to −∞.
pub fn diff_or_neg_inf(score: &dyn Score, x: NodeId, y: NodeId, z: &[NodeId]) -> f64 {
    finite_or_neg_inf(score.local_score_diff(x, y, z), "local_score_diff")
}

fn finite_or_neg_inf(r: Result<f64, OracleError>, what: &str) -> f64 {
    match r {
        Ok(v) if v.is_finite() => v,
        Ok(v) => {
            tracing::debug!(what, value = v, "non-finite score treated as -inf");
            f64::NEG_INFINITY
        }
        Err(err) => {
            tracing::warn!(what, %err, "score oracle failed; treated as -inf");
            f64::NEG_INFINITY
        }
    }
}

/// Independence check with failures mapped to "dependent".
pub fn check_or_dependent(
    test: &dyn IndependenceTest,
    x: NodeId,
    y: NodeId,
    z: &[NodeId],
) -> IndependenceResult {
    match test.check(x, y, z) {
        Ok(r) => r,
        Err(err) => {
            tracing::warn!(x = x.0, y = y.0, %err, "independence test failed; treated as dependent");
            IndependenceResult::dependent()
        }
    }
}
