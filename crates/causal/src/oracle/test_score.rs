//! A score read off an independence test.

use crate::error::OracleError;
use crate::graph::{Node, NodeId};

use super::{check_or_dependent, IndependenceTest, Score};

/// `local_score(y, P) = −|P|`; adding `x` to the parents `z` of `y` gains +1
/// when the test finds `x` and `y` dependent given `z`, −1 otherwise.
///
/// Under the order scorer's grow-shrink this yields the minimal parent sets of
/// an order, so permutation search becomes a search for the sparsest order.
#[derive(Clone, Debug)]
pub struct TestScore<T> {
    test: T,
}

impl<T: IndependenceTest> TestScore<T> {
    pub fn new(test: T) -> Self {
        Self { test }
    }

    pub fn test(&self) -> &T {
        &self.test
    }
}

impl<T: IndependenceTest> Score for TestScore<T> {
    fn variables(&self) -> &[Node] {
        self.test.variables()
    }

    fn local_score(&self, _node: NodeId, parents: &[NodeId]) -> Result<f64, OracleError> {
        Ok(-(parents.len() as f64))
    }

    fn local_score_diff(&self, x: NodeId, y: NodeId, z: &[NodeId]) -> Result<f64, OracleError> {
        if check_or_dependent(&self.test, x, y, z).independent {
            Ok(-1.0)
        } else {
            Ok(1.0)
        }
    }
}
