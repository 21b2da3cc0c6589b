use std::sync::Arc;

use proptest::prelude::*;

use super::*;
use crate::error::OracleError;
use crate::graph::random::{random_dag, RandomDagCfg};
use crate::graph::Node;
use crate::oracle::{DSepTest, IndependenceResult};
use crate::replay::ReplayToken;

fn n(i: usize) -> NodeId {
    NodeId(i)
}

/// A --> C <-- B, C --> D
fn collider_chain() -> Graph {
    let mut dag = Graph::from_names(&["A", "B", "C", "D"]).unwrap();
    dag.add_directed(n(0), n(2)).unwrap();
    dag.add_directed(n(1), n(2)).unwrap();
    dag.add_directed(n(2), n(3)).unwrap();
    dag
}

fn skeleton_of(dag: &Graph) -> Graph {
    let mut g = dag.clone();
    g.reorient_all_with(Endpoint::Tail);
    g
}

/// Cancels `token` on the first query with a conditioning set of `at` nodes.
struct CancelAtDepth {
    inner: DSepTest,
    at: usize,
    token: CancelToken,
}

impl IndependenceTest for CancelAtDepth {
    fn variables(&self) -> &[Node] {
        self.inner.variables()
    }

    fn check(&self, x: NodeId, y: NodeId, z: &[NodeId]) -> Result<IndependenceResult, OracleError> {
        if z.len() == self.at {
            self.token.cancel();
        }
        self.inner.check(x, y, z)
    }
}

/// Every query fails.
struct Broken {
    vars: Vec<Node>,
}

impl IndependenceTest for Broken {
    fn variables(&self) -> &[Node] {
        &self.vars
    }

    fn check(&self, _: NodeId, _: NodeId, _: &[NodeId]) -> Result<IndependenceResult, OracleError> {
        Err(OracleError::Numeric("singular matrix".into()))
    }
}

#[test]
fn four_variable_scenario_skeleton_and_sepsets() {
    let test = Arc::new(DSepTest::new(collider_chain()).unwrap());
    let out = Fas::new(test, FasCfg::default()).unwrap().search().unwrap();
    assert_eq!(out.graph.edge_strings(), vec!["A --- C", "B --- C", "C --- D"]);
    assert_eq!(out.sepsets.sepset(n(0), n(1)), Some(&[][..]));
    assert_eq!(out.sepsets.sepset(n(0), n(3)), Some(&[n(2)][..]));
    assert_eq!(out.sepsets.sepset(n(1), n(3)), Some(&[n(2)][..]));
    assert_eq!(out.sepsets.len(), 3);
    // C keeps three neighbours, so depth 2 is scanned before stopping.
    assert_eq!(out.depth_reached, Some(2));
    assert!(!out.stopped_early);
}

#[test]
fn depth_bound_limits_conditioning_sets() {
    let test = Arc::new(DSepTest::new(collider_chain()).unwrap());
    let cfg = FasCfg {
        depth: 0,
        ..FasCfg::default()
    };
    let out = Fas::new(test, cfg).unwrap().search().unwrap();
    // Only the marginal independence A _||_ B is found.
    assert_eq!(out.graph.num_edges(), 5);
    assert!(!out.graph.is_adjacent(n(0), n(1)));
}

#[test]
fn cancellation_mid_depth_discards_that_depth() {
    let token = CancelToken::new();
    let test = Arc::new(CancelAtDepth {
        inner: DSepTest::new(collider_chain()).unwrap(),
        at: 1,
        token: token.clone(),
    });
    let out = Fas::new(test, FasCfg::default())
        .unwrap()
        .with_cancel(token)
        .search()
        .unwrap();
    assert!(out.stopped_early);
    assert_eq!(out.depth_reached, Some(0));
    let truth = skeleton_of(&collider_chain());
    for e in truth.edges() {
        assert!(out.graph.is_adjacent(e.a, e.b));
    }
    // Depth-0 removal applied in full, nothing from depth 1.
    assert!(!out.graph.is_adjacent(n(0), n(1)));
    assert!(out.graph.is_adjacent(n(0), n(3)));
    assert_eq!(out.sepsets.len(), 1);
}

#[test]
fn failing_tests_keep_every_edge() {
    let vars: Vec<Node> = ["A", "B", "C"].iter().map(|s| Node::continuous(*s)).collect();
    let out = Fas::new(Arc::new(Broken { vars }), FasCfg::default())
        .unwrap()
        .search()
        .unwrap();
    assert_eq!(out.graph.num_edges(), 3);
    assert!(out.sepsets.is_empty());
}

#[test]
fn knowledge_keeps_required_edges_and_drops_doubly_forbidden() {
    let test = Arc::new(DSepTest::new(collider_chain()).unwrap());
    let k = Knowledge::builder()
        .set_required("A", "B")
        .unwrap()
        .set_forbidden("C", "D")
        .unwrap()
        .set_forbidden("D", "C")
        .unwrap()
        .build();
    let out = Fas::new(test, FasCfg::default())
        .unwrap()
        .with_knowledge(k)
        .search()
        .unwrap();
    assert!(out.graph.is_adjacent(n(0), n(1)));
    assert!(!out.graph.is_adjacent(n(2), n(3)));
    assert!(out.sepsets.sepset(n(2), n(3)).is_none());
}

#[test]
fn invalid_configuration_is_rejected() {
    let test: Arc<dyn IndependenceTest> = Arc::new(DSepTest::new(collider_chain()).unwrap());
    let bad_depth = FasCfg {
        depth: -2,
        ..FasCfg::default()
    };
    assert!(matches!(
        Fas::new(test.clone(), bad_depth),
        Err(SearchError::InvalidArgument(_))
    ));
    let no_threads = FasCfg {
        num_threads: Some(0),
        ..FasCfg::default()
    };
    assert!(Fas::new(test, no_threads).is_err());
}

#[test]
fn initial_graph_must_match_variables() {
    let test = Arc::new(DSepTest::new(collider_chain()).unwrap());
    let other = Graph::from_names(&["A", "B"]).unwrap();
    assert!(Fas::new(test, FasCfg::default())
        .unwrap()
        .search_from(other)
        .is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn skeleton_is_stable_and_exact(seed in 0u64..1_000, nodes in 4usize..9, extra in 0usize..6) {
        let max_edges = nodes * (nodes - 1) / 2;
        let cfg = RandomDagCfg { num_nodes: nodes, num_edges: (nodes - 1 + extra).min(max_edges) };
        let dag = random_dag(cfg, ReplayToken::new(seed, 0)).unwrap();
        let test = Arc::new(DSepTest::new(dag.clone()).unwrap());

        let one = Fas::new(test.clone(), FasCfg { num_threads: Some(1), ..FasCfg::default() })
            .unwrap()
            .search()
            .unwrap();
        let many = Fas::new(test.clone(), FasCfg { num_threads: Some(4), ..FasCfg::default() })
            .unwrap()
            .search()
            .unwrap();
        prop_assert!(one.graph.same_skeleton(&skeleton_of(&dag)));
        prop_assert_eq!(&one.graph, &many.graph);
        prop_assert_eq!(&one.sepsets, &many.sepsets);

        // Same start graph built by inserting edges in reverse order.
        let mut reversed = Graph::new(dag.nodes().to_vec()).unwrap();
        let complete = Graph::complete(dag.nodes().to_vec()).unwrap();
        for e in complete.edges().iter().rev() {
            reversed.add_undirected(e.b, e.a).unwrap();
        }
        let again = Fas::new(test, FasCfg::default()).unwrap().search_from(reversed).unwrap();
        prop_assert_eq!(&one.graph, &again.graph);
        prop_assert_eq!(&one.sepsets, &again.sepsets);
    }
}
