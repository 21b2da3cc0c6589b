use std::sync::Arc;

use proptest::prelude::*;

use super::fci::FciRules;
use super::*;
use crate::fas::{Fas, FasCfg};
use crate::graph::random::{random_dag, RandomDagCfg};
use crate::oracle::DSepTest;
use crate::replay::ReplayToken;
use crate::sepset::{MapSepsets, SepsetMap};

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

/// Skeleton and sepsets from FAS over a d-separation oracle.
fn learn(test: DSepTest) -> (Graph, MapSepsets) {
    let out = Fas::new(Arc::new(test), FasCfg::default())
        .unwrap()
        .search()
        .unwrap();
    (out.graph, MapSepsets::new(out.sepsets))
}

#[test]
fn four_variable_scenario_gives_the_cpdag() {
    let (mut g, sepsets) = learn(DSepTest::new(collider_chain()).unwrap());
    let report = Orienter::new(OrientCfg::default())
        .unwrap()
        .orient(&mut g, &sepsets);
    assert_eq!(g.edge_strings(), vec!["A --> C", "B --> C", "C --> D"]);
    assert_eq!(report.colliders, vec![Triple::new(n(0), n(2), n(1))]);
    assert!(report.ambiguous.is_empty());
    assert_eq!(report.propagated, 1);
    assert!(g.is_underline_triple(n(0), n(2), n(3)));
    assert!(g.is_def_collider(n(0), n(2), n(1)));
}

#[test]
fn orienting_twice_changes_nothing() {
    let (mut g, sepsets) = learn(DSepTest::new(collider_chain()).unwrap());
    for mode in [OrientCfg::default(), OrientCfg::pag()] {
        let engine = Orienter::new(mode).unwrap();
        engine.orient(&mut g, &sepsets);
        let once = g.clone();
        engine.orient(&mut g, &sepsets);
        assert_eq!(g, once);
    }
}

#[test]
fn forbidden_arrowhead_leaves_the_triple_ambiguous() {
    let (mut g, sepsets) = learn(DSepTest::new(collider_chain()).unwrap());
    let k = Knowledge::builder().set_forbidden("A", "C").unwrap().build();
    let report = Orienter::new(OrientCfg::default())
        .unwrap()
        .with_knowledge(k.clone())
        .orient(&mut g, &sepsets);
    assert_eq!(g.edge_strings(), vec!["B --- C", "C --- D", "C --> A"]);
    assert_eq!(report.ambiguous, vec![Triple::new(n(0), n(2), n(1))]);
    assert!(report.colliders.is_empty());
    assert!(g.is_ambiguous_triple(n(1), n(2), n(0)));
    assert!(!k.is_violated_by(&g));
}

#[test]
fn required_edge_is_kept_against_the_collider() {
    let (mut g, sepsets) = learn(DSepTest::new(collider_chain()).unwrap());
    let k = Knowledge::builder().set_required("C", "B").unwrap().build();
    Orienter::new(OrientCfg::default())
        .unwrap()
        .with_knowledge(k)
        .orient(&mut g, &sepsets);
    assert!(g.is_directed(n(2), n(1)));
    assert!(!g.is_directed(n(0), n(2)));
}

#[test]
fn latent_confounder_gives_a_bidirected_edge() {
    // A --> B <-- L --> C <-- D with L hidden.
    let mut dag = Graph::from_names(&["A", "B", "C", "D", "L"]).unwrap();
    dag.add_directed(n(0), n(1)).unwrap();
    dag.add_directed(n(4), n(1)).unwrap();
    dag.add_directed(n(4), n(2)).unwrap();
    dag.add_directed(n(3), n(2)).unwrap();
    let (mut g, sepsets) = learn(DSepTest::with_latents(dag, &["L"]).unwrap());
    let report = Orienter::new(OrientCfg::pag()).unwrap().orient(&mut g, &sepsets);
    assert_eq!(g.edge_strings(), vec!["A o-> B", "B <-> C", "D o-> C"]);
    assert_eq!(report.colliders.len(), 2);
    assert!(!report.stopped_early);
}

#[test]
fn pag_knowledge_turns_a_forbidden_arrow_around() {
    let (mut g, sepsets) = learn(DSepTest::new(collider_chain()).unwrap());
    let k = Knowledge::builder().set_forbidden("A", "C").unwrap().build();
    Orienter::new(OrientCfg::pag())
        .unwrap()
        .with_knowledge(k)
        .orient(&mut g, &sepsets);
    // The arrowhead at A goes in first, so the collider at C yields A <-> C.
    assert!(g.is_bidirected(n(0), n(2)));
    assert_eq!(g.endpoint(n(2), n(0)), Some(Endpoint::Arrow));
}

/// T o-> A <-> B, A --> C, B o-o C; <T, A, B, C> discriminates B.
fn discriminating_fixture() -> Graph {
    use Endpoint::{Arrow, Circle, Tail};
    let mut g = Graph::from_names(&["T", "A", "B", "C"]).unwrap();
    g.add_edge(n(0), n(1), Circle, Arrow).unwrap();
    g.add_edge(n(1), n(2), Arrow, Arrow).unwrap();
    g.add_edge(n(1), n(3), Tail, Arrow).unwrap();
    g.add_edge(n(2), n(3), Circle, Circle).unwrap();
    g
}

fn run_fci(g: &mut Graph, sepset_tc: Vec<NodeId>, max_path_length: i32) -> usize {
    let mut map = SepsetMap::new();
    map.set(n(0), n(3), sepset_tc, 1.0);
    let sepsets = MapSepsets::new(map);
    let k = Knowledge::empty().bind(g.nodes());
    let cfg = OrientCfg {
        complete_rule_set: false,
        max_path_length,
        ..OrientCfg::pag()
    };
    let cancel = CancelToken::new();
    let rules = FciRules {
        k: &k,
        sepsets: &sepsets,
        cfg: &cfg,
        cancel: &cancel,
    };
    rules.final_orientation(g).0
}

#[test]
fn discriminating_path_with_middle_in_sepset_orients_a_tail() {
    let mut g = discriminating_fixture();
    run_fci(&mut g, vec![n(1), n(2)], -1);
    assert!(g.is_directed(n(2), n(3)));
}

#[test]
fn discriminating_path_without_middle_in_sepset_orients_a_collider() {
    let mut g = discriminating_fixture();
    run_fci(&mut g, vec![n(1)], -1);
    assert!(g.is_bidirected(n(2), n(3)));
}

#[test]
fn short_path_bound_disables_the_discriminating_rule() {
    let mut g = discriminating_fixture();
    run_fci(&mut g, vec![n(1), n(2)], 2);
    // Only R2 fires: B o-> C.
    assert_eq!(g.endpoint(n(3), n(2)), Some(Endpoint::Circle));
    assert_eq!(g.endpoint(n(2), n(3)), Some(Endpoint::Arrow));
}

#[test]
fn r6_propagates_tails_along_undirected_edges() {
    use Endpoint::{Circle, Tail};
    // A --- B o-o C
    let mut g = Graph::from_names(&["A", "B", "C"]).unwrap();
    g.add_edge(n(0), n(1), Tail, Tail).unwrap();
    g.add_edge(n(1), n(2), Circle, Circle).unwrap();
    let k = Knowledge::empty().bind(g.nodes());
    let cfg = OrientCfg::pag();
    let cancel = CancelToken::new();
    let sepsets = MapSepsets::new(SepsetMap::new());
    let rules = FciRules {
        k: &k,
        sepsets: &sepsets,
        cfg: &cfg,
        cancel: &cancel,
    };
    rules.final_orientation(&mut g);
    assert_eq!(g.endpoint(n(2), n(1)), Some(Tail));
    assert_eq!(g.endpoint(n(1), n(2)), Some(Circle));
}

#[test]
fn r5_turns_an_uncovered_circle_cycle_into_tails() {
    use Endpoint::Tail;
    // A o-o B o-o C o-o D o-o A, no chords.
    let mut g = Graph::from_names(&["A", "B", "C", "D"]).unwrap();
    for (x, y) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
        g.add_nondirected(n(x), n(y)).unwrap();
    }
    let k = Knowledge::empty().bind(g.nodes());
    let cfg = OrientCfg::pag();
    let cancel = CancelToken::new();
    let sepsets = MapSepsets::new(SepsetMap::new());
    let rules = FciRules {
        k: &k,
        sepsets: &sepsets,
        cfg: &cfg,
        cancel: &cancel,
    };
    // Four edges, two marks each, every mark counted once.
    assert_eq!(rules.final_orientation(&mut g), (8, false));
    for e in g.edges() {
        assert_eq!((e.at_a, e.at_b), (Tail, Tail));
    }
    assert_eq!(rules.final_orientation(&mut g), (0, false));
}

#[test]
fn cancelled_pag_run_reports_early_stop() {
    let (mut g, sepsets) = learn(DSepTest::new(collider_chain()).unwrap());
    let token = CancelToken::new();
    token.cancel();
    let report = Orienter::new(OrientCfg::pag())
        .unwrap()
        .with_cancel(token)
        .orient(&mut g, &sepsets);
    assert!(report.stopped_early);
    // R0 still ran.
    assert_eq!(report.colliders.len(), 1);
}

#[test]
fn invalid_path_bound_is_rejected() {
    let cfg = OrientCfg {
        max_path_length: -2,
        ..OrientCfg::default()
    };
    assert!(matches!(
        Orienter::new(cfg),
        Err(SearchError::InvalidArgument(_))
    ));
}

#[test]
fn meek_revert_gives_the_cpdag_of_a_dag() {
    let dag = collider_chain();
    let k = Knowledge::empty().bind(dag.nodes());
    let mut g = dag.clone();
    MeekRules::new(&k).revert_to_unshielded_colliders(true).propagate(&mut g);
    assert_eq!(g.edge_strings(), vec!["A --> C", "B --> C", "C --> D"]);

    // A --> B --> C has no collider: all undirected.
    let mut chain = Graph::from_names(&["A", "B", "C"]).unwrap();
    chain.add_directed(n(0), n(1)).unwrap();
    chain.add_directed(n(1), n(2)).unwrap();
    MeekRules::new(&k).revert_to_unshielded_colliders(true).propagate(&mut chain);
    assert_eq!(chain.edge_strings(), vec!["A --- B", "B --- C"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn oracle_pc_matches_the_true_cpdag(seed in 0u64..1_000, nodes in 4usize..8, extra in 0usize..5) {
        let max_edges = nodes * (nodes - 1) / 2;
        let cfg = RandomDagCfg { num_nodes: nodes, num_edges: (nodes - 1 + extra).min(max_edges) };
        let dag = random_dag(cfg, ReplayToken::new(seed, 0)).unwrap();
        let (mut g, sepsets) = learn(DSepTest::new(dag.clone()).unwrap());

        let engine = Orienter::new(OrientCfg::default()).unwrap();
        let report = engine.orient(&mut g, &sepsets);
        for t in &report.colliders {
            let s = sepsets.sepset(t.x, t.z).unwrap();
            prop_assert!(!s.contains(&t.y));
        }

        let k = Knowledge::empty().bind(dag.nodes());
        let mut truth = dag.clone();
        MeekRules::new(&k).revert_to_unshielded_colliders(true).propagate(&mut truth);
        prop_assert_eq!(g.edge_strings(), truth.edge_strings());

        let once = g.clone();
        engine.orient(&mut g, &sepsets);
        prop_assert_eq!(&g, &once);
    }

    #[test]
    fn pag_orientation_is_a_fixed_point(seed in 0u64..1_000, nodes in 5usize..8) {
        let cfg = RandomDagCfg { num_nodes: nodes, num_edges: nodes + 1 };
        let dag = random_dag(cfg, ReplayToken::new(seed, 1)).unwrap();
        let (mut g, sepsets) = learn(DSepTest::with_latents(dag, &["X1"]).unwrap());
        let engine = Orienter::new(OrientCfg::pag()).unwrap();
        let report = engine.orient(&mut g, &sepsets);
        for t in &report.colliders {
            let s = sepsets.sepset(t.x, t.z).unwrap();
            prop_assert!(!s.contains(&t.y));
        }
        let once = g.clone();
        engine.orient(&mut g, &sepsets);
        prop_assert_eq!(&g, &once);
    }
}
