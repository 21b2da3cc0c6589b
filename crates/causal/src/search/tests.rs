use proptest::prelude::*;

use super::*;
use crate::graph::random::{random_dag, RandomDagCfg};
use crate::oracle::{DSepTest, TestScore};
use crate::orient::OrientMode;
use crate::replay::ReplayToken;
use crate::sepset::SepsetCfg;

fn n(i: usize) -> NodeId {
    NodeId(i)
}

fn dag(names: &[&str], edges: &[(&str, &str)]) -> Graph {
    let mut g = Graph::from_names(names).unwrap();
    for (x, y) in edges {
        let (x, y) = (g.id_of(x).unwrap(), g.id_of(y).unwrap());
        g.add_directed(x, y).unwrap();
    }
    g
}

/// A --> C <-- B, C --> D
fn collider_chain() -> Graph {
    dag(&["A", "B", "C", "D"], &[("A", "C"), ("B", "C"), ("C", "D")])
}

/// A --> B <-- L --> C <-- D with L hidden.
fn latent_pair() -> DSepTest {
    let g = dag(
        &["A", "B", "L", "C", "D"],
        &[("A", "B"), ("L", "B"), ("L", "C"), ("D", "C")],
    );
    DSepTest::with_latents(g, &["L"]).unwrap()
}

#[test]
fn pc_recovers_the_cpdag() {
    let out = Pipeline::new()
        .pc(Arc::new(DSepTest::new(collider_chain()).unwrap()), &PcCfg::default())
        .unwrap();
    assert_eq!(out.graph.edge_strings(), vec!["A --> C", "B --> C", "C --> D"]);
    assert_eq!(out.sepsets.sepset(n(0), n(1)), Some(&[][..]));
    assert_eq!(out.sepsets.sepset(n(0), n(3)), Some(&[n(2)][..]));
    assert_eq!(out.report.colliders.len(), 1);
    assert!(!out.stopped_early);
}

#[test]
fn pc_honours_required_edges() {
    let k = Knowledge::builder().set_required("D", "C").unwrap().build();
    let out = Pipeline::new()
        .with_knowledge(k)
        .pc(Arc::new(DSepTest::new(collider_chain()).unwrap()), &PcCfg::default())
        .unwrap();
    assert!(out.graph.is_directed(n(3), n(2)));
    assert!(out.graph.is_directed(n(0), n(2)));
    assert!(out.graph.is_directed(n(1), n(2)));
}

#[test]
fn pc_rejects_unknown_knowledge_names_and_wrong_mode() {
    let k = Knowledge::builder().set_forbidden("A", "Q").unwrap().build();
    let test: Arc<dyn IndependenceTest> = Arc::new(DSepTest::new(collider_chain()).unwrap());
    assert!(Pipeline::new().with_knowledge(k).pc(test.clone(), &PcCfg::default()).is_err());
    let cfg = PcCfg {
        orient: OrientCfg::pag(),
        ..PcCfg::default()
    };
    assert!(Pipeline::new().pc(test, &cfg).is_err());
}

#[test]
fn cancelled_pc_keeps_the_complete_graph() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let out = Pipeline::new()
        .with_cancel(cancel)
        .pc(Arc::new(DSepTest::new(collider_chain()).unwrap()), &PcCfg::default())
        .unwrap();
    assert!(out.stopped_early);
    assert_eq!(out.graph.num_edges(), 6);
    assert!(out.sepsets.is_empty());
}

#[test]
fn fci_finds_the_latent_confounder() {
    for possible_dsep in [true, false] {
        let cfg = FciCfg {
            possible_dsep,
            ..FciCfg::default()
        };
        let out = Pipeline::new().fci(Arc::new(latent_pair()), &cfg).unwrap();
        assert_eq!(out.graph.edge_strings(), vec!["A o-> B", "B <-> C", "D o-> C"]);
        assert!(!out.stopped_early);
    }
}

#[test]
fn fci_without_latents_gives_the_pag() {
    let out = Pipeline::new()
        .fci(Arc::new(DSepTest::new(collider_chain()).unwrap()), &FciCfg::default())
        .unwrap();
    assert_eq!(out.graph.edge_strings(), vec!["A o-> C", "B o-> C", "C --> D"]);
}

#[test]
fn fci_rejects_cpdag_mode() {
    let cfg = FciCfg {
        orient: OrientCfg::default(),
        ..FciCfg::default()
    };
    assert_eq!(cfg.orient.mode, OrientMode::Cpdag);
    assert!(Pipeline::new().fci(Arc::new(latent_pair()), &cfg).is_err());
}

#[test]
fn boss_pag_without_latents_matches_fci() {
    let truth = collider_chain();
    let score: Arc<dyn Score> = Arc::new(TestScore::new(DSepTest::new(truth.clone()).unwrap()));
    let test: Arc<dyn IndependenceTest> = Arc::new(DSepTest::new(truth).unwrap());
    let out = Pipeline::new()
        .boss_pag(score, test, &BossPagCfg::default())
        .unwrap();
    assert_eq!(out.graph.edge_strings(), vec!["A o-> C", "B o-> C", "C --> D"]);
    assert!(out.sepsets.is_empty());
    assert!(!out.stopped_early);
}

#[test]
fn boss_pag_only_keeps_boss_adjacencies() {
    let test = latent_pair();
    let score: Arc<dyn Score> = Arc::new(TestScore::new(test.clone()));
    let test: Arc<dyn IndependenceTest> = Arc::new(test);
    let pipeline = Pipeline::new();
    let boss = pipeline
        .boss(score.clone(), None, ScorerCfg::default(), BossCfg::default())
        .unwrap();
    let out = pipeline.boss_pag(score, test.clone(), &BossPagCfg::default()).unwrap();
    let names: Vec<&str> = out.graph.nodes().iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C", "D"]);
    for e in out.graph.edges() {
        assert!(boss.cpdag.is_adjacent(e.a, e.b));
    }
    for ((a, c), s) in out.sepsets.entries() {
        assert!(!out.graph.is_adjacent(a, c));
        assert!(test.check(a, c, &s.set).unwrap().independent);
    }
}

#[test]
fn shield_of_a_false_collider_is_removed() {
    // BOSS claims X --> Y <-- Z with X --> Z; the truth is X --> Y <-- Z.
    let claimed = dag(&["X", "Y", "Z"], &[("X", "Y"), ("Z", "Y"), ("X", "Z")]);
    let truth = dag(&["X", "Y", "Z"], &[("X", "Y"), ("Z", "Y")]);
    let test = DSepTest::new(truth).unwrap();
    let k = BoundKnowledge::default();
    let search = TestSepsets::new(
        claimed.clone(),
        Arc::new(test.clone()),
        SepsetStrategy::Greedy,
        SepsetCfg::default(),
    )
    .unwrap();
    let mut g = claimed.clone();
    let (recorded, cancelled) =
        Pipeline::new().remove_shielded_colliders(&claimed, &mut g, &search, &test, &k, false);
    assert!(!cancelled);
    assert_eq!(g.edge_strings(), vec!["X --> Y", "Z --> Y"]);
    assert_eq!(recorded.sepset(n(0), n(2)), Some(&[][..]));
}

#[test]
fn shield_is_kept_when_the_middle_separates() {
    // The truth is the chain X --> Y --> Z: {Y} separates X and Z.
    let claimed = dag(&["X", "Y", "Z"], &[("X", "Y"), ("Z", "Y"), ("X", "Z")]);
    let truth = dag(&["X", "Y", "Z"], &[("X", "Y"), ("Y", "Z")]);
    let test = DSepTest::new(truth).unwrap();
    let search = TestSepsets::new(
        claimed.clone(),
        Arc::new(test.clone()),
        SepsetStrategy::Greedy,
        SepsetCfg::default(),
    )
    .unwrap();
    let mut g = claimed.clone();
    let (recorded, _) = Pipeline::new().remove_shielded_colliders(
        &claimed,
        &mut g,
        &search,
        &test,
        &BoundKnowledge::default(),
        false,
    );
    assert!(recorded.is_empty());
    assert_eq!(g.num_edges(), 3);
}

#[test]
fn boss_pag_checks_variable_lists() {
    let score: Arc<dyn Score> = Arc::new(TestScore::new(DSepTest::new(collider_chain()).unwrap()));
    let other = dag(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
    let test: Arc<dyn IndependenceTest> = Arc::new(DSepTest::new(other).unwrap());
    assert!(Pipeline::new().boss_pag(score, test, &BossPagCfg::default()).is_err());
}

#[test]
fn local_forwards_to_the_per_target_search() {
    let score: Arc<dyn Score> = Arc::new(TestScore::new(DSepTest::new(collider_chain()).unwrap()));
    let out = Pipeline::new()
        .local(score, None, ScorerCfg::default(), &LocalCfg::default())
        .unwrap();
    assert_eq!(out.graph.edge_strings(), vec!["A --> C", "B --> C", "C --> D"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn fci_without_latents_keeps_the_true_skeleton(seed in 0u64..1_000, nodes in 4usize..8) {
        let cfg = RandomDagCfg { num_nodes: nodes, num_edges: nodes };
        let truth = random_dag(cfg, ReplayToken::new(seed, 3)).unwrap();
        let out = Pipeline::new()
            .fci(Arc::new(DSepTest::new(truth.clone()).unwrap()), &FciCfg::default())
            .unwrap();
        prop_assert!(out.graph.same_skeleton(&truth));
        for ((a, b), s) in out.sepsets.entries() {
            prop_assert!(crate::graph::paths::is_dseparated(&truth, a, b, &s.set));
        }
    }
}
