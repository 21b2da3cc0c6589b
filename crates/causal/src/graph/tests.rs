//! Graph model, path queries and random DAGs.

use super::paths::{
    ancestors, causal_order, dag_extension, has_directed_cycle, is_ancestor_of, is_dseparated,
    possible_dsep,
};
use super::random::{random_dag, RandomDagCfg};
use super::*;
use crate::replay::ReplayToken;

fn abcd() -> (Graph, [NodeId; 4]) {
    let g = Graph::from_names(&["A", "B", "C", "D"]).unwrap();
    (g, [NodeId(0), NodeId(1), NodeId(2), NodeId(3)])
}

/// A --> C <-- B, C --> D
fn collider_chain() -> (Graph, [NodeId; 4]) {
    let (mut g, [a, b, c, d]) = abcd();
    g.add_directed(a, c).unwrap();
    g.add_directed(b, c).unwrap();
    g.add_directed(c, d).unwrap();
    (g, [a, b, c, d])
}

#[test]
fn endpoints_are_stored_per_side() {
    let (mut g, [a, b, ..]) = abcd();
    g.add_edge(a, b, Endpoint::Circle, Endpoint::Arrow).unwrap();
    assert_eq!(g.endpoint(a, b), Some(Endpoint::Arrow));
    assert_eq!(g.endpoint(b, a), Some(Endpoint::Circle));
    g.set_endpoint(b, a, Endpoint::Tail).unwrap();
    assert!(g.is_directed(a, b));
    assert_eq!(g.edge_strings(), vec!["A --> B".to_string()]);
}

#[test]
fn at_most_one_edge_per_pair() {
    let (mut g, [a, b, ..]) = abcd();
    g.add_undirected(a, b).unwrap();
    assert!(matches!(
        g.add_directed(b, a),
        Err(GraphError::DuplicateEdge(..))
    ));
    assert!(matches!(g.add_directed(a, a), Err(GraphError::SelfLoop(_))));
    assert_eq!(g.num_edges(), 1);
    assert!(g.remove_edge(b, a));
    assert!(!g.remove_edge(a, b));
    assert!(g.set_endpoint(a, b, Endpoint::Arrow).is_err());
}

#[test]
fn duplicate_names_are_rejected() {
    let err = Graph::from_names(&["A", "A"]).unwrap_err();
    assert_eq!(err, GraphError::DuplicateNode("A".into()));
}

#[test]
fn display_flips_left_arrowheads() {
    let (mut g, [a, b, c, d]) = abcd();
    g.add_edge(a, b, Endpoint::Arrow, Endpoint::Circle).unwrap();
    g.add_bidirected(b, c).unwrap();
    g.add_nondirected(c, d).unwrap();
    g.add_undirected(a, d).unwrap();
    assert_eq!(
        g.edge_strings(),
        vec!["A --- D", "B <-> C", "B o-> A", "C o-o D"]
    );
    let text = g.to_string();
    assert!(text.starts_with("Graph Nodes:\nA;B;C;D\n"));
    assert!(text.contains("1. B o-> A\n2. A --- D"));
}

#[test]
fn collider_queries() {
    let (mut g, [a, b, c, d]) = collider_chain();
    assert!(g.is_collider(a, c, b));
    assert!(g.is_def_collider(a, c, b));
    assert!(!g.is_collider(a, c, d));
    assert!(g.is_def_noncollider(a, c, d));
    g.add_undirected(a, b).unwrap();
    assert!(!g.is_def_collider(a, c, b));
    assert_eq!(g.parents(c), vec![a, b]);
    assert_eq!(g.children(c), vec![d]);
    assert_eq!(g.nodes_into(c, Endpoint::Arrow), vec![a, b]);
}

#[test]
fn triple_markers_require_adjacency() {
    let (mut g, [a, b, c, d]) = collider_chain();
    assert!(g.add_ambiguous_triple(a, c, b));
    assert!(g.is_ambiguous_triple(b, c, a));
    assert!(!g.add_ambiguous_triple(a, b, d));
    assert!(!g.add_underline_triple(a, c, a));
    assert!(g.add_underline_triple(a, c, d));
    assert!(g.is_def_noncollider(d, c, a));
    g.remove_edge(c, d);
    g.prune_triples();
    assert_eq!(g.underline_triples().count(), 0);
    assert_eq!(g.ambiguous_triples().count(), 1);
}

#[test]
fn reorient_all_with_circles() {
    let (mut g, [a, _, c, _]) = collider_chain();
    g.reorient_all_with(Endpoint::Circle);
    assert!(g
        .edges()
        .iter()
        .all(|e| e.at_a == Endpoint::Circle && e.at_b == Endpoint::Circle));
    assert!(g.is_adjacent(a, c));
}

#[test]
fn complete_graph_has_all_pairs() {
    let g = Graph::complete((0..5).map(|i| Node::continuous(format!("V{i}"))).collect()).unwrap();
    assert_eq!(g.num_edges(), 10);
    assert!(g.edges().iter().all(|e| e.is_undirected()));
    assert_eq!(g.max_degree(), 4);
}

#[test]
fn dseparation_on_collider_chain() {
    let (g, [a, b, c, d]) = collider_chain();
    assert!(is_dseparated(&g, a, b, &[]));
    assert!(!is_dseparated(&g, a, b, &[c]));
    assert!(!is_dseparated(&g, a, b, &[d]));
    assert!(!is_dseparated(&g, a, d, &[]));
    assert!(is_dseparated(&g, a, d, &[c]));
    assert!(is_dseparated(&g, b, d, &[c]));
}

#[test]
fn ancestry_and_cycles() {
    let (mut g, [a, b, c, d]) = collider_chain();
    let anc = ancestors(&g, &[d]);
    assert_eq!(anc.into_iter().collect::<Vec<_>>(), vec![a, b, c, d]);
    assert!(is_ancestor_of(&g, a, d));
    assert!(!is_ancestor_of(&g, d, a));
    assert!(!has_directed_cycle(&g));
    g.add_directed(d, a).unwrap();
    assert!(has_directed_cycle(&g));
}

#[test]
fn causal_order_respects_parents_and_initial_ties() {
    let (g, [a, b, c, d]) = collider_chain();
    assert_eq!(causal_order(&g, &[d, c, b, a]), vec![b, a, c, d]);
    assert_eq!(causal_order(&g, &[a, b, c, d]), vec![a, b, c, d]);
}

#[test]
fn dag_extension_adds_no_colliders() {
    // A --> C <-- B, C --- D: D must become a child of C.
    let (mut g, [a, b, c, d]) = abcd();
    g.add_directed(a, c).unwrap();
    g.add_directed(b, c).unwrap();
    g.add_undirected(c, d).unwrap();
    let dag = dag_extension(&g).unwrap();
    assert!(dag.is_directed(c, d));
    assert!(dag.is_directed(a, c));

    // A --- B --- C: any orientation without a collider at B.
    let (mut chain, [a, b, c, _]) = abcd();
    chain.add_undirected(a, b).unwrap();
    chain.add_undirected(b, c).unwrap();
    let dag = dag_extension(&chain).unwrap();
    assert!(!dag.is_collider(a, b, c));
    assert!(!has_directed_cycle(&dag));

    // A --> B --> C --> A has no extension.
    let (mut cyc, [a, b, c, _]) = abcd();
    cyc.add_directed(a, b).unwrap();
    cyc.add_directed(b, c).unwrap();
    cyc.add_directed(c, a).unwrap();
    assert!(dag_extension(&cyc).is_none());
}

#[test]
fn possible_dsep_follows_colliders() {
    // A *-> B <-* C, C - D, with B,D not adjacent.
    let (mut g, [a, b, c, d]) = abcd();
    g.add_edge(a, b, Endpoint::Circle, Endpoint::Arrow).unwrap();
    g.add_edge(c, b, Endpoint::Circle, Endpoint::Arrow).unwrap();
    g.add_nondirected(c, d).unwrap();
    assert_eq!(possible_dsep(&g, a, d, -1), vec![b, c]);
    assert_eq!(possible_dsep(&g, a, d, 1), vec![b]);
    // Without the collider the walk stops at B.
    g.set_endpoint(a, b, Endpoint::Circle).unwrap();
    assert_eq!(possible_dsep(&g, a, d, -1), vec![b]);
}

#[test]
fn random_dags_are_acyclic_and_replayable() {
    let cfg = RandomDagCfg {
        num_nodes: 12,
        num_edges: 20,
    };
    let g1 = random_dag(cfg, ReplayToken::new(3, 0)).unwrap();
    let g2 = random_dag(cfg, ReplayToken::new(3, 0)).unwrap();
    assert_eq!(g1, g2);
    assert_eq!(g1.num_edges(), 20);
    assert!(!has_directed_cycle(&g1));
    assert!(g1.edges().iter().all(|e| e.is_directed()));
    let bad = RandomDagCfg {
        num_nodes: 3,
        num_edges: 4,
    };
    assert!(random_dag(bad, ReplayToken::default()).is_err());
}

#[test]
fn record_round_trip_keeps_marks_and_kinds() {
    let mut g = Graph::new(vec![Node::continuous("A"), Node::discrete("B")]).unwrap();
    g.add_edge(NodeId(0), NodeId(1), Endpoint::Circle, Endpoint::Arrow)
        .unwrap();
    let json = serde_json::to_string(&g.to_record()).unwrap();
    assert!(json.contains("\"circle\""));
    let back = Graph::from_record(&serde_json::from_str(&json).unwrap()).unwrap();
    assert_eq!(back, g);
    assert_eq!(back.node(NodeId(1)).kind, VarKind::Discrete);
}
