//! Criterion benches for the adjacency search (group "fas").
//!
//! - Sequential vs. pooled depth scans on random sparse DAGs.
//! - The oracle is exact d-separation, so timings measure search overhead
//!   and graph bookkeeping rather than statistics.

use std::sync::Arc;

use causal::api::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn oracle(nodes: usize, seed: u64) -> Arc<dyn IndependenceTest> {
    let cfg = RandomDagCfg {
        num_nodes: nodes,
        num_edges: nodes + nodes / 2,
    };
    let dag = random_dag(cfg, ReplayToken::new(seed, 0)).unwrap();
    Arc::new(DSepTest::new(dag).unwrap())
}

fn bench_fas(c: &mut Criterion) {
    let mut group = c.benchmark_group("fas");
    group.sample_size(20);
    for nodes in [10usize, 20] {
        let test = oracle(nodes, 42);
        for threads in [Some(1), None] {
            let label = match threads {
                Some(t) => format!("{nodes}v-{t}t"),
                None => format!("{nodes}v-pool"),
            };
            let cfg = FasCfg {
                num_threads: threads,
                ..FasCfg::default()
            };
            group.bench_function(BenchmarkId::new("search", label), |b| {
                b.iter(|| Fas::new(test.clone(), cfg).unwrap().search().unwrap())
            });
        }
    }
    group.finish();
}

fn bench_pipelines(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    let test = oracle(12, 7);
    group.bench_function("pc-12v", |b| {
        b.iter(|| Pipeline::new().pc(test.clone(), &PcCfg::default()).unwrap())
    });
    group.bench_function("fci-12v", |b| {
        b.iter(|| Pipeline::new().fci(test.clone(), &FciCfg::default()).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_fas, bench_pipelines);
criterion_main!(benches);
