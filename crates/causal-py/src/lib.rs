//! PyO3 bindings for the `causal` searches.
//!
//! Notes
//! - Every entry point takes a ground-truth DAG as variable names plus
//!   `(from, to)` pairs and searches against its d-separation oracle. Results
//!   come back as sorted edge strings such as `"A --> C"` or `"B <-> C"`.
//! - Statistical scores and tests stay on the Python side for now; only the
//!   exact oracle crosses the boundary.

use std::sync::Arc;

use causal::api::{
    BossCfg, DSepTest, FciCfg, Graph, IndependenceTest, PcCfg, Pipeline, Score, ScorerCfg,
    TestScore,
};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn value_err<E: std::fmt::Display>(err: E) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn oracle(names: Vec<String>, edges: Vec<(String, String)>, latent: Vec<String>) -> PyResult<DSepTest> {
    let mut dag = Graph::from_names(&names).map_err(value_err)?;
    for (from, to) in &edges {
        let (Some(x), Some(y)) = (dag.id_of(from), dag.id_of(to)) else {
            return Err(PyValueError::new_err(format!("unknown variable in edge {from} -> {to}")));
        };
        dag.add_directed(x, y).map_err(value_err)?;
    }
    let latent: Vec<&str> = latent.iter().map(String::as_str).collect();
    DSepTest::with_latents(dag, &latent).map_err(value_err)
}

/// PC against the DAG's d-separations; returns CPDAG edge strings.
#[pyfunction]
#[pyo3(signature = (names, edges, depth=-1))]
fn pc_from_dag(names: Vec<String>, edges: Vec<(String, String)>, depth: i32) -> PyResult<Vec<String>> {
    let test = oracle(names, edges, Vec::new())?;
    let mut cfg = PcCfg::default();
    cfg.fas.depth = depth;
    let out = Pipeline::new().pc(Arc::new(test), &cfg).map_err(value_err)?;
    Ok(out.graph.edge_strings())
}

/// FCI with `latent` hidden from the oracle; returns PAG edge strings.
#[pyfunction]
#[pyo3(signature = (names, edges, latent=Vec::new(), depth=-1))]
fn fci_from_dag(
    names: Vec<String>,
    edges: Vec<(String, String)>,
    latent: Vec<String>,
    depth: i32,
) -> PyResult<Vec<String>> {
    let test = oracle(names, edges, latent)?;
    let mut cfg = FciCfg::default();
    cfg.fas.depth = depth;
    let out = Pipeline::new().fci(Arc::new(test), &cfg).map_err(value_err)?;
    Ok(out.graph.edge_strings())
}

/// BOSS over the oracle-backed score; returns CPDAG edge strings.
#[pyfunction]
#[pyo3(signature = (names, edges, starts=1, seed=0))]
fn boss_from_dag(
    names: Vec<String>,
    edges: Vec<(String, String)>,
    starts: usize,
    seed: u64,
) -> PyResult<Vec<String>> {
    let test: Arc<dyn IndependenceTest> = Arc::new(oracle(names, edges, Vec::new())?);
    let score: Arc<dyn Score> = Arc::new(TestScore::new(test));
    let cfg = BossCfg {
        num_starts: starts,
        seed,
        ..BossCfg::default()
    };
    let r = Pipeline::new()
        .boss(score, None, ScorerCfg::default(), cfg)
        .map_err(value_err)?;
    Ok(r.cpdag.edge_strings())
}

#[pymodule]
fn causal_native(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(pc_from_dag, m)?)?;
    m.add_function(wrap_pyfunction!(fci_from_dag, m)?)?;
    m.add_function(wrap_pyfunction!(boss_from_dag, m)?)?;
    Ok(())
}
