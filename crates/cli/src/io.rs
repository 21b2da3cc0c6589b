//! JSON inputs and outputs of the CLI.

use anyhow::{bail, Context, Result};
use causal::api::{DSepTest, Graph, GraphRecord, Knowledge, KnowledgeSpec, Node};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
    }
    fs::write(path, serde_json::to_vec_pretty(value)?)
        .with_context(|| format!("writing {}", path.display()))
}

pub fn read_graph(path: &Path) -> Result<Graph> {
    let rec: GraphRecord = read_json(path)?;
    Graph::from_record(&rec).with_context(|| format!("building graph from {}", path.display()))
}

pub fn write_graph(path: &Path, g: &Graph) -> Result<()> {
    write_json(path, &g.to_record())
}

/// D-separation oracle over the DAG at `path` with `latent` hidden.
pub fn read_oracle(path: &Path, latent: &[String]) -> Result<DSepTest> {
    let dag = read_graph(path)?;
    let latent: Vec<&str> = latent.iter().map(String::as_str).collect();
    DSepTest::with_latents(dag, &latent).with_context(|| format!("oracle from {}", path.display()))
}

/// Knowledge from a `KnowledgeSpec` file, checked against `nodes`.
pub fn read_knowledge(path: Option<&Path>, nodes: &[Node]) -> Result<Knowledge> {
    let Some(path) = path else {
        return Ok(Knowledge::empty());
    };
    let spec: KnowledgeSpec = read_json(path)?;
    let k = Knowledge::try_from(&spec).with_context(|| format!("knowledge in {}", path.display()))?;
    if let Err(err) = k.check_names(nodes) {
        bail!("knowledge in {}: {err}", path.display());
    }
    Ok(k)
}
