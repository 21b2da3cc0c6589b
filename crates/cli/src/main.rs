use anyhow::Result;
use causal::api::{
    random_dag, BossCfg, BossPagCfg, BossSummary, FasCfg, FciCfg, IndependenceTest, LocalCfg,
    OrientCfg, PcCfg, Pipeline, RandomDagCfg, ReplayToken, Score, ScorerCfg, SearchOutput,
    TestScore,
};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::SubscriberBuilder;

mod io;
mod provenance;

use provenance::{write_sidecar, Payload};

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Causal structure search against a ground-truth DAG oracle")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

/// Oracle, knowledge and output shared by every search.
#[derive(Args)]
struct Common {
    /// Ground-truth DAG (graph JSON); searches query its d-separations
    #[arg(long)]
    dag: PathBuf,
    /// Comma-separated variables hidden from the oracle
    #[arg(long, value_delimiter = ',')]
    latent: Vec<String>,
    /// Background knowledge JSON (tiers, forbidden, required)
    #[arg(long)]
    knowledge: Option<PathBuf>,
    /// Output graph JSON; a provenance sidecar is written next to it
    #[arg(long)]
    out: PathBuf,
    /// Log every search step at info level
    #[arg(long)]
    verbose: bool,
}

#[derive(Args)]
struct BossArgs {
    #[arg(long, default_value_t = 1)]
    starts: usize,
    /// Shuffle the first start too
    #[arg(long)]
    shuffle: bool,
    #[arg(long)]
    no_bes: bool,
    /// Largest BES subset; -1 = unbounded
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    bes_depth: i32,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl BossArgs {
    fn cfg(&self, verbose: bool) -> BossCfg {
        BossCfg {
            num_starts: self.starts,
            use_data_order: !self.shuffle,
            use_bes: !self.no_bes,
            depth: self.bes_depth,
            seed: self.seed,
            verbose,
        }
    }

    fn params(&self) -> serde_json::Value {
        json!({
            "starts": self.starts,
            "shuffle": self.shuffle,
            "bes": !self.no_bes,
            "bes_depth": self.bes_depth,
            "seed": self.seed,
        })
    }
}

#[derive(Subcommand)]
enum Action {
    /// Draw a random DAG and write it as graph JSON
    RandomDag {
        #[arg(long, default_value_t = 10)]
        nodes: usize,
        #[arg(long, default_value_t = 10)]
        edges: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        out: PathBuf,
    },
    /// PC: adjacency search, then a CPDAG
    Pc {
        #[command(flatten)]
        common: Common,
        /// Largest conditioning set; -1 = unbounded
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        depth: i32,
        #[arg(long)]
        threads: Option<usize>,
    },
    /// FCI: adjacency search, possible-d-sep, then a PAG
    Fci {
        #[command(flatten)]
        common: Common,
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        depth: i32,
        #[arg(long)]
        threads: Option<usize>,
        /// Longest path for path-based rules, in edges; -1 = unbounded
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        max_path_length: i32,
        #[arg(long)]
        no_possible_dsep: bool,
        /// Stop after R1-R4 and the discriminating-path rule
        #[arg(long)]
        partial_rules: bool,
    },
    /// BOSS permutation search, then a CPDAG
    Boss {
        #[command(flatten)]
        common: Common,
        #[command(flatten)]
        boss: BossArgs,
    },
    /// BOSS, shield removal, then a PAG
    BossPag {
        #[command(flatten)]
        common: Common,
        #[command(flatten)]
        boss: BossArgs,
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        max_path_length: i32,
    },
    /// Per-target BOSS over Markov blankets, merged
    Local {
        #[command(flatten)]
        common: Common,
        #[command(flatten)]
        boss: BossArgs,
        #[arg(long)]
        threads: Option<usize>,
        /// Search every variable for every target
        #[arg(long)]
        no_markov_blanket: bool,
    },
    /// Print a small provenance JSON block
    Report,
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::RandomDag {
            nodes,
            edges,
            seed,
            out,
        } => random(nodes, edges, seed, &out),
        Action::Pc {
            common,
            depth,
            threads,
        } => {
            let cfg = pc_cfg(&common, depth, threads);
            let params = json!({"algo": "pc", "depth": depth, "threads": threads});
            run_pipeline(&common, params, |p, test| p.pc(test, &cfg))
        }
        Action::Fci {
            common,
            depth,
            threads,
            max_path_length,
            no_possible_dsep,
            partial_rules,
        } => {
            let cfg = fci_cfg(
                &common,
                depth,
                threads,
                max_path_length,
                !no_possible_dsep,
                !partial_rules,
            );
            let params = json!({
                "algo": "fci",
                "depth": depth,
                "threads": threads,
                "max_path_length": max_path_length,
                "possible_dsep": !no_possible_dsep,
                "complete_rule_set": !partial_rules,
            });
            run_pipeline(&common, params, |p, test| p.fci(test, &cfg))
        }
        Action::Boss { common, boss } => run_boss(&common, &boss),
        Action::BossPag {
            common,
            boss,
            max_path_length,
        } => {
            let cfg = boss_pag_cfg(&common, &boss, max_path_length);
            let params = json!({
                "algo": "boss-pag",
                "boss": boss.params(),
                "max_path_length": max_path_length,
            });
            run_pipeline(&common, params, |p, test| {
                let score: Arc<dyn Score> = Arc::new(TestScore::new(test.clone()));
                p.boss_pag(score, test, &cfg)
            })
        }
        Action::Local {
            common,
            boss,
            threads,
            no_markov_blanket,
        } => run_local(&common, &boss, threads, no_markov_blanket),
        Action::Report => report(),
    }
}

fn fas_cfg(common: &Common, depth: i32, threads: Option<usize>) -> FasCfg {
    FasCfg {
        depth,
        num_threads: threads,
        verbose: common.verbose,
    }
}

fn pc_cfg(common: &Common, depth: i32, threads: Option<usize>) -> PcCfg {
    PcCfg {
        fas: fas_cfg(common, depth, threads),
        orient: OrientCfg {
            verbose: common.verbose,
            ..OrientCfg::default()
        },
    }
}

fn fci_cfg(
    common: &Common,
    depth: i32,
    threads: Option<usize>,
    max_path_length: i32,
    possible_dsep: bool,
    complete_rule_set: bool,
) -> FciCfg {
    FciCfg {
        fas: fas_cfg(common, depth, threads),
        orient: OrientCfg {
            complete_rule_set,
            max_path_length,
            verbose: common.verbose,
            ..OrientCfg::pag()
        },
        possible_dsep,
    }
}

fn boss_pag_cfg(common: &Common, boss: &BossArgs, max_path_length: i32) -> BossPagCfg {
    BossPagCfg {
        boss: boss.cfg(common.verbose),
        orient: OrientCfg {
            max_path_length,
            verbose: common.verbose,
            ..OrientCfg::pag()
        },
        ..BossPagCfg::default()
    }
}

fn local_cfg(common: &Common, boss: &BossArgs, threads: Option<usize>, no_mb: bool) -> LocalCfg {
    LocalCfg {
        boss: boss.cfg(common.verbose),
        find_markov_blanket: !no_mb,
        num_threads: threads,
    }
}

fn random(nodes: usize, edges: usize, seed: u64, out: &Path) -> Result<()> {
    let cfg = RandomDagCfg {
        num_nodes: nodes,
        num_edges: edges,
    };
    let dag = random_dag(cfg, ReplayToken::new(seed, 0))?;
    io::write_graph(out, &dag)?;
    tracing::info!(nodes, edges, seed, out = %out.display(), "random dag written");
    write_sidecar(
        out,
        Payload::new(json!({"algo": "random-dag", "nodes": nodes, "edges": edges, "seed": seed})),
    )?;
    Ok(())
}

/// Load the oracle and knowledge, run `search`, write the graph and sidecar.
fn run_pipeline<F>(common: &Common, params: serde_json::Value, search: F) -> Result<()>
where
    F: FnOnce(&Pipeline, Arc<dyn IndependenceTest>) -> Result<SearchOutput, causal::SearchError>,
{
    let (pipeline, test) = setup(common)?;
    let out = search(&pipeline, test)?;
    io::write_graph(&common.out, &out.graph)?;
    let summary = json!({
        "edges": out.graph.num_edges(),
        "colliders": out.report.colliders.len(),
        "ambiguous": out.report.ambiguous.len(),
        "removed_with_sepsets": out.sepsets.len(),
        "stopped_early": out.stopped_early,
    });
    tracing::info!(out = %common.out.display(), edges = out.graph.num_edges(), "graph written");
    write_sidecar(&common.out, payload(common, params).with_summary(summary))?;
    Ok(())
}

fn run_boss(common: &Common, boss: &BossArgs) -> Result<()> {
    let (pipeline, test) = setup(common)?;
    let score: Arc<dyn Score> = Arc::new(TestScore::new(test));
    let result = pipeline.boss(score, None, ScorerCfg::default(), boss.cfg(common.verbose))?;
    io::write_graph(&common.out, &result.cpdag)?;
    let summary = serde_json::to_value(BossSummary::from(&result))?;
    let params = json!({"algo": "boss", "boss": boss.params()});
    write_sidecar(&common.out, payload(common, params).with_summary(summary))?;
    Ok(())
}

fn run_local(common: &Common, boss: &BossArgs, threads: Option<usize>, no_mb: bool) -> Result<()> {
    let (pipeline, test) = setup(common)?;
    let score: Arc<dyn Score> = Arc::new(TestScore::new(test));
    let cfg = local_cfg(common, boss, threads, no_mb);
    let result = pipeline.local(score, None, ScorerCfg::default(), &cfg)?;
    io::write_graph(&common.out, &result.graph)?;
    let summary = json!({
        "edges": result.graph.num_edges(),
        "conflicts": result.conflicts.len(),
        "stopped_early": result.stopped_early,
    });
    let params = json!({
        "algo": "local",
        "boss": boss.params(),
        "threads": threads,
        "markov_blanket": !no_mb,
    });
    write_sidecar(&common.out, payload(common, params).with_summary(summary))?;
    Ok(())
}

fn setup(common: &Common) -> Result<(Pipeline, Arc<dyn IndependenceTest>)> {
    let test = io::read_oracle(&common.dag, &common.latent)?;
    let knowledge = io::read_knowledge(common.knowledge.as_deref(), test.variables())?;
    tracing::info!(
        dag = %common.dag.display(),
        variables = test.variables().len(),
        latent = common.latent.len(),
        "oracle ready"
    );
    Ok((Pipeline::new().with_knowledge(knowledge), Arc::new(test)))
}

fn payload(common: &Common, mut params: serde_json::Value) -> Payload {
    params["latent"] = json!(common.latent);
    let mut p = Payload::new(params).with_input(&common.dag);
    if let Some(k) = &common.knowledge {
        p = p.with_input(k);
    }
    p
}

fn report() -> Result<()> {
    let obj = json!({
        "code_rev": provenance::current_git_rev(),
        "version": causal::VERSION,
        "params": {},
        "outputs": []
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}
