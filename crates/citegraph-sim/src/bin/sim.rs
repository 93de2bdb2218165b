#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use citegraph_sim::{ROOT_ID, SimGraph, load_sim_config, replay_seed, run_campaign, script};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "citegraph-sim: deterministic simulation and scripting for citation graphs",
    long_about = None
)]
struct Cli {
    /// Simulator config (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Run a seed range against the reference model",
        after_help = "EXAMPLES:\n    citegraph-sim campaign --seeds 1000 --ops 300\n    citegraph-sim campaign --config sim.toml --json"
    )]
    Campaign {
        /// Override the number of seeds.
        #[arg(long)]
        seeds: Option<u64>,
        /// Override the first seed.
        #[arg(long)]
        start: Option<u64>,
        /// Override operations per seed.
        #[arg(long)]
        ops: Option<usize>,
    },

    #[command(about = "Replay one seed and print its full trace")]
    Replay {
        #[arg(long)]
        seed: u64,
    },

    #[command(
        about = "Run a command script against a fresh graph",
        after_help = "EXAMPLES:\n    citegraph-sim script papers.txt\n    citegraph-sim script papers.txt --root survey"
    )]
    Script {
        file: PathBuf,
        /// Identifier of the root publication.
        #[arg(long, default_value = ROOT_ID)]
        root: String,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = load_sim_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Campaign { seeds, start, ops } => {
            if let Some(seeds) = seeds {
                config.campaign.seed_count = seeds;
            }
            if let Some(start) = start {
                config.campaign.seed_start = start;
            }
            if let Some(ops) = ops {
                config.campaign.ops_per_seed = ops;
            }

            let report = run_campaign(&config)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "campaign complete: seeds={} passed={} ops={} rejected={} released={}",
                    report.seeds_run,
                    report.seeds_passed,
                    report.ops_applied,
                    report.ops_rejected,
                    report.publications_released
                );
                for failure in &report.failures {
                    println!("seed {} failed at step {}:", failure.seed, failure.step);
                    for violation in &failure.violations {
                        println!("  {violation}");
                    }
                }
            }
            if let Some(seed) = report.first_failure {
                bail!("campaign failed; replay with `citegraph-sim replay --seed {seed}`");
            }
        }
        Commands::Replay { seed } => {
            let run = replay_seed(seed, &config)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&run.trace)?);
            } else {
                for step in &run.trace {
                    let released = if step.released.is_empty() {
                        String::new()
                    } else {
                        format!(" released={}", step.released.join(","))
                    };
                    let op = step.op.to_string();
                    println!("{:>5} {op:<40} {}{released}", step.step, step.outcome);
                }
                println!("final publications: {}", run.final_len);
                for violation in &run.oracle.violations {
                    println!("violation: {violation}");
                }
            }
            if !run.oracle.passed {
                bail!("seed {seed} failed");
            }
        }
        Commands::Script { file, root } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mut graph = SimGraph::with_config(root, &config.graph);
            let output = script::run_script(&mut graph, &source)
                .with_context(|| format!("Failed to run {}", file.display()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                for line in output {
                    println!("{line}");
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "citegraph_core=debug,citegraph_sim=debug,info"
        } else {
            "warn"
        })
    });

    let format = env::var("CITEGRAPH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}
