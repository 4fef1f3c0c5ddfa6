//! blockfit
//!
//! Runs first-fit and split-fit side by side on each configured workload and
//! dumps both arenas to standard output. Logs go to standard error.

use anyhow::Context;
use blockfit::{write_snapshot, write_summary_json, SimulationConfig, Workload};
use clap::Parser;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "blockfit")]
#[command(about = "Compare first-fit and split two-block fit on a shared random workload")]
struct Args {
    /// TOML file with a seed and workloads (defaults to the two built-in workloads)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Seed for the random source, overriding the config file
    #[arg(short = 's', long, env = "BLOCKFIT_SEED")]
    seed: Option<u64>,

    /// Print a JSON summary line after each workload
    #[arg(long)]
    summary: bool,

    /// Dump the arenas only at the end of each workload
    #[arg(long)]
    final_only: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("failed to load config {:?}", path))?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    info!(
        "Running {} workloads with seed {}",
        config.workloads.len(),
        config.seed
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for (index, workload_config) in config.workloads.iter().enumerate() {
        info!("Workload {}: {:?}", index, workload_config);
        let mut workload = Workload::standard(workload_config.clone(), config.seed_for(index));

        let summary = workload
            .run(|w| {
                if args.final_only {
                    return Ok(());
                }
                write_snapshot(&mut out, w.first(), w.second())
            })
            .with_context(|| format!("workload {} aborted", index))?;

        if args.final_only {
            write_snapshot(&mut out, workload.first(), workload.second())?;
        }
        if args.summary {
            write_summary_json(&mut out, &summary)?;
        }
        info!(
            "Workload {} done: first-fit avg {:.3}, split-fit avg {:.3}",
            index, summary.first.avg_bytes, summary.second.avg_bytes
        );
    }

    out.flush()?;
    Ok(())
}
