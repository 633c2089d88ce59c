// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Command-Line Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! MCSL CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcsl_core::inverse::{run_inversion, InversionResult};
use mcsl_core::io::{read_experimental, write_estimate};
use mcsl_types::config::RunConfig;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "mcsl")]
#[command(about = "MCSL - inverse estimation of slab scattering parameters from ARS data")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the inverse search
    Run {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Experimental ARS values, whitespace separated
        #[arg(short, long)]
        data: PathBuf,

        /// Report file with the estimate
        #[arg(short, long, default_value = "dataOut/MCSLoutput.csv")]
        output: PathBuf,

        /// Also write a JSON report with the iteration history
        #[arg(long)]
        json: Option<PathBuf>,

        /// Override simulation.seed (0 = wall clock)
        #[arg(long)]
        seed: Option<u64>,

        /// Override simulation.num_proc
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Validate configuration and data without simulating
    Check {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Experimental ARS values, whitespace separated
        #[arg(short, long)]
        data: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Run { config, data, output, json, seed, threads } => {
            cmd_run(&config, &data, &output, json.as_deref(), seed, threads)
        }
        Commands::Check { config, data } => cmd_check(&config, &data),
    }
}

fn load_inputs(config: &Path, data: &Path) -> Result<(RunConfig, Vec<f64>)> {
    tracing::info!(path = %config.display(), "loading configuration");
    let path_str = config.to_str().context("configuration path is not valid UTF-8")?;
    let cfg = RunConfig::from_file(path_str)
        .with_context(|| format!("failed to load configuration {}", config.display()))?;

    let exp = read_experimental(data)
        .with_context(|| format!("failed to read experimental data {}", data.display()))?;
    tracing::info!(angles = exp.len(), "experimental data loaded");
    Ok((cfg, exp))
}

fn cmd_run(
    config: &Path,
    data: &Path,
    output: &Path,
    json: Option<&Path>,
    seed: Option<u64>,
    threads: Option<usize>,
) -> Result<()> {
    let start = Instant::now();
    let (mut cfg, exp) = load_inputs(config, data)?;
    if let Some(seed) = seed {
        cfg.simulation.seed = seed;
    }
    if let Some(threads) = threads {
        cfg.simulation.num_proc = threads;
    }
    cfg.validate().context("invalid configuration")?;

    let result = run_inversion(&cfg, exp).context("inverse search failed")?;
    let elapsed = start.elapsed().as_secs();

    write_estimate(output, &result.estimate, elapsed)
        .with_context(|| format!("failed to write {}", output.display()))?;
    if let Some(path) = json {
        write_json(path, &result, elapsed)?;
    }

    let est = &result.estimate;
    println!(
        "mu_s = {:.6}  mu_a = {:.6}  ({} s, {} iterations)",
        est.mu_s(),
        est.mu_a(),
        elapsed,
        result.history.len()
    );
    Ok(())
}

fn cmd_check(config: &Path, data: &Path) -> Result<()> {
    let (cfg, exp) = load_inputs(config, data)?;
    cfg.validate().context("invalid configuration")?;
    let grid = cfg.create_grid().context("invalid search grid")?;
    println!(
        "ok: {}x{} grid, {} angles ({} detector bins), {} workers, {} iterations",
        grid.mut_len(),
        grid.etaa_len(),
        exp.len(),
        2 * exp.len(),
        cfg.simulation.num_proc,
        cfg.simulation.num_iter
    );
    Ok(())
}

fn write_json(path: &Path, result: &InversionResult, elapsed_s: u64) -> Result<()> {
    let est = &result.estimate;
    let value = serde_json::json!({
        "estimate": est,
        "output": est.to_output_vec(),
        "mu_s": est.mu_s(),
        "mu_a": est.mu_a(),
        "sigma_mu_t": est.sigma_mu_t(),
        "sigma_etaa": est.sigma_etaa(),
        "elapsed_s": elapsed_s,
        "final_grid": {
            "mu_t": result.final_grid.mut_values.to_vec(),
            "etaa": result.final_grid.etaa_values.to_vec(),
        },
        "history": result.history,
    });
    std::fs::write(path, serde_json::to_string_pretty(&value)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
