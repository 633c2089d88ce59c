// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Inverse Search Loop
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Outer iteration: simulate, score, narrow the grid, double the packets.
//!
//! Each iteration fans `num_proc` workers out on a dedicated rayon pool.
//! A worker owns its particle, random stream and accumulator; streams are
//! handed back after the merge and keep advancing in the next iteration.

use crate::accumulate::merge_tensors;
use crate::ars::fix_ars;
use crate::interval::update_interval;
use crate::layer::Layer;
use crate::likelihood::{score_parameters, subtract_from_max};
use crate::particle::Particle;
use crate::physics::McmlPhysics;
use crate::streams::{backend_name, ChaChaStreams, SeededStdStreams, StreamProvider};
use crate::transport::{Roulette, Transport};
use mcsl_types::config::{RngBackend, RunConfig};
use mcsl_types::error::{McslError, McslResult};
use mcsl_types::state::{zero_ars, ArsTensor, ParameterEstimate, ParameterGrid};
use rand::RngCore;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Everything one worker touches during the parallel phase.
pub struct WorkerState<S> {
    pub particle: Particle,
    pub stream: S,
    pub ars: ArsTensor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationSummary {
    pub iteration: usize,
    pub num_particles: u64,
    pub detected: u64,
    /// Argmax cell of the scored grid.
    pub best: (usize, usize),
    pub best_mu_t: f64,
    pub best_etaa: f64,
    /// Centre of the next grid, before boundary shifts.
    pub center: (f64, f64),
    /// Log-likelihood maximum removed by the shift to zero.
    pub max_log_likelihood: f64,
    pub next_mut_span: f64,
    pub next_etaa_span: f64,
}

#[derive(Debug, Clone)]
pub struct InversionResult {
    pub estimate: ParameterEstimate,
    pub history: Vec<IterationSummary>,
    pub final_grid: ParameterGrid,
}

pub struct InverseRun<S: RngCore + Send> {
    config: RunConfig,
    exp: Vec<f64>,
    angle_div: usize,
    grid: ParameterGrid,
    medium: Layer,
    num_particles: u64,
    iteration: usize,
    streams: Vec<S>,
    pool: rayon::ThreadPool,
    physics: McmlPhysics,
    history: Vec<IterationSummary>,
    estimate: Option<ParameterEstimate>,
    last_detected: u64,
}

impl<S: RngCore + Send> InverseRun<S> {
    /// Set up a run with one stream per worker.
    pub fn with_streams(config: RunConfig, exp: Vec<f64>, streams: Vec<S>) -> McslResult<Self> {
        config.validate()?;
        if exp.is_empty() {
            return Err(McslError::ConfigError(
                "experimental data contains no values".to_string(),
            ));
        }
        let num_proc = config.simulation.num_proc;
        if streams.len() != num_proc {
            return Err(McslError::StreamProvision {
                requested: num_proc,
                spawned: streams.len(),
            });
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_proc)
            .build()
            .map_err(|e| McslError::ConfigError(format!("worker pool: {e}")))?;

        Ok(Self {
            angle_div: 2 * exp.len(),
            grid: config.create_grid()?,
            medium: Layer::from_config(&config.medium),
            num_particles: config.simulation.num_particles,
            iteration: 0,
            streams,
            pool,
            physics: McmlPhysics,
            history: Vec::with_capacity(config.simulation.num_iter),
            estimate: None,
            last_detected: 0,
            exp,
            config,
        })
    }

    pub fn grid(&self) -> &ParameterGrid {
        &self.grid
    }

    pub fn num_particles(&self) -> u64 {
        self.num_particles
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn angle_div(&self) -> usize {
        self.angle_div
    }

    pub fn is_finished(&self) -> bool {
        self.iteration >= self.config.simulation.num_iter
    }

    /// Run all workers on the current grid; returns the post-processed ARS.
    pub fn simulate(&mut self) -> McslResult<ArsTensor> {
        let (m, n) = self.grid.shape();
        let sim = &self.config.simulation;
        let num_proc = sim.num_proc;

        let mut medium = self.medium;
        medium.set_reference(self.grid.median_mut(), self.grid.median_etaa())?;

        let per_worker = self.num_particles / num_proc as u64;
        let remainder = self.num_particles % num_proc as u64;
        if remainder != 0 {
            warn!(
                num_particles = self.num_particles,
                num_proc,
                dropped = remainder,
                "Particle count not divisible by worker count, running {} per worker",
                per_worker
            );
        }

        let streams = std::mem::take(&mut self.streams);
        if streams.len() != num_proc {
            return Err(McslError::StreamProvision {
                requested: num_proc,
                spawned: streams.len(),
            });
        }

        let transport = Transport::new(&self.physics, medium, sim.radius, self.angle_div)
            .with_roulette(Roulette::from_config(sim));
        let t = transport.entry_weight();
        let workers: Vec<WorkerState<S>> = streams
            .into_iter()
            .map(|stream| WorkerState {
                particle: Particle::new(t, &self.grid, medium),
                stream,
                ars: zero_ars(m, n, self.angle_div),
            })
            .collect();

        debug!(
            workers = workers.len(),
            per_worker,
            mu_t_ref = medium.mu_t(),
            etaa_ref = medium.etaa(),
            "Fanning out transport workers"
        );
        let finished: Vec<McslResult<(WorkerState<S>, u64)>> = self.pool.install(|| {
            workers
                .into_par_iter()
                .map(|mut w| {
                    let detected = transport.run_packets(
                        &mut w.particle,
                        &mut w.stream,
                        &mut w.ars,
                        per_worker,
                    )?;
                    Ok((w, detected))
                })
                .collect()
        });

        let mut parts = Vec::with_capacity(num_proc);
        let mut detected = 0;
        for result in finished {
            let (worker, count) = result?;
            detected += count;
            parts.push(worker.ars);
            self.streams.push(worker.stream);
        }
        let mut total = merge_tensors(&parts)?;
        debug!(detected, "Merged worker accumulators");
        self.last_detected = detected;

        fix_ars(&mut total, self.num_particles)?;
        Ok(total)
    }

    /// One outer iteration.
    pub fn step(&mut self) -> McslResult<IterationSummary> {
        if self.is_finished() {
            return Err(McslError::ConfigError(format!(
                "all {} iterations already completed",
                self.config.simulation.num_iter
            )));
        }
        let iteration = self.iteration;
        let is_final = iteration + 1 == self.config.simulation.num_iter;

        let ars = self.simulate()?;
        let mut likelihood = score_parameters(&ars, &self.exp, &self.config.scoring)?;
        let max_log_likelihood = subtract_from_max(&mut likelihood);
        let update = update_interval(
            &likelihood,
            &self.grid,
            iteration,
            is_final,
            &self.config.interval,
        )?;

        let summary = IterationSummary {
            iteration,
            num_particles: self.num_particles,
            detected: self.last_detected,
            best: update.best,
            best_mu_t: self.grid.mut_values[update.best.0],
            best_etaa: self.grid.etaa_values[update.best.1],
            center: update.center,
            max_log_likelihood,
            next_mut_span: update.grid.mut_span(),
            next_etaa_span: update.grid.etaa_span(),
        };
        info!(
            iteration,
            num_particles = self.num_particles,
            best_mu_t = summary.best_mu_t,
            best_etaa = summary.best_etaa,
            mut_span = summary.next_mut_span,
            etaa_span = summary.next_etaa_span,
            "Search interval updated"
        );

        self.grid = update.grid;
        if update.estimate.is_some() {
            self.estimate = update.estimate;
        }
        self.iteration += 1;
        if !is_final {
            self.num_particles = self.num_particles.checked_mul(2).ok_or_else(|| {
                McslError::ConfigError(format!(
                    "particle count overflows after doubling {}",
                    self.num_particles
                ))
            })?;
        }
        self.history.push(summary.clone());
        Ok(summary)
    }

    /// Iterate to completion and return the final estimate.
    pub fn run(mut self) -> McslResult<InversionResult> {
        while !self.is_finished() {
            self.step()?;
        }
        let estimate = self.estimate.ok_or_else(|| McslError::Degenerate {
            iteration: self.iteration,
            message: "search finished without a parameter estimate".to_string(),
        })?;
        Ok(InversionResult {
            estimate,
            history: self.history,
            final_grid: self.grid,
        })
    }
}

/// Spawn streams for the configured backend and run the full search.
pub fn run_inversion(config: &RunConfig, exp: Vec<f64>) -> McslResult<InversionResult> {
    let sim = &config.simulation;
    let seed = sim.resolved_seed();
    info!(
        seed,
        rng = backend_name(sim.rng),
        num_proc = sim.num_proc,
        num_iter = sim.num_iter,
        angles = exp.len(),
        "Starting inverse search"
    );
    match sim.rng {
        RngBackend::Std => {
            let streams = SeededStdStreams { seed }.spawn(sim.num_proc)?;
            InverseRun::with_streams(config.clone(), exp, streams)?.run()
        }
        RngBackend::Chacha => {
            let streams = ChaChaStreams { seed }.spawn(sim.num_proc)?;
            InverseRun::with_streams(config.clone(), exp, streams)?.run()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcsl_types::config::{
        IntervalConfig, MediumConfig, ScoringConfig, SearchConfig, SimulationConfig,
    };

    fn small_config(num_particles: u64, num_proc: usize, num_iter: usize) -> RunConfig {
        RunConfig {
            medium: MediumConfig {
                n: 1.4,
                g: 0.75,
                z_max: 0.1,
            },
            search: SearchConfig {
                mut_min: 20.0,
                mut_max: 40.0,
                mut_n: 3,
                etaa_min: 0.05,
                etaa_max: 0.15,
                etaa_n: 3,
            },
            simulation: SimulationConfig {
                num_particles,
                num_iter,
                num_proc,
                seed: 42,
                radius: 50.0,
                rng: RngBackend::Chacha,
                roulette_threshold: 0.0,
                roulette_chance: 10.0,
            },
            scoring: ScoringConfig::default(),
            interval: IntervalConfig::default(),
        }
    }

    fn streams(count: usize) -> Vec<rand_chacha::ChaCha8Rng> {
        ChaChaStreams { seed: 42 }.spawn(count).expect("streams")
    }

    #[test]
    fn test_stream_count_must_match_workers() {
        let cfg = small_config(100, 3, 2);
        match InverseRun::with_streams(cfg, vec![1.0; 4], streams(2)) {
            Err(McslError::StreamProvision { requested, spawned }) => {
                assert_eq!(requested, 3);
                assert_eq!(spawned, 2);
            }
            Err(other) => panic!("Unexpected error: {other:?}"),
            Ok(_) => panic!("Expected stream provisioning error"),
        }
    }

    #[test]
    fn test_empty_data_rejected() {
        let cfg = small_config(100, 2, 2);
        assert!(matches!(
            InverseRun::with_streams(cfg, Vec::new(), streams(2)),
            Err(McslError::ConfigError(_))
        ));
    }

    #[test]
    fn test_simulate_shape_and_stream_reuse() {
        let cfg = small_config(201, 2, 2);
        let mut run = InverseRun::with_streams(cfg, vec![0.0; 5], streams(2)).expect("run");
        assert_eq!(run.angle_div(), 10);
        let ars = run.simulate().expect("simulate");
        assert_eq!(ars.dim(), (3, 3, 5));
        assert!(ars.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert!(ars.sum() > 0.0);
        assert_eq!(run.streams.len(), 2);
        assert_eq!(run.last_detected, 200);
    }

    #[test]
    fn test_simulate_is_deterministic_per_seed() {
        let cfg = small_config(300, 3, 2);
        let mut a = InverseRun::with_streams(cfg.clone(), vec![0.0; 4], streams(3)).expect("a");
        let mut b = InverseRun::with_streams(cfg, vec![0.0; 4], streams(3)).expect("b");
        assert_eq!(a.simulate().expect("a"), b.simulate().expect("b"));
    }
}
