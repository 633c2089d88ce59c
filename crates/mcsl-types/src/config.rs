// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{MAX_ETAA, MAX_NUM_PROC, MIN_FIT_POINTS_PER_AXIS, MIN_MUT};
use crate::error::{McslError, McslResult};
use crate::state::ParameterGrid;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Top-level run configuration.
/// Maps 1:1 to the `mcsl_config.json` schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub medium: MediumConfig,
    pub search: SearchConfig,
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub interval: IntervalConfig,
}

/// Physical parameters of the single slab layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediumConfig {
    /// Refractive index
    pub n: f64,
    /// Henyey-Greenstein anisotropy
    pub g: f64,
    /// Slab thickness, same length unit as 1/μt
    pub z_max: f64,
}

/// Initial (μt, η) search ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub mut_min: f64,
    pub mut_max: f64,
    pub mut_n: usize,
    pub etaa_min: f64,
    pub etaa_max: f64,
    pub etaa_n: usize,
}

/// Random-number backend used for the per-worker streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RngBackend {
    /// `StdRng` streams seeded through SplitMix64.
    #[default]
    Std,
    /// `ChaCha8Rng` with one stream id per worker.
    Chacha,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Packets in the first outer iteration; doubled every iteration.
    pub num_particles: u64,
    /// Number of outer (search-interval) iterations.
    pub num_iter: usize,
    /// Worker thread count.
    pub num_proc: usize,
    /// RNG seed; 0 means wall-clock seconds.
    #[serde(default)]
    pub seed: u64,
    /// Detector sphere radius, centred on the beam entry point.
    pub radius: f64,
    #[serde(default)]
    pub rng: RngBackend,
    /// Russian roulette threshold on the running weight (0 disables).
    #[serde(default)]
    pub roulette_threshold: f64,
    /// Survival odds 1 / roulette_chance; survivors gain this factor.
    #[serde(default = "default_roulette_chance")]
    pub roulette_chance: f64,
}

fn default_roulette_chance() -> f64 {
    10.0
}

/// Gaussian log-likelihood noise model, σ = rel·|exp| + abs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_rel_uncertainty")]
    pub rel_uncertainty: f64,
    #[serde(default = "default_abs_uncertainty")]
    pub abs_uncertainty: f64,
}

fn default_rel_uncertainty() -> f64 {
    0.05
}
fn default_abs_uncertainty() -> f64 {
    1e-9
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            rel_uncertainty: default_rel_uncertainty(),
            abs_uncertainty: default_abs_uncertainty(),
        }
    }
}

/// Search-interval refinement policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalConfig {
    /// Half-width multiplier per iteration, in (0, 1).
    #[serde(default = "default_shrink_factor")]
    pub shrink_factor: f64,
    /// Paraboloid fit radius in cells around the best point; absent = whole grid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_window: Option<usize>,
}

fn default_shrink_factor() -> f64 {
    0.5
}

impl Default for IntervalConfig {
    fn default() -> Self {
        IntervalConfig {
            shrink_factor: default_shrink_factor(),
            fit_window: None,
        }
    }
}

impl SimulationConfig {
    /// Seed actually used: the configured one, or wall-clock seconds for 0.
    pub fn resolved_seed(&self) -> u64 {
        if self.seed != 0 {
            return self.seed;
        }
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(1)
    }
}

impl RunConfig {
    /// Load from JSON file.
    pub fn from_file(path: &str) -> McslResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Create the initial parameter grid from the search ranges.
    pub fn create_grid(&self) -> McslResult<ParameterGrid> {
        let s = &self.search;
        ParameterGrid::from_ranges(
            s.mut_min, s.mut_max, s.mut_n, s.etaa_min, s.etaa_max, s.etaa_n,
        )
    }

    pub fn validate(&self) -> McslResult<()> {
        let m = &self.medium;
        if !m.n.is_finite() || m.n < 1.0 {
            return Err(McslError::ConfigError(
                "medium.n must be finite and >= 1".to_string(),
            ));
        }
        if !m.g.is_finite() || m.g <= -1.0 || m.g >= 1.0 {
            return Err(McslError::ConfigError(
                "medium.g must be finite and in (-1, 1)".to_string(),
            ));
        }
        if !m.z_max.is_finite() || m.z_max <= 0.0 {
            return Err(McslError::ConfigError(
                "medium.z_max must be finite and > 0".to_string(),
            ));
        }

        let s = &self.search;
        if s.mut_n < MIN_FIT_POINTS_PER_AXIS || s.etaa_n < MIN_FIT_POINTS_PER_AXIS {
            return Err(McslError::ConfigError(format!(
                "paraboloid fit needs >= {MIN_FIT_POINTS_PER_AXIS} search points per axis, \
                 got mut_n={}, etaa_n={}",
                s.mut_n, s.etaa_n
            )));
        }
        if !(s.mut_min.is_finite() && s.mut_max.is_finite()) || s.mut_min < MIN_MUT {
            return Err(McslError::ConfigError(format!(
                "search.mut range must be finite with mut_min >= {MIN_MUT}"
            )));
        }
        if s.mut_max <= s.mut_min || s.etaa_max <= s.etaa_min {
            return Err(McslError::ConfigError(
                "search ranges must satisfy min < max".to_string(),
            ));
        }
        if s.etaa_min < 0.0 || s.etaa_max > MAX_ETAA {
            return Err(McslError::ConfigError(format!(
                "search.etaa range must lie in [0, {MAX_ETAA}]"
            )));
        }

        let sim = &self.simulation;
        if sim.num_particles == 0 {
            return Err(McslError::ConfigError(
                "simulation.num_particles must be >= 1".to_string(),
            ));
        }
        if sim.num_iter == 0 {
            return Err(McslError::ConfigError(
                "simulation.num_iter must be >= 1".to_string(),
            ));
        }
        if sim.num_proc == 0 || sim.num_proc > MAX_NUM_PROC {
            return Err(McslError::ConfigError(format!(
                "simulation.num_proc must be in [1, {MAX_NUM_PROC}], got {}",
                sim.num_proc
            )));
        }
        if !sim.radius.is_finite() || sim.radius <= 0.0 {
            return Err(McslError::ConfigError(
                "simulation.radius must be finite and > 0".to_string(),
            ));
        }
        if !sim.roulette_threshold.is_finite() || sim.roulette_threshold < 0.0 {
            return Err(McslError::ConfigError(
                "simulation.roulette_threshold must be finite and >= 0".to_string(),
            ));
        }
        if !sim.roulette_chance.is_finite() || sim.roulette_chance <= 1.0 {
            return Err(McslError::ConfigError(
                "simulation.roulette_chance must be finite and > 1".to_string(),
            ));
        }

        let sc = &self.scoring;
        if !sc.rel_uncertainty.is_finite() || sc.rel_uncertainty < 0.0 {
            return Err(McslError::ConfigError(
                "scoring.rel_uncertainty must be finite and >= 0".to_string(),
            ));
        }
        if !sc.abs_uncertainty.is_finite() || sc.abs_uncertainty < 0.0 {
            return Err(McslError::ConfigError(
                "scoring.abs_uncertainty must be finite and >= 0".to_string(),
            ));
        }
        if sc.rel_uncertainty == 0.0 && sc.abs_uncertainty == 0.0 {
            return Err(McslError::ConfigError(
                "scoring uncertainties cannot both be zero".to_string(),
            ));
        }

        let iv = &self.interval;
        if !iv.shrink_factor.is_finite() || iv.shrink_factor <= 0.0 || iv.shrink_factor >= 1.0 {
            return Err(McslError::ConfigError(
                "interval.shrink_factor must be finite and in (0, 1)".to_string(),
            ));
        }
        // a window of w cells covers at most 2w + 1 points per axis
        if let Some(w) = iv.fit_window {
            if 2 * w + 1 < MIN_FIT_POINTS_PER_AXIS {
                return Err(McslError::ConfigError(format!(
                    "interval.fit_window={w} covers fewer than the \
                     {MIN_FIT_POINTS_PER_AXIS} points per axis the paraboloid fit needs"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// CARGO_MANIFEST_DIR points to crates/mcsl-types/ at compile time,
    /// so we go up 2 levels to reach the workspace root.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
    }

    fn config_path(relative: &str) -> String {
        project_root().join(relative).to_string_lossy().to_string()
    }

    fn sample() -> RunConfig {
        RunConfig::from_file(&config_path("data/mcsl_config.json")).unwrap()
    }

    #[test]
    fn test_load_sample_config() {
        let cfg = sample();
        assert!((cfg.medium.n - 1.5).abs() < 1e-12);
        assert!((cfg.medium.g - 0.8).abs() < 1e-12);
        assert_eq!(cfg.search.mut_n, 5);
        assert_eq!(cfg.search.etaa_n, 5);
        assert_eq!(cfg.simulation.num_proc, 4);
        assert_eq!(cfg.simulation.rng, RngBackend::Chacha);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let json = r#"{
            "medium": {"n": 1.33, "g": 0.0, "z_max": 1.0},
            "search": {"mut_min": 1.0, "mut_max": 2.0, "mut_n": 3,
                       "etaa_min": 0.0, "etaa_max": 0.5, "etaa_n": 3},
            "simulation": {"num_particles": 100, "num_iter": 2, "num_proc": 1, "radius": 10.0}
        }"#;
        let cfg: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.simulation.seed, 0);
        assert_eq!(cfg.simulation.rng, RngBackend::Std);
        assert_eq!(cfg.simulation.roulette_threshold, 0.0);
        assert!((cfg.scoring.rel_uncertainty - 0.05).abs() < 1e-12);
        assert!((cfg.interval.shrink_factor - 0.5).abs() < 1e-12);
        assert!(cfg.interval.fit_window.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_create_grid_from_sample() {
        let grid = sample().create_grid().unwrap();
        assert_eq!(grid.shape(), (5, 5));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut bad_proc = sample();
        bad_proc.simulation.num_proc = MAX_NUM_PROC + 1;
        let mut bad_g = sample();
        bad_g.medium.g = 1.0;
        let mut bad_grid = sample();
        bad_grid.search.mut_n = 1;
        let mut bad_shrink = sample();
        bad_shrink.interval.shrink_factor = 1.0;
        let mut bad_radius = sample();
        bad_radius.simulation.radius = f64::NAN;
        for cfg in [bad_proc, bad_g, bad_grid, bad_shrink, bad_radius] {
            match cfg.validate() {
                Err(McslError::ConfigError(_)) => {}
                other => panic!("Expected config error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_validate_rejects_grid_too_small_to_fit() {
        let mut two_mut = sample();
        two_mut.search.mut_n = 2;
        let mut two_etaa = sample();
        two_etaa.search.etaa_n = 2;
        for cfg in [two_mut, two_etaa] {
            match cfg.validate() {
                Err(McslError::ConfigError(msg)) => assert!(msg.contains("paraboloid fit")),
                other => panic!("Expected config error, got {other:?}"),
            }
        }

        let mut three = sample();
        three.search.mut_n = MIN_FIT_POINTS_PER_AXIS;
        three.search.etaa_n = MIN_FIT_POINTS_PER_AXIS;
        assert!(three.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_fit_window_too_narrow() {
        let mut zero = sample();
        zero.interval.fit_window = Some(0);
        match zero.validate() {
            Err(McslError::ConfigError(msg)) => assert!(msg.contains("paraboloid fit")),
            other => panic!("Expected config error, got {other:?}"),
        }

        let mut one = sample();
        one.interval.fit_window = Some(1);
        assert!(one.validate().is_ok());
    }

    #[test]
    fn test_resolved_seed_prefers_configured_value() {
        let mut cfg = sample();
        cfg.simulation.seed = 1234;
        assert_eq!(cfg.simulation.resolved_seed(), 1234);
        cfg.simulation.seed = 0;
        assert_ne!(cfg.simulation.resolved_seed(), 0);
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = sample();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.search.mut_n, cfg2.search.mut_n);
        assert_eq!(cfg.simulation.rng, cfg2.simulation.rng);
        assert_eq!(cfg.simulation.num_particles, cfg2.simulation.num_particles);
    }
}
