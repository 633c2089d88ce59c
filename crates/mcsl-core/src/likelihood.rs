// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Likelihood Scoring
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Gaussian log-likelihood of each grid cell against the measured ARS.

use mcsl_types::config::ScoringConfig;
use mcsl_types::error::{McslError, McslResult};
use mcsl_types::state::{ArsTensor, LikelihoodGrid};
use ndarray::{Array2, Zip};

/// `-½ Σ_k (sim_k - exp_k)² / σ_k²` with `σ_k = rel·|exp_k| + abs`.
pub fn score_parameters(
    ars: &ArsTensor,
    exp: &[f64],
    config: &ScoringConfig,
) -> McslResult<LikelihoodGrid> {
    let (m, n, bins) = ars.dim();
    if bins != exp.len() {
        return Err(McslError::Scoring(format!(
            "simulated ARS has {bins} angles, experimental data has {}",
            exp.len()
        )));
    }
    let inv_var: Vec<f64> = exp
        .iter()
        .map(|&e| {
            let sigma = config.rel_uncertainty * e.abs() + config.abs_uncertainty;
            1.0 / (sigma * sigma)
        })
        .collect();

    let mut grid: LikelihoodGrid = Array2::zeros((m, n));
    Zip::from(&mut grid)
        .and(ars.lanes(ndarray::Axis(2)))
        .for_each(|score, sim| {
            let chi2: f64 = sim
                .iter()
                .zip(exp.iter())
                .zip(inv_var.iter())
                .map(|((&s, &e), &w)| (s - e) * (s - e) * w)
                .sum();
            *score = -0.5 * chi2;
        });

    if let Some(((i, j), v)) = grid.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(McslError::Scoring(format!(
            "non-finite log-likelihood {v} at cell ({i}, {j})"
        )));
    }
    Ok(grid)
}

/// Shift so that the maximum becomes 0; returns the removed maximum.
pub fn subtract_from_max(grid: &mut LikelihoodGrid) -> f64 {
    let max = grid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_finite() {
        grid.mapv_inplace(|v| v - max);
    }
    max
}
