// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Importance Weights
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Importance-sampling weights over the whole (μt, η) grid.
//!
//! Paths are sampled with the reference coefficients (μt₀, η₀). For a path
//! with `k` interactions and in-medium length `L`, grid point (μt_i, η_j)
//! receives the likelihood ratio
//!
//! ```text
//! (μt_i/μt₀)^k · exp(-(μt_i - μt₀)·L) · ((1 - η_j)/(1 - η₀))^k
//! ```
//!
//! which factorizes into a `mut` vector and an `etaa` vector. The running
//! scalar `w_scale` carries the reference weight `T·(1 - η₀)^k`.

use crate::layer::Layer;
use mcsl_types::state::ParameterGrid;
use ndarray::{Array1, Array2, Zip};

#[derive(Debug, Clone, PartialEq)]
pub struct Weight {
    pub w_scale: f64,
    pub mut_vec: Array1<f64>,
    pub etaa_vec: Array1<f64>,
    mut_ratio: Array1<f64>,
    mut_delta: Array1<f64>,
    etaa_ratio: Array1<f64>,
}

impl Weight {
    /// Weights for `grid`, sampled with the reference coefficients of `layer`.
    pub fn new(grid: &ParameterGrid, layer: &Layer, t: f64) -> Self {
        let mut_ref = layer.mu_t();
        let etaa_ref = layer.etaa();
        let mut_ratio = grid.mut_values.mapv(|m| m / mut_ref);
        let mut_delta = grid.mut_values.mapv(|m| m - mut_ref);
        let etaa_ratio = grid.etaa_values.mapv(|e| (1.0 - e) / (1.0 - etaa_ref));
        Weight {
            w_scale: t,
            mut_vec: Array1::ones(grid.mut_len()),
            etaa_vec: Array1::ones(grid.etaa_len()),
            mut_ratio,
            mut_delta,
            etaa_ratio,
        }
    }

    /// Start a new packet with running weight `t`.
    pub fn reset(&mut self, t: f64) {
        self.w_scale = t;
        self.mut_vec.fill(1.0);
        self.etaa_vec.fill(1.0);
    }

    /// Survival over a path segment of length `distance`.
    pub fn attenuate(&mut self, distance: f64) {
        Zip::from(&mut self.mut_vec)
            .and(&self.mut_delta)
            .for_each(|w, &d| *w *= (-d * distance).exp());
    }

    /// One interaction event keeping `albedo` of the reference weight.
    pub fn interact(&mut self, albedo: f64) {
        self.w_scale *= albedo;
        self.mut_vec *= &self.mut_ratio;
        self.etaa_vec *= &self.etaa_ratio;
    }

    /// Full weight matrix `w_scale · outer(mut_vec, etaa_vec)`, indexed `[mut][etaa]`.
    pub fn matrix(&self) -> Array2<f64> {
        let m = self.mut_vec.len();
        let n = self.etaa_vec.len();
        let mut out = Array2::zeros((m, n));
        for (i, &wm) in self.mut_vec.iter().enumerate() {
            let row_scale = self.w_scale * wm;
            for (j, &we) in self.etaa_vec.iter().enumerate() {
                out[[i, j]] = row_scale * we;
            }
        }
        out
    }
}
