// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{MAX_ETAA, MIN_MUT};
use crate::error::{McslError, McslResult};
use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

/// Angle-resolved scattering histogram, indexed `[mut][etaa][angle_bin]`.
pub type ArsTensor = Array3<f64>;

/// One log-likelihood score per (μt, η) grid point, indexed `[mut][etaa]`.
pub type LikelihoodGrid = Array2<f64>;

/// Zero-filled ARS tensor for a grid of `mut_n × etaa_n` cells.
pub fn zero_ars(mut_n: usize, etaa_n: usize, angle_div: usize) -> ArsTensor {
    Array3::zeros((mut_n, etaa_n, angle_div))
}

/// Trial parameter grid of total attenuation μt and albedo ratio η.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    pub mut_values: Array1<f64>,
    pub etaa_values: Array1<f64>,
}

fn validate_axis(values: &[f64], label: &str) -> McslResult<()> {
    if values.len() < 2 {
        return Err(McslError::ConfigError(format!(
            "{label} grid needs at least 2 points, got {}",
            values.len()
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(McslError::ConfigError(format!(
            "{label} grid values must be finite"
        )));
    }
    for (idx, pair) in values.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(McslError::ConfigError(format!(
                "{label} grid must be strictly increasing at index {}: {} <= {}",
                idx + 1,
                pair[1],
                pair[0]
            )));
        }
    }
    Ok(())
}

fn linspace_axis(min: f64, max: f64, n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![min; n];
    }
    (0..n)
        .map(|i| min + i as f64 * (max - min) / (n - 1) as f64)
        .collect()
}

impl ParameterGrid {
    /// Build a grid from explicit axis values.
    pub fn new(mut_values: Vec<f64>, etaa_values: Vec<f64>) -> McslResult<Self> {
        validate_axis(&mut_values, "mut")?;
        validate_axis(&etaa_values, "etaa")?;
        if mut_values[0] < MIN_MUT {
            return Err(McslError::ConfigError(format!(
                "mut values must be >= {MIN_MUT}, got {}",
                mut_values[0]
            )));
        }
        let etaa_last = etaa_values[etaa_values.len() - 1];
        if etaa_values[0] < 0.0 || etaa_last > MAX_ETAA {
            return Err(McslError::ConfigError(format!(
                "etaa values must lie in [0, {MAX_ETAA}], got [{}, {}]",
                etaa_values[0], etaa_last
            )));
        }
        Ok(Self {
            mut_values: Array1::from(mut_values),
            etaa_values: Array1::from(etaa_values),
        })
    }

    /// Evenly spaced grid: `min + i * (max - min) / (n - 1)` on each axis.
    pub fn from_ranges(
        mut_min: f64,
        mut_max: f64,
        mut_n: usize,
        etaa_min: f64,
        etaa_max: f64,
        etaa_n: usize,
    ) -> McslResult<Self> {
        Self::new(
            linspace_axis(mut_min, mut_max, mut_n),
            linspace_axis(etaa_min, etaa_max, etaa_n),
        )
    }

    pub fn mut_len(&self) -> usize {
        self.mut_values.len()
    }

    pub fn etaa_len(&self) -> usize {
        self.etaa_values.len()
    }

    /// `(mut_len, etaa_len)`, the shape of likelihood grids over this grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.mut_len(), self.etaa_len())
    }

    /// Median μt (upper median for even counts), used as the sampling reference.
    pub fn median_mut(&self) -> f64 {
        self.mut_values[self.mut_len() / 2]
    }

    pub fn median_etaa(&self) -> f64 {
        self.etaa_values[self.etaa_len() / 2]
    }

    pub fn mut_span(&self) -> f64 {
        self.mut_values[self.mut_len() - 1] - self.mut_values[0]
    }

    pub fn etaa_span(&self) -> f64 {
        self.etaa_values[self.etaa_len() - 1] - self.etaa_values[0]
    }

    /// Grid with the same point counts spanning `center ± half_width` on each axis.
    pub fn centered(
        &self,
        mut_center: f64,
        mut_half_width: f64,
        etaa_center: f64,
        etaa_half_width: f64,
    ) -> McslResult<Self> {
        Self::new(
            linspace_axis(
                mut_center - mut_half_width,
                mut_center + mut_half_width,
                self.mut_len(),
            ),
            linspace_axis(
                etaa_center - etaa_half_width,
                etaa_center + etaa_half_width,
                self.etaa_len(),
            ),
        )
    }
}

/// Final parameter estimate of the inverse search.
///
/// The log-likelihood near its maximum is modelled as
/// `ℓ ≈ ℓ₀ - a_mut·Δμt² - a_cross·Δμt·Δη - a_etaa·Δη²`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimate {
    pub a_mut: f64,
    pub a_etaa: f64,
    pub a_cross: f64,
    pub etaa: f64,
    pub mu_t: f64,
}

impl ParameterEstimate {
    /// Output ordering `[a_mut, a_etaa, a_cross, η, μt]`.
    pub fn to_output_vec(&self) -> [f64; 5] {
        [self.a_mut, self.a_etaa, self.a_cross, self.etaa, self.mu_t]
    }

    /// Scattering coefficient μs = μt (1 - η).
    pub fn mu_s(&self) -> f64 {
        self.mu_t * (1.0 - self.etaa)
    }

    /// Absorption coefficient μa = μt η.
    pub fn mu_a(&self) -> f64 {
        self.mu_t * self.etaa
    }

    fn hessian_det(&self) -> f64 {
        4.0 * self.a_mut * self.a_etaa - self.a_cross * self.a_cross
    }

    /// 1-σ uncertainty of μt from the inverse Hessian of -ℓ.
    pub fn sigma_mu_t(&self) -> Option<f64> {
        let det = self.hessian_det();
        if det <= 0.0 || self.a_etaa <= 0.0 {
            return None;
        }
        Some((2.0 * self.a_etaa / det).sqrt())
    }

    /// 1-σ uncertainty of η from the inverse Hessian of -ℓ.
    pub fn sigma_etaa(&self) -> Option<f64> {
        let det = self.hessian_det();
        if det <= 0.0 || self.a_mut <= 0.0 {
            return None;
        }
        Some((2.0 * self.a_mut / det).sqrt())
    }
}
