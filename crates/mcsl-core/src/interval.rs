// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Search Interval Update
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Re-centre and narrow the (μt, η) grid around the likelihood maximum.
//!
//! A quadratic surface is least-squares fitted to the log-likelihood in
//! normalized coordinates `x = (μt - c_μt) / h_μt`, `y = (η - c_η) / h_η`,
//! where `c` is the centre and `h` the half-span of the current grid.
//! Its vertex becomes the new centre when the surface is concave and the
//! vertex lies inside the grid; otherwise the best cell does.

use mcsl_math::linalg::{least_squares, numerical_rank};
use mcsl_types::config::IntervalConfig;
use mcsl_types::constants::{MAX_ETAA, MIN_FIT_POINTS_PER_AXIS, MIN_LIKELIHOOD_RANGE, MIN_MUT};
use mcsl_types::error::{McslError, McslResult};
use mcsl_types::state::{LikelihoodGrid, ParameterEstimate, ParameterGrid};
use ndarray::{Array1, Array2};
use tracing::{debug, warn};

const FIT_REL_CUTOFF: f64 = 1e-7;
const N_COEFFS: usize = 6;
const ETAA_EDGE: f64 = 1e-12;
const MUT_EDGE_REL: f64 = 1e-12;

/// `ℓ ≈ c0 + c1·x + c2·y + c3·x² + c4·x·y + c5·y²` in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paraboloid {
    pub coeffs: [f64; N_COEFFS],
    pub mut_center: f64,
    pub mut_half_span: f64,
    pub etaa_center: f64,
    pub etaa_half_span: f64,
}

impl Paraboloid {
    /// Surface value at normalized `(x, y)`.
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let c = &self.coeffs;
        c[0] + c[1] * x + c[2] * y + c[3] * x * x + c[4] * x * y + c[5] * y * y
    }

    fn hessian_det(&self) -> f64 {
        let c = &self.coeffs;
        4.0 * c[3] * c[5] - c[4] * c[4]
    }

    /// Negative-definite Hessian.
    pub fn is_concave(&self) -> bool {
        self.coeffs[3] < 0.0 && self.hessian_det() > 0.0
    }

    /// Stationary point in normalized coordinates.
    pub fn vertex(&self) -> Option<(f64, f64)> {
        let det = self.hessian_det();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let c = &self.coeffs;
        let x = (-2.0 * c[5] * c[1] + c[4] * c[2]) / det;
        let y = (-2.0 * c[3] * c[2] + c[4] * c[1]) / det;
        Some((x, y))
    }

    pub fn to_physical(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.mut_center + x * self.mut_half_span,
            self.etaa_center + y * self.etaa_half_span,
        )
    }

    /// `(a_mut, a_etaa, a_cross)` of `ℓ₀ - a_mut·Δμt² - a_cross·Δμt·Δη - a_etaa·Δη²`.
    pub fn curvature(&self) -> (f64, f64, f64) {
        let c = &self.coeffs;
        let hm = self.mut_half_span;
        let he = self.etaa_half_span;
        (-c[3] / (hm * hm), -c[5] / (he * he), -c[4] / (hm * he))
    }
}

#[derive(Debug, Clone)]
pub struct IntervalUpdate {
    /// Grid for the next iteration.
    pub grid: ParameterGrid,
    /// Argmax cell `(mut index, etaa index)` of the scored grid.
    pub best: (usize, usize),
    /// `(μt, η)` the new grid is centred on, before boundary shifts.
    pub center: (f64, f64),
    /// Only on the final iteration.
    pub estimate: Option<ParameterEstimate>,
    pub fit: Option<Paraboloid>,
}

/// Argmax cell of the likelihood grid.
pub fn best_cell(likelihood: &LikelihoodGrid) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;
    for ((i, j), &v) in likelihood.indexed_iter() {
        if v > best_val {
            best_val = v;
            best = (i, j);
        }
    }
    best
}

/// Quadratic fit over cells within `window` of `best` (whole grid if `None`).
///
/// Returns `None` when fewer than 3 points per axis are available or the
/// design matrix is rank deficient.
pub fn fit_paraboloid(
    likelihood: &LikelihoodGrid,
    grid: &ParameterGrid,
    best: (usize, usize),
    window: Option<usize>,
) -> Option<Paraboloid> {
    let (m, n) = likelihood.dim();
    let (i_lo, i_hi, j_lo, j_hi) = match window {
        Some(w) => (
            best.0.saturating_sub(w),
            (best.0 + w).min(m - 1),
            best.1.saturating_sub(w),
            (best.1 + w).min(n - 1),
        ),
        None => (0, m - 1, 0, n - 1),
    };
    let rows_m = i_hi - i_lo + 1;
    let rows_n = j_hi - j_lo + 1;
    if rows_m < MIN_FIT_POINTS_PER_AXIS || rows_n < MIN_FIT_POINTS_PER_AXIS {
        return None;
    }

    let mut_first = grid.mut_values[0];
    let etaa_first = grid.etaa_values[0];
    let mut_half_span = 0.5 * grid.mut_span();
    let etaa_half_span = 0.5 * grid.etaa_span();
    let mut_center = mut_first + mut_half_span;
    let etaa_center = etaa_first + etaa_half_span;

    let count = rows_m * rows_n;
    let mut a: Array2<f64> = Array2::zeros((count, N_COEFFS));
    let mut b: Array1<f64> = Array1::zeros(count);
    let mut row = 0;
    for i in i_lo..=i_hi {
        let x = (grid.mut_values[i] - mut_center) / mut_half_span;
        for j in j_lo..=j_hi {
            let y = (grid.etaa_values[j] - etaa_center) / etaa_half_span;
            let features = [1.0, x, y, x * x, x * y, y * y];
            for (k, f) in features.iter().enumerate() {
                a[[row, k]] = *f;
            }
            b[row] = likelihood[[i, j]];
            row += 1;
        }
    }

    if numerical_rank(&a, FIT_REL_CUTOFF) < N_COEFFS {
        return None;
    }
    let sol = least_squares(&a, &b, FIT_REL_CUTOFF);
    if sol.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let mut coeffs = [0.0; N_COEFFS];
    for (dst, src) in coeffs.iter_mut().zip(sol.iter()) {
        *dst = *src;
    }
    Some(Paraboloid {
        coeffs,
        mut_center,
        mut_half_span,
        etaa_center,
        etaa_half_span,
    })
}

fn check_surface(likelihood: &LikelihoodGrid, iteration: usize) -> McslResult<()> {
    if let Some(((i, j), v)) = likelihood.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(McslError::Degenerate {
            iteration,
            message: format!("non-finite log-likelihood {v} at cell ({i}, {j})"),
        });
    }
    let max = likelihood.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = likelihood.iter().copied().fold(f64::INFINITY, f64::min);
    if max - min < MIN_LIKELIHOOD_RANGE {
        return Err(McslError::Degenerate {
            iteration,
            message: format!("flat log-likelihood surface (range {:.3e})", max - min),
        });
    }
    Ok(())
}

/// Keep `[center - half, center + half]` inside the admissible (μt, η) region.
fn admissible_window(
    mut_center: f64,
    mut_half: f64,
    etaa_center: f64,
    etaa_half: f64,
) -> (f64, f64, f64, f64) {
    let mut_center = mut_center.max((MIN_MUT + mut_half) * (1.0 + MUT_EDGE_REL));

    let usable = MAX_ETAA - 2.0 * ETAA_EDGE;
    let etaa_half = etaa_half.min(0.5 * usable);
    let etaa_center = etaa_center
        .max(ETAA_EDGE + etaa_half)
        .min(MAX_ETAA - ETAA_EDGE - etaa_half);

    (mut_center, mut_half, etaa_center, etaa_half)
}

/// Score-driven grid update for outer iteration `iteration`.
pub fn update_interval(
    likelihood: &LikelihoodGrid,
    grid: &ParameterGrid,
    iteration: usize,
    is_final: bool,
    config: &IntervalConfig,
) -> McslResult<IntervalUpdate> {
    if likelihood.dim() != grid.shape() {
        return Err(McslError::ConfigError(format!(
            "likelihood shape {:?} does not match grid {:?}",
            likelihood.dim(),
            grid.shape()
        )));
    }
    if !(config.shrink_factor > 0.0 && config.shrink_factor < 1.0) {
        return Err(McslError::ConfigError(format!(
            "interval.shrink_factor must be in (0, 1), got {}",
            config.shrink_factor
        )));
    }
    check_surface(likelihood, iteration)?;

    let best = best_cell(likelihood);
    let best_point = (grid.mut_values[best.0], grid.etaa_values[best.1]);
    let fit = fit_paraboloid(likelihood, grid, best, config.fit_window);

    let center = match fit {
        Some(p) if p.is_concave() => match p.vertex() {
            Some((x, y)) if x.abs() <= 1.0 && y.abs() <= 1.0 => p.to_physical(x, y),
            _ => {
                warn!(
                    iteration,
                    "Paraboloid vertex outside grid, centring on best cell ({}, {})",
                    best.0,
                    best.1
                );
                best_point
            }
        },
        Some(_) => {
            warn!(iteration, "Paraboloid fit not concave, centring on best cell");
            best_point
        }
        None => {
            warn!(iteration, "Paraboloid fit unavailable, centring on best cell");
            best_point
        }
    };
    if let Some(p) = &fit {
        debug!(iteration, coeffs = ?p.coeffs, "Paraboloid fit");
    }

    let estimate = if is_final {
        match fit {
            Some(p) if p.is_concave() => {
                let (a_mut, a_etaa, a_cross) = p.curvature();
                Some(ParameterEstimate {
                    a_mut,
                    a_etaa,
                    a_cross,
                    etaa: center.1,
                    mu_t: center.0,
                })
            }
            _ => {
                return Err(McslError::Degenerate {
                    iteration,
                    message: "final log-likelihood surface has no concave quadratic fit"
                        .to_string(),
                });
            }
        }
    } else {
        None
    };

    let shrink = config.shrink_factor;
    let (mut_center, mut_half, etaa_center, etaa_half) = admissible_window(
        center.0,
        shrink * 0.5 * grid.mut_span(),
        center.1,
        shrink * 0.5 * grid.etaa_span(),
    );
    let next = grid.centered(mut_center, mut_half, etaa_center, etaa_half)?;

    Ok(IntervalUpdate {
        grid: next,
        best,
        center,
        estimate,
        fit,
    })
}
