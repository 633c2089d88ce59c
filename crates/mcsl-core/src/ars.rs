// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — ARS Post-Processing
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Raw detector histogram → angle-resolved scattering per unit solid angle.
//!
//! The detector uses `2M` bins of width `π/2M`. Pairs `(2i-1, 2i)` are
//! merged into bins centred on multiples of `π/M`, bin 0 keeps the forward
//! half-bin alone and the last raw bin is dropped. Each merged bin is
//! divided by its solid angle and the packet count, then the order is
//! reversed so that the backward direction comes first.

use mcsl_types::error::{McslError, McslResult};
use mcsl_types::state::ArsTensor;
use ndarray::{Array1, Array3};
use std::f64::consts::PI;

/// Solid-angle × packet-count divisor for each of the `m` merged bins.
pub fn bin_divisors(m: usize, num_particles: u64) -> Array1<f64> {
    let a = (180.0 / (2 * m) as f64).to_radians();
    let n = num_particles as f64;
    Array1::from_shape_fn(m, |i| {
        let cap = if i == 0 {
            1.0 - a.cos()
        } else {
            let lo = (2 * i - 1) as f64 * a;
            let hi = (2 * i + 1) as f64 * a;
            lo.cos() - hi.cos()
        };
        n * 2.0 * PI * cap
    })
}

/// Re-bin, normalize and reverse `ars` in place: `[m][n][2M]` → `[m][n][M]`.
///
/// Not idempotent: call exactly once per merged accumulator.
pub fn fix_ars(ars: &mut ArsTensor, num_particles: u64) -> McslResult<()> {
    let (dm, dn, raw_bins) = ars.dim();
    if raw_bins == 0 || raw_bins % 2 != 0 {
        return Err(McslError::ConfigError(format!(
            "ARS angle extent must be even and non-zero, got {raw_bins}"
        )));
    }
    if num_particles == 0 {
        return Err(McslError::ConfigError(
            "ARS normalization needs num_particles >= 1".to_string(),
        ));
    }
    let m = raw_bins / 2;
    let divisors = bin_divisors(m, num_particles);

    let mut fixed: ArsTensor = Array3::zeros((dm, dn, m));
    for i in 0..dm {
        for j in 0..dn {
            for b in 0..m {
                let merged = if b == 0 {
                    ars[[i, j, 0]]
                } else {
                    ars[[i, j, 2 * b - 1]] + ars[[i, j, 2 * b]]
                };
                fixed[[i, j, m - 1 - b]] = merged / divisors[b];
            }
        }
    }
    *ars = fixed;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_detector_scenario() {
        let mut ars = ArsTensor::zeros((1, 1, 4));
        ars[[0, 0, 2]] = 1.0;
        fix_ars(&mut ars, 1).expect("fix");
        assert_eq!(ars.dim(), (1, 1, 2));
        let expected = 1.0 / (2.0 * PI * 2f64.sqrt());
        assert!((ars[[0, 0, 0]] - expected).abs() < 1e-12, "got {}", ars[[0, 0, 0]]);
        assert_eq!(ars[[0, 0, 1]], 0.0);
    }

    #[test]
    fn test_bin_zero_uses_single_divisor() {
        let mut ars = ArsTensor::zeros((1, 1, 6));
        ars[[0, 0, 0]] = 3.0;
        ars[[0, 0, 5]] = 100.0;
        fix_ars(&mut ars, 2).expect("fix");
        let a = 30f64.to_radians();
        let expected = 3.0 / (2.0 * 2.0 * PI * (1.0 - a.cos()));
        assert!((ars[[0, 0, 2]] - expected).abs() < 1e-12);
        // tail bin is discarded
        assert_eq!(ars[[0, 0, 0]], 0.0);
        assert_eq!(ars[[0, 0, 1]], 0.0);
    }

    #[test]
    fn test_divisors_cover_hemisphere_pieces() {
        let d = bin_divisors(3, 1);
        let total: f64 = d.sum();
        // caps from 0 to 150 degrees
        let expected = 2.0 * PI * (1.0 - 150f64.to_radians().cos());
        assert!((total - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cells_are_processed_independently() {
        let mut ars = ArsTensor::zeros((2, 3, 4));
        ars[[1, 2, 1]] = 5.0;
        ars[[0, 1, 0]] = 7.0;
        fix_ars(&mut ars, 1).expect("fix");
        assert!(ars[[1, 2, 0]] > 0.0);
        assert!(ars[[0, 1, 1]] > 0.0);
        assert_eq!(ars[[0, 0, 0]], 0.0);
        assert_eq!(ars[[1, 2, 1]], 0.0);
    }

    #[test]
    fn test_odd_or_empty_extent_rejected() {
        for bins in [0usize, 3] {
            let mut ars = ArsTensor::zeros((1, 1, bins));
            match fix_ars(&mut ars, 10) {
                Err(McslError::ConfigError(msg)) => assert!(msg.contains("even")),
                other => panic!("Unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn test_not_idempotent() {
        let mut ars = ArsTensor::from_elem((1, 1, 8), 1.0);
        fix_ars(&mut ars, 1).expect("first");
        let once = ars.clone();
        fix_ars(&mut ars, 1).expect("second");
        assert_ne!(ars.dim(), once.dim());

        // second pass re-divides the already normalized forward bin
        let div = bin_divisors(2, 1);
        assert!((ars[[0, 0, 1]] - once[[0, 0, 0]] / div[0]).abs() < 1e-12);
        let changed = (0..ars.dim().2).any(|k| (ars[[0, 0, k]] - once[[0, 0, k]]).abs() > 1e-9);
        assert!(changed, "overlapping bins unchanged: {ars} vs {once}");
    }
}
