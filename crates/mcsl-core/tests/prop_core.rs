// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Property-Based Tests (proptest) for mcsl-core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for mcsl-core using proptest.
//!
//! Covers: accumulator associativity, angle-bin clamping, ARS reshape and
//! reversal, non-idempotent post-processing, search interval narrowing.

use mcsl_core::accumulate::{add_tensor, merge_tensors};
use mcsl_core::ars::{bin_divisors, fix_ars};
use mcsl_core::detector::angle_bin;
use mcsl_core::interval::update_interval;
use mcsl_types::config::IntervalConfig;
use mcsl_types::state::{ArsTensor, ParameterGrid};
use ndarray::{Array2, Array3};
use proptest::prelude::*;
use std::f64::consts::PI;

fn tensor_from(values: &[f64], m: usize, n: usize, k: usize) -> ArsTensor {
    Array3::from_shape_fn((m, n, k), |(i, j, l)| values[(i * n + j) * k + l])
}

// ── Accumulator ──────────────────────────────────────────────────────

proptest! {
    /// (a + b) + c equals a + (b + c) and b + a equals a + b.
    #[test]
    fn accumulator_order_independent(
        values in prop::collection::vec(0.0f64..1.0, 3 * 24),
    ) {
        let a = tensor_from(&values[0..24], 2, 3, 4);
        let b = tensor_from(&values[24..48], 2, 3, 4);
        let c = tensor_from(&values[48..72], 2, 3, 4);

        let mut left = a.clone();
        add_tensor(&mut left, &b, 2, 3).unwrap();
        add_tensor(&mut left, &c, 2, 3).unwrap();

        let mut bc = b.clone();
        add_tensor(&mut bc, &c, 2, 3).unwrap();
        let mut right = a.clone();
        add_tensor(&mut right, &bc, 2, 3).unwrap();

        let merged = merge_tensors(&[c.clone(), a.clone(), b.clone()]).unwrap();
        for ((l, r), s) in left.iter().zip(right.iter()).zip(merged.iter()) {
            prop_assert!((l - r).abs() < 1e-12);
            prop_assert!((l - s).abs() < 1e-12);
        }
    }

    /// Adding zeros leaves the destination unchanged.
    #[test]
    fn accumulator_zero_identity(
        values in prop::collection::vec(-5.0f64..5.0, 24),
    ) {
        let a = tensor_from(&values, 2, 3, 4);
        let mut out = a.clone();
        add_tensor(&mut out, &ArsTensor::zeros((2, 3, 4)), 2, 3).unwrap();
        prop_assert_eq!(out, a);
    }
}

// ── Detector Binning ─────────────────────────────────────────────────

proptest! {
    /// Bin index always lies in [0, angle_div).
    #[test]
    fn angle_bin_in_range(theta in 0.0f64..=PI, angle_div in 1usize..200) {
        let bin = angle_bin(theta, angle_div);
        prop_assert!(bin < angle_div);
    }

    /// θ = π goes to the last bin.
    #[test]
    fn angle_bin_pi_clamped(angle_div in 1usize..500) {
        prop_assert_eq!(angle_bin(PI, angle_div), angle_div - 1);
    }

    /// Binning is monotone in θ.
    #[test]
    fn angle_bin_monotone(a in 0.0f64..=PI, b in 0.0f64..=PI, angle_div in 1usize..100) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(angle_bin(lo, angle_div) <= angle_bin(hi, angle_div));
    }
}

// ── ARS Post-Processing ──────────────────────────────────────────────

proptest! {
    /// Output bin M-1-i holds (raw[2i-1] + raw[2i]) / divisor[i], bin 0 alone.
    #[test]
    fn fix_ars_reshape_and_reverse(
        half in 1usize..12,
        num_particles in 1u64..100_000,
        seed_values in prop::collection::vec(0.0f64..10.0, 24),
    ) {
        let raw_bins = 2 * half;
        let raw: Vec<f64> = (0..raw_bins)
            .map(|k| seed_values[k % seed_values.len()] + k as f64)
            .collect();
        let mut ars = Array3::from_shape_fn((1, 1, raw_bins), |(_, _, k)| raw[k]);
        fix_ars(&mut ars, num_particles).unwrap();
        prop_assert_eq!(ars.dim(), (1, 1, half));

        let div = bin_divisors(half, num_particles);
        for i in 0..half {
            let merged = if i == 0 { raw[0] } else { raw[2 * i - 1] + raw[2 * i] };
            let expected = merged / div[i];
            let got = ars[[0, 0, half - 1 - i]];
            prop_assert!(((got - expected) / expected.max(1e-300)).abs() < 1e-12);
        }
    }

    /// A second application changes both the extent and the values.
    #[test]
    fn fix_ars_not_idempotent(quarter in 1usize..8, fill in 0.1f64..10.0) {
        let mut ars = ArsTensor::from_elem((2, 2, 4 * quarter), fill);
        fix_ars(&mut ars, 1).unwrap();
        let once = ars.clone();
        fix_ars(&mut ars, 1).unwrap();
        prop_assert_ne!(ars.dim(), once.dim());
        let changed = (0..ars.dim().2).any(|k| {
            let (a, b) = (ars[[1, 1, k]], once[[1, 1, k]]);
            (a - b).abs() > 1e-9 * b.abs()
        });
        prop_assert!(changed, "overlapping bins unchanged after second pass");
    }

    /// Odd extents are rejected.
    #[test]
    fn fix_ars_odd_rejected(half in 0usize..20) {
        let mut ars = ArsTensor::zeros((1, 1, 2 * half + 1));
        prop_assert!(fix_ars(&mut ars, 10).is_err());
    }
}

// ── Search Interval ──────────────────────────────────────────────────

proptest! {
    /// Widths never grow, point counts are preserved, bounds stay admissible.
    #[test]
    fn interval_never_widens(
        mu0 in 5.0f64..80.0,
        eta0 in 0.0f64..0.6,
        shrink in 0.05f64..0.95,
        curv_mu in 0.1f64..10.0,
        curv_eta in 10.0f64..1000.0,
    ) {
        let grid = ParameterGrid::from_ranges(10.0, 50.0, 5, 0.05, 0.45, 5).unwrap();
        let like = Array2::from_shape_fn(grid.shape(), |(i, j)| {
            let dm = grid.mut_values[i] - mu0;
            let de = grid.etaa_values[j] - eta0;
            -curv_mu * dm * dm - curv_eta * de * de
        });
        let cfg = IntervalConfig { shrink_factor: shrink, fit_window: None };
        let up = update_interval(&like, &grid, 0, false, &cfg).unwrap();
        prop_assert_eq!(up.grid.shape(), grid.shape());
        prop_assert!(up.grid.mut_span() <= grid.mut_span() + 1e-9);
        prop_assert!(up.grid.etaa_span() <= grid.etaa_span() + 1e-12);
        prop_assert!(up.grid.mut_values[0] > 0.0);
        prop_assert!(up.grid.etaa_values[0] >= 0.0);
        prop_assert!(up.grid.etaa_values[4] < 1.0);
    }
}
