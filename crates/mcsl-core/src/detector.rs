// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Detector
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Angular detector: exit angle on a sphere around the entry point.

use crate::particle::Particle;
use mcsl_math::geometry::sphere_exit_polar_angle;
use mcsl_types::error::{McslError, McslResult};
use mcsl_types::state::ArsTensor;
use ndarray::Axis;
use std::f64::consts::PI;

/// Histogram bin of polar angle `theta` on `angle_div` equal bins over [0, π].
///
/// θ = π lands in the last bin; NaN or negative angles land in bin 0.
pub fn angle_bin(theta: f64, angle_div: usize) -> usize {
    if angle_div == 0 || theta.is_nan() || theta <= 0.0 {
        return 0;
    }
    let ind = (angle_div as f64 * theta / PI).floor() as usize;
    ind.min(angle_div - 1)
}

/// Score an escaped packet into `ars`; returns the bin used.
pub fn detect(
    particle: &Particle,
    radius: f64,
    angle_div: usize,
    ars: &mut ArsTensor,
) -> McslResult<usize> {
    let (m, n, bins) = ars.dim();
    if angle_div == 0 || bins != angle_div {
        return Err(McslError::ConfigError(format!(
            "detector has {angle_div} angle bins but accumulator has {bins}"
        )));
    }
    let weight = &particle.weight;
    if weight.mut_vec.len() != m || weight.etaa_vec.len() != n {
        return Err(McslError::ConfigError(format!(
            "weight grid {}x{} does not match accumulator {m}x{n}",
            weight.mut_vec.len(),
            weight.etaa_vec.len()
        )));
    }

    let theta = sphere_exit_polar_angle(particle.position, particle.direction, radius);
    let ind = angle_bin(theta, angle_div);

    let mut slab = ars.index_axis_mut(Axis(2), ind);
    slab += &weight.matrix();
    Ok(ind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;
    use mcsl_types::state::{zero_ars, ParameterGrid};

    fn escaped(direction: [f64; 3]) -> Particle {
        let grid = ParameterGrid::new(vec![1.0, 2.0], vec![0.0, 0.5]).unwrap();
        let mut layer = Layer::new(1.0, 0.0, 1.0, 0);
        layer.set_reference(2.0, 0.5).unwrap();
        let mut p = Particle::new(1.0, &grid, layer);
        p.direction = direction;
        p
    }

    #[test]
    fn test_angle_bin_clamps_pi() {
        assert_eq!(angle_bin(PI, 4), 3);
        assert_eq!(angle_bin(PI, 1), 0);
        assert_eq!(angle_bin(0.0, 4), 0);
        assert_eq!(angle_bin(PI / 2.0, 4), 2);
    }

    #[test]
    fn test_angle_bin_bad_input_goes_to_zero() {
        assert_eq!(angle_bin(f64::NAN, 8), 0);
        assert_eq!(angle_bin(-0.1, 8), 0);
        assert_eq!(angle_bin(1.0, 0), 0);
    }

    #[test]
    fn test_detect_adds_weight_matrix() {
        let p = escaped([0.0, 0.0, 1.0]);
        let mut ars = zero_ars(2, 2, 6);
        let bin = detect(&p, 10.0, 6, &mut ars).expect("detect");
        assert_eq!(bin, 0);
        let expected = p.weight.matrix();
        for i in 0..2 {
            for j in 0..2 {
                assert_eq!(ars[[i, j, 0]], expected[[i, j]]);
                for k in 1..6 {
                    assert_eq!(ars[[i, j, k]], 0.0);
                }
            }
        }
    }

    #[test]
    fn test_detect_backscatter_lands_in_last_bin() {
        let p = escaped([0.0, 0.0, -1.0]);
        let mut ars = zero_ars(2, 2, 4);
        assert_eq!(detect(&p, 10.0, 4, &mut ars).unwrap(), 3);
    }

    #[test]
    fn test_detect_rejects_bin_mismatch() {
        let p = escaped([0.0, 0.0, 1.0]);
        let mut ars = zero_ars(2, 2, 4);
        match detect(&p, 10.0, 8, &mut ars) {
            Err(McslError::ConfigError(msg)) => assert!(msg.contains("angle bins")),
            other => panic!("Unexpected result: {other:?}"),
        }
    }
}
