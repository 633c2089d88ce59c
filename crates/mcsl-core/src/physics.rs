// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Photon Physics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Sampling rules used by the transport state machine.
//!
//! `McmlPhysics` implements the standard MCML equations: exponential free
//! paths, Henyey-Greenstein deflection with the direction-cosine rotation,
//! and unpolarized Fresnel reflectance.

use mcsl_math::geometry::normalize;
use mcsl_math::optics::{fresnel, InterfaceResponse};
use mcsl_types::constants::{COS_AXIS_TOLERANCE, ISOTROPIC_G_TOLERANCE};
use rand::Rng;
use rand_distr::Exp1;
use std::f64::consts::PI;

/// Physics policy of the transport loop.
pub trait PhotonPhysics: Sync {
    /// Free path length for total attenuation `mu_t`.
    fn step_length<R: Rng + ?Sized>(&self, mu_t: f64, rng: &mut R) -> f64;

    /// New unit direction after a scattering event with anisotropy `g`.
    fn phase_sample<R: Rng + ?Sized>(
        &self,
        direction: [f64; 3],
        g: f64,
        rng: &mut R,
    ) -> [f64; 3];

    /// Reflectance and transmitted cosine going from `n1` into `n2`.
    fn fresnel(&self, n1: f64, n2: f64, cos_incident: f64) -> InterfaceResponse;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct McmlPhysics;

/// Henyey-Greenstein deflection cosine for a uniform variate `xi` in [0, 1).
pub fn hg_cos_theta(g: f64, xi: f64) -> f64 {
    if g.abs() < ISOTROPIC_G_TOLERANCE {
        return 2.0 * xi - 1.0;
    }
    let temp = (1.0 - g * g) / (1.0 - g + 2.0 * g * xi);
    ((1.0 + g * g - temp * temp) / (2.0 * g)).clamp(-1.0, 1.0)
}

/// Rotate `direction` by polar deflection `cos_theta` and azimuth `phi`.
pub fn rotate_direction(direction: [f64; 3], cos_theta: f64, phi: f64) -> [f64; 3] {
    let [ux, uy, uz] = direction;
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let (sin_phi, cos_phi) = phi.sin_cos();

    let rotated = if uz.abs() > 1.0 - COS_AXIS_TOLERANCE {
        [
            sin_theta * cos_phi,
            sin_theta * sin_phi,
            cos_theta * uz.signum(),
        ]
    } else {
        let temp = (1.0 - uz * uz).max(0.0).sqrt();
        [
            sin_theta * (ux * uz * cos_phi - uy * sin_phi) / temp + ux * cos_theta,
            sin_theta * (uy * uz * cos_phi + ux * sin_phi) / temp + uy * cos_theta,
            -sin_theta * cos_phi * temp + uz * cos_theta,
        ]
    };
    normalize(rotated)
}

impl PhotonPhysics for McmlPhysics {
    fn step_length<R: Rng + ?Sized>(&self, mu_t: f64, rng: &mut R) -> f64 {
        let e: f64 = rng.sample(Exp1);
        e / mu_t
    }

    fn phase_sample<R: Rng + ?Sized>(
        &self,
        direction: [f64; 3],
        g: f64,
        rng: &mut R,
    ) -> [f64; 3] {
        let cos_theta = hg_cos_theta(g, rng.gen::<f64>());
        let phi = 2.0 * PI * rng.gen::<f64>();
        rotate_direction(direction, cos_theta, phi)
    }

    fn fresnel(&self, n1: f64, n2: f64, cos_incident: f64) -> InterfaceResponse {
        fresnel(n1, n2, cos_incident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcsl_math::geometry::{dot, norm};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_hg_isotropic_limit() {
        assert_eq!(hg_cos_theta(0.0, 0.0), -1.0);
        assert_eq!(hg_cos_theta(0.0, 0.5), 0.0);
        assert!((hg_cos_theta(1e-9, 0.75) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_hg_endpoints() {
        let g = 0.8;
        assert!((hg_cos_theta(g, 0.0) + 1.0).abs() < 1e-12);
        assert!((hg_cos_theta(g, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_hg_mean_cosine_is_g() {
        let mut rng = StdRng::seed_from_u64(11);
        let g = 0.7;
        let n = 200_000;
        let mean: f64 = (0..n).map(|_| hg_cos_theta(g, rng.gen())).sum::<f64>() / n as f64;
        assert!((mean - g).abs() < 5e-3, "mean cos = {mean}");
    }

    #[test]
    fn test_rotation_keeps_deflection_angle() {
        let dir = normalize([0.3, -0.4, 0.5]);
        for &(ct, phi) in &[(0.9, 0.3), (-0.2, 2.0), (0.0, 5.5)] {
            let out = rotate_direction(dir, ct, phi);
            assert!((norm(out) - 1.0).abs() < 1e-12);
            assert!((dot(dir, out) - ct).abs() < 1e-12, "cos = {}", dot(dir, out));
        }
    }

    #[test]
    fn test_rotation_axis_aligned_case() {
        let out = rotate_direction([0.0, 0.0, -1.0], 0.5, 0.0);
        assert!((out[2] + 0.5).abs() < 1e-12);
        assert!((out[0] - 0.75f64.sqrt()).abs() < 1e-12);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_step_length_mean() {
        let mut rng = StdRng::seed_from_u64(5);
        let physics = McmlPhysics;
        let mu_t = 4.0;
        let n = 100_000;
        let mean: f64 =
            (0..n).map(|_| physics.step_length(mu_t, &mut rng)).sum::<f64>() / n as f64;
        assert!((mean - 0.25).abs() < 5e-3, "mean step = {mean}");
    }

    #[test]
    fn test_phase_sample_unit_vector() {
        let mut rng = StdRng::seed_from_u64(3);
        let physics = McmlPhysics;
        let mut dir = [0.0, 0.0, 1.0];
        for _ in 0..1000 {
            dir = physics.phase_sample(dir, 0.9, &mut rng);
            assert!((norm(dir) - 1.0).abs() < 1e-10);
        }
    }
}
