// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Layer
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Slab layer optical parameters.

use mcsl_math::optics::specular_reflectance;
use mcsl_types::config::MediumConfig;
use mcsl_types::constants::AIR_REFRACTIVE_INDEX;
use mcsl_types::error::{McslError, McslResult};

/// One homogeneous medium segment, or the exterior air.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    /// Refractive index.
    pub n: f64,
    /// Henyey-Greenstein anisotropy.
    pub g: f64,
    /// Thickness; the layer occupies 0 <= z <= z_max.
    pub z_max: f64,
    /// Absorption coefficient.
    pub mua: f64,
    /// Scattering coefficient.
    pub mus: f64,
    /// Position in the stack; `None` for the exterior air layer.
    pub index: Option<usize>,
}

impl Layer {
    /// Medium layer with placeholder coefficients μa = μs = 1.
    pub fn new(n: f64, g: f64, z_max: f64, index: usize) -> Self {
        Layer {
            n,
            g,
            z_max,
            mua: 1.0,
            mus: 1.0,
            index: Some(index),
        }
    }

    pub fn from_config(medium: &MediumConfig) -> Self {
        Self::new(medium.n, medium.g, medium.z_max, 0)
    }

    /// Exterior boundary layer.
    pub fn air() -> Self {
        Layer {
            n: AIR_REFRACTIVE_INDEX,
            g: 0.0,
            z_max: 0.0,
            mua: 0.0,
            mus: 0.0,
            index: None,
        }
    }

    pub fn is_air(&self) -> bool {
        self.index.is_none()
    }

    /// Total attenuation μt = μa + μs.
    pub fn mu_t(&self) -> f64 {
        self.mua + self.mus
    }

    /// Albedo ratio η = μa / μt.
    pub fn etaa(&self) -> f64 {
        let mu_t = self.mu_t();
        if mu_t > 0.0 {
            self.mua / mu_t
        } else {
            0.0
        }
    }

    /// Scattering albedo μs / μt, the weight kept at each interaction.
    pub fn mus_div_mut(&self) -> f64 {
        let mu_t = self.mu_t();
        if mu_t > 0.0 {
            self.mus / mu_t
        } else {
            0.0
        }
    }

    /// Set the sampling reference from (μt, η): μa = μt η, μs = μt - μa.
    pub fn set_reference(&mut self, mu_t: f64, etaa: f64) -> McslResult<()> {
        if !mu_t.is_finite() || mu_t <= 0.0 {
            return Err(McslError::PhysicsViolation(format!(
                "reference mu_t must be finite and > 0, got {mu_t}"
            )));
        }
        if !etaa.is_finite() || !(0.0..1.0).contains(&etaa) {
            return Err(McslError::PhysicsViolation(format!(
                "reference etaa must be finite and in [0, 1), got {etaa}"
            )));
        }
        self.mua = mu_t * etaa;
        self.mus = mu_t - self.mua;
        Ok(())
    }

    /// Fraction of the normally incident beam entering from `outside`.
    pub fn specular_transmission(&self, outside: &Layer) -> f64 {
        1.0 - specular_reflectance(outside.n, self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_partition() {
        let mut layer = Layer::new(1.4, 0.9, 0.2, 0);
        layer.set_reference(50.0, 0.1).unwrap();
        assert!((layer.mua - 5.0).abs() < 1e-12);
        assert!((layer.mus - 45.0).abs() < 1e-12);
        assert!((layer.mu_t() - 50.0).abs() < 1e-12);
        assert!((layer.etaa() - 0.1).abs() < 1e-12);
        assert!((layer.mus_div_mut() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_reference_rejects_invalid_values() {
        let mut layer = Layer::new(1.4, 0.9, 0.2, 0);
        for (mu_t, etaa) in [(0.0, 0.1), (f64::NAN, 0.1), (10.0, 1.0), (10.0, -0.1)] {
            match layer.set_reference(mu_t, etaa) {
                Err(McslError::PhysicsViolation(_)) => {}
                other => panic!("Unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn test_air_layer() {
        let air = Layer::air();
        assert!(air.is_air());
        assert_eq!(air.n, 1.0);
        assert!(!Layer::new(1.5, 0.0, 1.0, 0).is_air());
    }

    #[test]
    fn test_specular_transmission_glass() {
        let layer = Layer::new(1.5, 0.0, 1.0, 0);
        let t = layer.specular_transmission(&Layer::air());
        assert!((t - 0.96).abs() < 1e-12);
    }
}
