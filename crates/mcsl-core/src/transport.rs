// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Photon Transport
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Packet state machine through a single slab `0 <= z <= z_max`.
//!
//! A packet starts in `Propagate` at the origin heading +z and ends in
//! `Done`, either after being scored by the detector or, when roulette is
//! enabled, after losing the roulette draw.

use crate::detector::detect;
use crate::layer::Layer;
use crate::particle::Particle;
use crate::physics::PhotonPhysics;
use mcsl_math::geometry::normalize;
use mcsl_math::optics::refract_z;
use mcsl_types::config::SimulationConfig;
use mcsl_types::error::McslResult;
use mcsl_types::state::ArsTensor;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Scatter,
    Propagate,
    Boundary,
    Detect,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Escaped and scored into this angle bin.
    Detected { bin: usize },
    /// Terminated by roulette before escaping.
    Absorbed,
}

/// Russian roulette on the running scalar weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roulette {
    pub threshold: f64,
    pub chance: f64,
}

impl Roulette {
    pub fn disabled() -> Self {
        Roulette {
            threshold: 0.0,
            chance: 10.0,
        }
    }

    pub fn from_config(sim: &SimulationConfig) -> Self {
        Roulette {
            threshold: sim.roulette_threshold,
            chance: sim.roulette_chance,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold > 0.0
    }
}

/// Read-only transport context shared by every packet of a worker.
#[derive(Debug, Clone, Copy)]
pub struct Transport<'a, P: PhotonPhysics> {
    physics: &'a P,
    medium: Layer,
    outside: Layer,
    radius: f64,
    angle_div: usize,
    roulette: Roulette,
}

impl<'a, P: PhotonPhysics> Transport<'a, P> {
    pub fn new(physics: &'a P, medium: Layer, radius: f64, angle_div: usize) -> Self {
        Transport {
            physics,
            medium,
            outside: Layer::air(),
            radius,
            angle_div,
            roulette: Roulette::disabled(),
        }
    }

    pub fn with_roulette(mut self, roulette: Roulette) -> Self {
        self.roulette = roulette;
        self
    }

    pub fn medium(&self) -> &Layer {
        &self.medium
    }

    /// Specular transmission at entry, the packet's starting weight.
    pub fn entry_weight(&self) -> f64 {
        self.medium.specular_transmission(&self.outside)
    }

    /// Deflect, apply the interaction weight factors and maybe play roulette.
    pub fn scatter<R: Rng + ?Sized>(&self, particle: &mut Particle, rng: &mut R) -> TransportState {
        particle.direction = self
            .physics
            .phase_sample(particle.direction, particle.layer.g, rng);
        particle.update_weight_scatter();

        if self.roulette.is_enabled() && particle.weight.w_scale < self.roulette.threshold {
            if rng.gen::<f64>() * self.roulette.chance < 1.0 {
                particle.weight.w_scale *= self.roulette.chance;
            } else {
                return TransportState::Done;
            }
        }
        TransportState::Propagate
    }

    /// Free flight: either to the next interaction or onto a surface.
    pub fn propagate<R: Rng + ?Sized>(
        &self,
        particle: &mut Particle,
        rng: &mut R,
    ) -> TransportState {
        let step = self.physics.step_length(particle.layer.mu_t(), rng);
        let z = particle.position[2];
        let uz = particle.direction[2];
        let z_max = particle.layer.z_max;

        let (to_surface, surface_z) = if uz > 0.0 {
            ((z_max - z) / uz, z_max)
        } else if uz < 0.0 {
            (z / -uz, 0.0)
        } else {
            (f64::INFINITY, z)
        };

        if step >= to_surface {
            let distance = to_surface.max(0.0);
            particle.advance(distance);
            particle.position[2] = surface_z;
            TransportState::Boundary
        } else {
            particle.advance(step);
            TransportState::Scatter
        }
    }

    /// Fresnel test at the surface: reflect back inside or leave into air.
    pub fn boundary<R: Rng + ?Sized>(
        &self,
        particle: &mut Particle,
        rng: &mut R,
    ) -> TransportState {
        let n_in = particle.layer.n;
        let n_out = self.outside.n;
        let response = self
            .physics
            .fresnel(n_in, n_out, particle.direction[2].abs());

        if rng.gen::<f64>() < response.reflectance {
            particle.direction[2] = -particle.direction[2];
            TransportState::Propagate
        } else {
            particle.direction = normalize(refract_z(
                particle.direction,
                n_in,
                n_out,
                response.cos_transmitted,
            ));
            particle.layer = self.outside;
            TransportState::Detect
        }
    }

    /// Run one packet from launch to `Done`; the particle must already be reset.
    pub fn run_packet<R: Rng + ?Sized>(
        &self,
        particle: &mut Particle,
        rng: &mut R,
        ars: &mut ArsTensor,
    ) -> McslResult<PacketOutcome> {
        let mut state = TransportState::Propagate;
        let mut detected = None;
        loop {
            state = match state {
                TransportState::Scatter => self.scatter(particle, rng),
                TransportState::Propagate => self.propagate(particle, rng),
                TransportState::Boundary => self.boundary(particle, rng),
                TransportState::Detect => {
                    detected = Some(detect(particle, self.radius, self.angle_div, ars)?);
                    TransportState::Done
                }
                TransportState::Done => break,
            };
        }
        Ok(match detected {
            Some(bin) => PacketOutcome::Detected { bin },
            None => PacketOutcome::Absorbed,
        })
    }

    /// Reset `particle` and run `count` packets into `ars`.
    pub fn run_packets<R: Rng + ?Sized>(
        &self,
        particle: &mut Particle,
        rng: &mut R,
        ars: &mut ArsTensor,
        count: u64,
    ) -> McslResult<u64> {
        let t = self.entry_weight();
        let mut detected = 0;
        for _ in 0..count {
            particle.reset(t, &self.medium);
            if let PacketOutcome::Detected { .. } = self.run_packet(particle, rng, ars)? {
                detected += 1;
            }
        }
        Ok(detected)
    }
}
