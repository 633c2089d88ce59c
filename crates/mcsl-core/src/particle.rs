// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Photon Packet
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Photon packet state carried through the transport state machine.

use crate::layer::Layer;
use crate::weight::Weight;
use mcsl_types::state::ParameterGrid;

/// Entry point of every packet.
pub const LAUNCH_POSITION: [f64; 3] = [0.0, 0.0, 0.0];
/// Launch direction, straight down into the slab (+z).
pub const LAUNCH_DIRECTION: [f64; 3] = [0.0, 0.0, 1.0];

/// One weighted photon packet. Owned by a single worker and reused
/// across that worker's packets.
#[derive(Debug, Clone)]
pub struct Particle {
    pub position: [f64; 3],
    pub direction: [f64; 3],
    pub weight: Weight,
    pub layer: Layer,
}

impl Particle {
    /// Packet at the launch point inside `layer`, weighted for every cell of `grid`.
    pub fn new(t: f64, grid: &ParameterGrid, layer: Layer) -> Self {
        Particle {
            position: LAUNCH_POSITION,
            direction: LAUNCH_DIRECTION,
            weight: Weight::new(grid, &layer, t),
            layer,
        }
    }

    /// Back to the launch point with running weight `t`, inside `layer`.
    pub fn reset(&mut self, t: f64, layer: &Layer) {
        self.position = LAUNCH_POSITION;
        self.direction = LAUNCH_DIRECTION;
        self.weight.reset(t);
        self.layer = *layer;
    }

    pub fn update_position(&mut self, distance: f64) {
        for (r, u) in self.position.iter_mut().zip(self.direction.iter()) {
            *r += distance * u;
        }
    }

    /// Apply the path survival factor and move by `distance`.
    pub fn advance(&mut self, distance: f64) {
        self.update_position(distance);
        self.weight.attenuate(distance);
    }

    /// Weight update for one interaction in the current layer.
    pub fn update_weight_scatter(&mut self) {
        let albedo = self.layer.mus_div_mut();
        self.weight.interact(albedo);
    }
}
