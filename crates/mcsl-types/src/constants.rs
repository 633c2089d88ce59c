// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Refractive index of the exterior (air) layer.
pub const AIR_REFRACTIVE_INDEX: f64 = 1.0;

/// Lower bound kept on every μt grid value [1/length].
pub const MIN_MUT: f64 = 1e-6;

/// Upper bound kept on every η grid value. η = 1 means a purely absorbing
/// medium, for which the importance ratio (1 - η) / (1 - η₀) vanishes.
pub const MAX_ETAA: f64 = 0.999;

/// Direction cosines closer to ±1 than this are treated as axis-aligned.
pub const COS_AXIS_TOLERANCE: f64 = 1e-12;

/// Anisotropy below this magnitude samples the isotropic phase function.
pub const ISOTROPIC_G_TOLERANCE: f64 = 1e-6;

/// Sanity limit on worker count; larger values indicate a broken input.
pub const MAX_NUM_PROC: usize = 5000;

/// Minimum likelihood range before a grid is considered flat.
pub const MIN_LIKELIHOOD_RANGE: f64 = 1e-12;

/// Grid points per axis needed by the quadratic likelihood fit.
pub const MIN_FIT_POINTS_PER_AXIS: usize = 3;
