//! Small 3-vector helpers and the detector-sphere intersection.

use std::f64::consts::PI;

pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Rescale to unit length; zero vectors are returned unchanged.
pub fn normalize(a: [f64; 3]) -> [f64; 3] {
    let len = norm(a);
    if len <= 0.0 || !len.is_finite() {
        return a;
    }
    [a[0] / len, a[1] / len, a[2] / len]
}

/// Polar angle θ ∈ [0, π], measured from +z, at which the ray
/// `origin + t·direction` (t ≥ 0) leaves a sphere of `radius` centred on
/// the coordinate origin.
///
/// When the ray misses the sphere (origin outside it and pointing away),
/// the polar angle of `direction` itself is returned, i.e. the far-field
/// limit of a very large detector.
pub fn sphere_exit_polar_angle(origin: [f64; 3], direction: [f64; 3], radius: f64) -> f64 {
    let b = dot(origin, direction);
    let c = dot(origin, origin) - radius * radius;
    let disc = b * b - c;

    let cos_theta = if disc >= 0.0 {
        let t = -b + disc.sqrt();
        if t >= 0.0 {
            let hit = [
                origin[0] + t * direction[0],
                origin[1] + t * direction[1],
                origin[2] + t * direction[2],
            ];
            let r = norm(hit);
            if r > 0.0 {
                hit[2] / r
            } else {
                direction[2]
            }
        } else {
            direction[2]
        }
    } else {
        direction[2]
    };

    let theta = cos_theta.clamp(-1.0, 1.0).acos();
    theta.clamp(0.0, PI)
}
