//! Interface optics: Fresnel reflectance and Snell refraction.
//!
//! Unpolarized Fresnel formulas in the form used by MCML (Wang, Jacques
//! & Zheng 1995), expressed with direction cosines only.

const COS_NORMAL: f64 = 1.0 - 1e-12;
const COS_GRAZING: f64 = 1e-6;

/// Reflectance and transmitted direction cosine at a planar interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfaceResponse {
    /// Probability of reflection in [0, 1].
    pub reflectance: f64,
    /// |cos| of the refracted ray relative to the interface normal.
    pub cos_transmitted: f64,
}

/// Specular reflectance at normal incidence, ((n1 - n2) / (n1 + n2))².
pub fn specular_reflectance(n1: f64, n2: f64) -> f64 {
    let r = (n1 - n2) / (n1 + n2);
    r * r
}

/// Fresnel reflectance for a ray going from index `n1` into `n2`.
///
/// `cos_incident` is |cos| of the angle to the interface normal. Total
/// internal reflection returns reflectance 1 and transmitted cosine 0.
pub fn fresnel(n1: f64, n2: f64, cos_incident: f64) -> InterfaceResponse {
    let ca1 = cos_incident.abs().min(1.0);
    if n1 == n2 {
        return InterfaceResponse {
            reflectance: 0.0,
            cos_transmitted: ca1,
        };
    }
    if ca1 > COS_NORMAL {
        return InterfaceResponse {
            reflectance: specular_reflectance(n1, n2),
            cos_transmitted: ca1,
        };
    }
    if ca1 < COS_GRAZING {
        return InterfaceResponse {
            reflectance: 1.0,
            cos_transmitted: 0.0,
        };
    }

    let sa1 = (1.0 - ca1 * ca1).max(0.0).sqrt();
    let sa2 = n1 * sa1 / n2;
    if sa2 >= 1.0 {
        return InterfaceResponse {
            reflectance: 1.0,
            cos_transmitted: 0.0,
        };
    }
    let ca2 = (1.0 - sa2 * sa2).max(0.0).sqrt();

    // cos/sin of the sum and difference of the two angles
    let cap = ca1 * ca2 - sa1 * sa2;
    let cam = ca1 * ca2 + sa1 * sa2;
    let sap = sa1 * ca2 + ca1 * sa2;
    let sam = sa1 * ca2 - ca1 * sa2;
    let reflectance = 0.5 * sam * sam * (cam * cam + cap * cap) / (sap * sap * cam * cam);

    InterfaceResponse {
        reflectance: reflectance.clamp(0.0, 1.0),
        cos_transmitted: ca2,
    }
}

/// Refract a unit direction through a plane with normal along z.
///
/// Tangential components scale by `n1 / n2`; the z component keeps its sign
/// with magnitude `cos_transmitted`.
pub fn refract_z(direction: [f64; 3], n1: f64, n2: f64, cos_transmitted: f64) -> [f64; 3] {
    let ratio = n1 / n2;
    let uz = if direction[2] < 0.0 {
        -cos_transmitted
    } else {
        cos_transmitted
    };
    [direction[0] * ratio, direction[1] * ratio, uz]
}
