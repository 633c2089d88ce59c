//! Mathematical primitives for MCSL.

pub mod geometry;
pub mod linalg;
pub mod optics;
