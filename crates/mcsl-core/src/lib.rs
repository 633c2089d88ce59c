//! Monte Carlo photon transport and inverse search over (μt, η).
//!
//! Transport: layer, weight, particle, physics, transport, detector
//! Search: accumulate, ars, likelihood, interval, inverse

pub mod accumulate;
pub mod ars;
pub mod detector;
pub mod interval;
pub mod inverse;
pub mod io;
pub mod layer;
pub mod likelihood;
pub mod particle;
pub mod physics;
pub mod streams;
pub mod transport;
pub mod weight;
