// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Random Streams
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Independent uniform-variate streams, one per worker.
//!
//! Two backends: `StdRng` seeded through SplitMix64, and `ChaCha8Rng` with
//! a distinct stream id per worker. The transport code only sees `Rng`.

use mcsl_types::config::RngBackend;
use mcsl_types::error::{McslError, McslResult};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of independent per-worker random streams.
pub trait StreamProvider {
    type Stream: RngCore + Send;

    /// Spawn exactly `count` independent streams.
    fn spawn(&self, count: usize) -> McslResult<Vec<Self::Stream>>;
}

fn check_spawned<S>(requested: usize, streams: Vec<S>) -> McslResult<Vec<S>> {
    if requested == 0 || streams.len() != requested {
        return Err(McslError::StreamProvision {
            requested,
            spawned: streams.len(),
        });
    }
    Ok(streams)
}

/// SplitMix64 finalizer, used to decorrelate per-stream seeds.
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[derive(Debug, Clone, Copy)]
pub struct SeededStdStreams {
    pub seed: u64,
}

impl StreamProvider for SeededStdStreams {
    type Stream = StdRng;

    fn spawn(&self, count: usize) -> McslResult<Vec<StdRng>> {
        let mut state = self.seed;
        let streams = (0..count)
            .map(|_| {
                state = splitmix64(state);
                StdRng::seed_from_u64(state)
            })
            .collect();
        check_spawned(count, streams)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChaChaStreams {
    pub seed: u64,
}

impl StreamProvider for ChaChaStreams {
    type Stream = ChaCha8Rng;

    fn spawn(&self, count: usize) -> McslResult<Vec<ChaCha8Rng>> {
        let streams = (0..count)
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
                rng.set_stream(i as u64);
                rng
            })
            .collect();
        check_spawned(count, streams)
    }
}

/// Human-readable backend name for logs.
pub fn backend_name(backend: RngBackend) -> &'static str {
    match backend {
        RngBackend::Std => "std",
        RngBackend::Chacha => "chacha8",
    }
}
