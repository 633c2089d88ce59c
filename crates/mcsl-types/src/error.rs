// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Errors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum McslError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(
        "RNG stream provisioning failed: {spawned} actual out of {requested} wanted streams spawned"
    )]
    StreamProvision { requested: usize, spawned: usize },

    #[error("Scoring error: {0}")]
    Scoring(String),

    #[error("Search interval degenerate at iteration {iteration}: {message}")]
    Degenerate { iteration: usize, message: String },

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type McslResult<T> = Result<T, McslError>;
