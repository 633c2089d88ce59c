// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — Data I/O
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Experimental ARS input and estimate output.

use mcsl_types::error::{McslError, McslResult};
use mcsl_types::state::ParameterEstimate;
use std::fmt::Write as _;
use std::path::Path;

/// Parse whitespace-separated reals; `#` starts a comment.
pub fn parse_experimental(text: &str) -> McslResult<Vec<f64>> {
    let mut values = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or("");
        for token in content.split_whitespace() {
            let v: f64 = token.parse().map_err(|_| McslError::Parse {
                line: idx + 1,
                message: format!("'{token}' is not a number"),
            })?;
            if !v.is_finite() {
                return Err(McslError::Parse {
                    line: idx + 1,
                    message: format!("'{token}' is not finite"),
                });
            }
            values.push(v);
        }
    }
    if values.is_empty() {
        return Err(McslError::ConfigError(
            "experimental data contains no values".to_string(),
        ));
    }
    Ok(values)
}

pub fn read_experimental<P: AsRef<Path>>(path: P) -> McslResult<Vec<f64>> {
    let text = std::fs::read_to_string(path)?;
    parse_experimental(&text)
}

/// Human-readable report; the last five lines are the raw output vector.
pub fn format_estimate(estimate: &ParameterEstimate, elapsed_s: u64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Seconds elapsed: {elapsed_s} s");
    let _ = writeln!(out, "mu_s = {}", estimate.mu_s());
    let _ = writeln!(out, "mu_a = {}", estimate.mu_a());
    let _ = writeln!(out);
    let _ = writeln!(out, "Parameters for Mathematica: ");
    let values = estimate.to_output_vec();
    let lines: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    out.push_str(&lines.join("\n"));
    out
}

/// Write the report, creating parent directories as needed.
pub fn write_estimate<P: AsRef<Path>>(
    path: P,
    estimate: &ParameterEstimate,
    elapsed_s: u64,
) -> McslResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, format_estimate(estimate, elapsed_s))?;
    Ok(())
}
