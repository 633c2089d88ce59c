// ─────────────────────────────────────────────────────────────────────
// MCSL Inverse — ARS Accumulation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use mcsl_types::error::{McslError, McslResult};
use mcsl_types::state::{zero_ars, ArsTensor};
use ndarray::s;

/// `dest[i][j][k] += src[i][j][k]` for `i < dim1`, `j < dim2`, all `k` of `dest`.
pub fn add_tensor(
    dest: &mut ArsTensor,
    src: &ArsTensor,
    dim1: usize,
    dim2: usize,
) -> McslResult<()> {
    let (dm, dn, dk) = dest.dim();
    let (sm, sn, sk) = src.dim();
    if dim1 > dm || dim1 > sm || dim2 > dn || dim2 > sn || sk < dk {
        return Err(McslError::ConfigError(format!(
            "cannot add {sm}x{sn}x{sk} tensor into {dm}x{dn}x{dk} over {dim1}x{dim2}"
        )));
    }
    let mut dest_view = dest.slice_mut(s![..dim1, ..dim2, ..]);
    dest_view += &src.slice(s![..dim1, ..dim2, ..dk]);
    Ok(())
}

/// Sum per-worker tensors in index order.
pub fn merge_tensors(parts: &[ArsTensor]) -> McslResult<ArsTensor> {
    let first = parts.first().ok_or_else(|| {
        McslError::ConfigError("no worker tensors to merge".to_string())
    })?;
    let (m, n, k) = first.dim();
    let mut total = zero_ars(m, n, k);
    for part in parts {
        if part.dim() != (m, n, k) {
            return Err(McslError::ConfigError(format!(
                "worker tensor shape {:?} differs from {:?}",
                part.dim(),
                (m, n, k)
            )));
        }
        add_tensor(&mut total, part, m, n)?;
    }
    Ok(total)
}
