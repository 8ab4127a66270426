//! Normalization of raw adjacency and feature matrices into [`SparseTensor`]s.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Error, Result};
use crate::sparse::{CooMatrix, SparseTensor};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum NormScheme {
    /// `D^-1 A`: every row with non-zero degree sums to one.
    #[default]
    Row,
    /// `D^-1/2 A D^-1/2`, the operator of Kipf & Welling's GCN. Row sums are
    /// not bounded by one here (the center of a star exceeds it).
    Symmetric,
}
impl fmt::Display for NormScheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Row => write!(f, "row"),
            Self::Symmetric => write!(f, "symmetric"),
        }
    }
}
impl FromStr for NormScheme {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "row" => Ok(Self::Row),
            "symmetric" | "sym" => Ok(Self::Symmetric),
            other => Err(format!("unknown normalization '{other}' (expected row or symmetric)")),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AdjacencyNorm {
    pub scheme: NormScheme,
    /// Add `I` before normalizing.
    pub self_loops: bool,
}
impl Default for AdjacencyNorm {
    fn default() -> Self {
        Self {
            scheme: NormScheme::default(),
            self_loops: true,
        }
    }
}

/// Inverts one entry of a row-sum vector: `x(sum)` is `sum` for the row scheme
/// and its square root for the symmetric one. Only an exact zero maps to zero.
fn inverse_sums<F: Fn(f64) -> f64>(sums: &[f64], x: F, what: &str) -> Result<Vec<f64>> {
    sums.iter()
        .enumerate()
        .map(|(row, &sum)| {
            let d = x(sum);
            if !d.is_finite() {
                return Err(Error::NumericFailure(format!(
                    "{what} row {row} has sum {sum}"
                )));
            }
            Ok(if d == 0.0 { 0.0 } else { d.recip() })
        })
        .collect()
}

pub fn normalize_adjacency(
    raw: &CooMatrix,
    num_nodes: usize,
    norm: &AdjacencyNorm,
) -> Result<SparseTensor> {
    if raw.shape() != (num_nodes, num_nodes) {
        return Err(Error::shape_mismatch(
            "adjacency matrix",
            (num_nodes, num_nodes),
            raw.shape(),
        ));
    }
    let adj = if norm.self_loops {
        let mut with_loops = raw.clone();
        for i in 0..num_nodes {
            with_loops.push(i, i, 1.0)?;
        }
        with_loops.to_sparse()?
    } else {
        raw.to_sparse()?
    };

    let degree = adj.row_sums();
    let normalized = match norm.scheme {
        NormScheme::Row => {
            let d_inv = inverse_sums(&degree, |d| d, "adjacency")?;
            adj.scale_by(|r, _| d_inv[r])
        }
        NormScheme::Symmetric => {
            let d_inv_sqrt = inverse_sums(&degree, f64::sqrt, "adjacency")?;
            adj.scale_by(|r, c| d_inv_sqrt[r] * d_inv_sqrt[c])
        }
    };
    normalized.ensure_finite("normalized adjacency")?;
    Ok(normalized)
}

/// Normalizes each support independently, keeping their order.
pub fn normalize_supports(
    raws: &[CooMatrix],
    num_nodes: usize,
    norm: &AdjacencyNorm,
) -> Result<Vec<SparseTensor>> {
    raws.iter()
        .enumerate()
        .map(|(i, raw)| {
            let support = normalize_adjacency(raw, num_nodes, norm)?;
            debug!(support = i, nnz = support.nnz(), scheme = %norm.scheme, "normalized support");
            Ok(support)
        })
        .collect()
}

/// Row-normalizes node features; all-zero rows stay zero.
pub fn normalize_features(raw: &CooMatrix, num_nodes: usize) -> Result<SparseTensor> {
    if raw.shape().0 != num_nodes {
        return Err(Error::shape_mismatch(
            "feature matrix rows",
            num_nodes,
            raw.shape().0,
        ));
    }
    let features = raw.to_sparse()?;
    let r_inv = inverse_sums(&features.row_sums(), |s| s, "feature")?;
    let normalized = features.scale_by(|r, _| r_inv[r]);
    normalized.ensure_finite("normalized features")?;
    Ok(normalized)
}
