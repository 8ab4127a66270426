use candle_core::{Device, Tensor};
use itertools::Itertools;

use crate::error::{Error, Result};
use crate::nn::utils::weighted_sum_agg;

/// Raw matrix in coordinate form. Entries may be unordered and duplicated;
/// duplicates add up, like scipy's COO matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct CooMatrix {
    shape: (usize, usize),
    triplets: Vec<(usize, usize, f32)>,
}
impl CooMatrix {
    pub fn new(shape: (usize, usize)) -> Self {
        Self {
            shape,
            triplets: Vec::new(),
        }
    }
    pub fn from_triplets<I>(shape: (usize, usize), triplets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f32)>,
    {
        let mut matrix = Self::new(shape);
        for (row, col, value) in triplets {
            matrix.push(row, col, value)?;
        }
        Ok(matrix)
    }
    /// Builds from a row-major dense buffer, skipping zeros.
    pub fn from_dense(data: &[f32], shape: (usize, usize)) -> Result<Self> {
        if data.len() != shape.0 * shape.1 {
            return Err(Error::shape_mismatch(
                "dense buffer length",
                shape.0 * shape.1,
                data.len(),
            ));
        }
        let triplets = data
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0.0)
            .map(|(i, &v)| (i / shape.1, i % shape.1, v))
            .collect();
        Ok(Self { shape, triplets })
    }
    pub fn identity(n: usize) -> Self {
        Self {
            shape: (n, n),
            triplets: (0..n).map(|i| (i, i, 1.0)).collect(),
        }
    }
    pub fn push(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        if row >= self.shape.0 || col >= self.shape.1 {
            return Err(Error::shape_mismatch(
                "matrix entry",
                format!("coordinate within {:?}", self.shape),
                (row, col),
            ));
        }
        self.triplets.push((row, col, value));
        Ok(())
    }
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }
    pub fn triplets(&self) -> &[(usize, usize, f32)] {
        &self.triplets
    }
    /// Drops every diagonal entry.
    pub fn without_diagonal(mut self) -> Self {
        self.triplets.retain(|&(r, c, _)| r != c);
        self
    }
    /// Canonical form: duplicates summed, explicit zeros dropped, row-major order.
    pub fn to_sparse(&self) -> Result<SparseTensor> {
        if let Some(&(r, c, v)) = self.triplets.iter().find(|t| !t.2.is_finite()) {
            return Err(Error::NumericFailure(format!(
                "raw entry ({r}, {c}) is {v}"
            )));
        }
        let (coords, values) = self
            .triplets
            .iter()
            .copied()
            .sorted_by_key(|&(r, c, _)| (r, c))
            .coalesce(|a, b| {
                if (a.0, a.1) == (b.0, b.1) {
                    Ok((a.0, a.1, a.2 + b.2))
                } else {
                    Err((a, b))
                }
            })
            .filter(|&(_, _, v)| v != 0.0)
            .map(|(r, c, v)| ((r, c), v))
            .unzip();
        Ok(SparseTensor {
            coords,
            values,
            shape: self.shape,
        })
    }
}

/// Canonical sparse matrix: unique row-major coordinates, parallel values, shape.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseTensor {
    coords: Vec<(usize, usize)>,
    values: Vec<f32>,
    shape: (usize, usize),
}
impl SparseTensor {
    pub fn coords(&self) -> &[(usize, usize)] {
        &self.coords
    }
    pub fn values(&self) -> &[f32] {
        &self.values
    }
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }
    pub fn nnz(&self) -> usize {
        self.values.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.coords
            .iter()
            .zip(&self.values)
            .map(|(&(r, c), &v)| (r, c, v))
    }
    /// Per-row sums, accumulated in f64.
    pub fn row_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.shape.0];
        for (r, _, v) in self.iter() {
            sums[r] += f64::from(v);
        }
        sums
    }
    /// Row-major dense copy.
    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0; self.shape.0 * self.shape.1];
        for (r, c, v) in self.iter() {
            dense[r * self.shape.1 + c] = v;
        }
        dense
    }
    /// Rescales each stored value by `f(row, col)`; zeros produced by the
    /// scaling are removed so the canonical invariants keep holding.
    pub(crate) fn scale_by<F: Fn(usize, usize) -> f64>(&self, f: F) -> Self {
        let (coords, values) = self
            .iter()
            .map(|(r, c, v)| ((r, c), (f64::from(v) * f(r, c)) as f32))
            .filter(|&(_, v)| v != 0.0)
            .unzip();
        Self {
            coords,
            values,
            shape: self.shape,
        }
    }
    pub fn ensure_finite(&self, what: &str) -> Result<()> {
        match self.iter().find(|t| !t.2.is_finite()) {
            Some((r, c, v)) => Err(Error::NumericFailure(format!(
                "{what} entry ({r}, {c}) is {v}"
            ))),
            None => Ok(()),
        }
    }
    pub fn to_device(&self, device: &Device) -> Result<DeviceSparseTensor> {
        let nnz = self.nnz();
        let row = Tensor::from_iter(self.coords.iter().map(|&(r, _)| r as u32), device)?;
        let col = Tensor::from_iter(self.coords.iter().map(|&(_, c)| c as u32), device)?;
        let values = Tensor::from_slice(&self.values, (nnz, 1), device)?;
        Ok(DeviceSparseTensor {
            row,
            col,
            values,
            shape: self.shape,
        })
    }
}

/// A [`SparseTensor`] resident on a candle device.
#[derive(Clone, Debug)]
pub struct DeviceSparseTensor {
    row: Tensor,
    col: Tensor,
    values: Tensor,
    shape: (usize, usize),
}
impl DeviceSparseTensor {
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }
    pub fn nnz(&self) -> usize {
        self.values.dims()[0]
    }
    pub fn values(&self) -> &Tensor {
        &self.values
    }
    /// Same sparsity pattern with different `(nnz, 1)` values.
    pub fn with_values(&self, values: Tensor) -> candle_core::Result<Self> {
        if values.dims() != self.values.dims() {
            candle_core::bail!(
                "sparse values shape {:?} does not match {:?}",
                values.dims(),
                self.values.dims()
            );
        }
        Ok(Self {
            row: self.row.clone(),
            col: self.col.clone(),
            values,
            shape: self.shape,
        })
    }
    /// Sparse × dense product; differentiable in `rhs` and in the values.
    pub fn matmul(&self, rhs: &Tensor) -> candle_core::Result<Tensor> {
        let (rhs_rows, rhs_cols) = rhs.dims2()?;
        if rhs_rows != self.shape.1 {
            candle_core::bail!(
                "sparse matmul: lhs is {:?} but rhs has {} rows",
                self.shape,
                rhs_rows
            );
        }
        if self.nnz() == 0 {
            return Tensor::zeros((self.shape.0, rhs_cols), rhs.dtype(), rhs.device());
        }
        let weight = self.values.to_dtype(rhs.dtype())?;
        weighted_sum_agg(rhs, &self.row, &self.col, &weight, self.shape.0)
    }
}
