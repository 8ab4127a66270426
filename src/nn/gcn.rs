use candle_core::{Device, Result, Tensor, Var};
use candle_nn::{Activation, Module};
use rand::Rng;

use super::utils::{dropout, dropout_mask, glorot, zeros_var};
use crate::sparse::DeviceSparseTensor;

/// Node features entering a graph convolution.
#[derive(Clone, Copy, Debug)]
pub enum NodeInput<'a> {
    Sparse(&'a DeviceSparseTensor),
    Dense(&'a Tensor),
}

pub struct GraphConvolutionParams {
    pub dropout_rate: f32,
    /// `None` is the identity.
    pub activation_fn: Option<Activation>,
    /// Standardize each output column across nodes before the bias.
    pub norm: bool,
}
impl Default for GraphConvolutionParams {
    fn default() -> Self {
        Self {
            dropout_rate: 0.0,
            activation_fn: Some(Activation::Relu),
            norm: false,
        }
    }
}

/// `act(norm(A · dropout(X) · W) + b)` for one support `A`.
pub struct GraphConvolution {
    weight: Var,
    bias: Var,
    dropout_rate: f32,
    activation_fn: Option<Activation>,
    norm: bool,
}
impl GraphConvolution {
    const NORM_EPS: f64 = 1e-3;

    pub fn new<R: Rng>(
        in_dim: usize,
        out_dim: usize,
        params: GraphConvolutionParams,
        rng: &mut R,
        device: &Device,
    ) -> Result<Self> {
        Ok(Self {
            weight: glorot(in_dim, out_dim, rng, device)?,
            bias: zeros_var((1, out_dim), device)?,
            dropout_rate: params.dropout_rate,
            activation_fn: params.activation_fn,
            norm: params.norm,
        })
    }
    pub fn weight(&self) -> &Var {
        &self.weight
    }
    pub fn bias(&self) -> &Var {
        &self.bias
    }
    pub fn parameters(&self) -> Vec<Var> {
        vec![self.weight.clone(), self.bias.clone()]
    }

    pub fn forward_t<R: Rng>(
        &self,
        x: NodeInput,
        support: &DeviceSparseTensor,
        train: bool,
        rng: &mut R,
    ) -> Result<Tensor> {
        let rate = if train { self.dropout_rate } else { 0.0 };
        let pre_sup = match x {
            NodeInput::Sparse(x) if rate > 0.0 => {
                let keep = dropout_mask((x.nnz(), 1), rate, rng, x.values().device())?;
                x.with_values(x.values().mul(&keep)?)?.matmul(&self.weight)?
            }
            NodeInput::Sparse(x) => x.matmul(&self.weight)?,
            NodeInput::Dense(x) => dropout(x, rate, rng)?.matmul(&self.weight)?,
        };
        let mut output = support.matmul(&pre_sup)?;
        if self.norm {
            output = standardize(&output, Self::NORM_EPS)?;
        }
        output = output.broadcast_add(&self.bias)?;
        match &self.activation_fn {
            Some(activation_fn) => activation_fn.forward(&output),
            None => Ok(output),
        }
    }
}

/// Zero mean, unit variance per column, moments taken over the nodes.
fn standardize(xs: &Tensor, eps: f64) -> Result<Tensor> {
    let mean = xs.mean_keepdim(0)?;
    let centered = xs.broadcast_sub(&mean)?;
    let variance = centered.sqr()?.mean_keepdim(0)?;
    centered.broadcast_div(&(variance + eps)?.sqrt()?)
}
