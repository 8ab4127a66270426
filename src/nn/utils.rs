use candle_core::{Device, Result, Tensor, Var};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

/// `out[target[e]] += edge_weight[e] * xs[source[e]]` over all edges `e`.
///
/// `edge_weight` has shape `(num_edges, 1)`; the output has `num_targets` rows.
pub fn weighted_sum_agg(
    xs: &Tensor,
    target: &Tensor,
    source: &Tensor,
    edge_weight: &Tensor,
    num_targets: usize,
) -> Result<Tensor> {
    let (_, dim) = xs.dims2()?;
    let messages = xs.index_select(source, 0)?.broadcast_mul(edge_weight)?;
    Tensor::zeros((num_targets, dim), xs.dtype(), xs.device())?.index_add(target, &messages, 0)
}

// Xavier Uniform
pub fn glorot<R: Rng>(
    in_dim: usize,
    out_dim: usize,
    rng: &mut R,
    device: &Device,
) -> Result<Var> {
    let bound = (6.0 / (in_dim + out_dim) as f32).sqrt();
    let dist = Uniform::new_inclusive(-bound, bound);
    let data: Vec<f32> = (0..in_dim * out_dim).map(|_| dist.sample(rng)).collect();
    Var::from_tensor(&Tensor::from_vec(data, (in_dim, out_dim), device)?)
}

pub fn zeros_var(dims: (usize, usize), device: &Device) -> Result<Var> {
    Var::zeros(dims, candle_core::DType::F32, device)
}

/// Inverted-dropout keep mask: entries are `0` or `1 / (1 - rate)`.
pub fn dropout_mask<R: Rng>(
    dims: (usize, usize),
    rate: f32,
    rng: &mut R,
    device: &Device,
) -> Result<Tensor> {
    let scale = 1.0 / (1.0 - rate);
    let data: Vec<f32> = (0..dims.0 * dims.1)
        .map(|_| if rng.gen::<f32>() < rate { 0.0 } else { scale })
        .collect();
    Tensor::from_vec(data, dims, device)
}

/// Dense dropout. Identity when `rate` is zero.
pub fn dropout<R: Rng>(xs: &Tensor, rate: f32, rng: &mut R) -> Result<Tensor> {
    if rate <= 0.0 {
        return Ok(xs.clone());
    }
    let mask = dropout_mask(xs.dims2()?, rate, rng, xs.device())?;
    xs.mul(&mask.to_dtype(xs.dtype())?)
}
