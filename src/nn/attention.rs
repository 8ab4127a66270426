use candle_core::{Device, Result, Tensor, Var};
use candle_nn::ops;
use rand::Rng;

use super::utils::{glorot, zeros_var};

/// Semantic attention over meta-path views.
///
/// Each view `H_s` (nodes x dim) is scored by `mean_nodes(tanh(H_s W + b)) · u`;
/// the views are then summed with the softmax of their scores.
pub struct MetaPathAttention {
    w: Var,
    b: Var,
    u: Var,
}
impl MetaPathAttention {
    pub fn new<R: Rng>(
        in_dim: usize,
        attention_size: usize,
        rng: &mut R,
        device: &Device,
    ) -> Result<Self> {
        Ok(Self {
            w: glorot(in_dim, attention_size, rng, device)?,
            b: zeros_var((1, attention_size), device)?,
            u: glorot(attention_size, 1, rng, device)?,
        })
    }
    pub fn parameters(&self) -> Vec<Var> {
        vec![self.w.clone(), self.b.clone(), self.u.clone()]
    }

    /// Returns the fused view and the `(num_views,)` attention weights.
    pub fn forward(&self, views: &[Tensor]) -> Result<(Tensor, Tensor)> {
        if views.is_empty() {
            candle_core::bail!("meta-path attention needs at least one view");
        }
        let scores = views
            .iter()
            .map(|h| {
                h.matmul(&self.w)?
                    .broadcast_add(&self.b)?
                    .tanh()?
                    .mean_keepdim(0)?
                    .matmul(&self.u)
            })
            .collect::<Result<Vec<_>>>()?;
        let weights = ops::softmax(&Tensor::cat(&scores, 0)?.flatten_all()?, 0)?;
        let fused = Tensor::stack(views, 0)?
            .broadcast_mul(&weights.reshape((views.len(), 1, 1))?)?
            .sum(0)?;
        Ok((fused, weights))
    }
}
