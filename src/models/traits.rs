use candle_core::{Result, Tensor, Var};

use crate::sparse::DeviceSparseTensor;

/// Everything a forward pass reads besides the parameters.
#[derive(Clone, Debug)]
pub struct ModelInputs {
    /// One normalized adjacency per meta-path.
    pub supports: Vec<DeviceSparseTensor>,
    pub features: DeviceSparseTensor,
    /// `N x C` one-hot.
    pub labels: Tensor,
}

/// Scalar loss and accuracy over the masked nodes.
#[derive(Clone, Debug)]
pub struct ModelOutput {
    pub loss: Tensor,
    pub accuracy: Tensor,
}

pub trait FraudModel {
    /// `mask` lists the node indices (u32) the loss and accuracy are taken over.
    /// `train` enables dropout.
    fn forward_t(&mut self, inputs: &ModelInputs, mask: &Tensor, train: bool)
        -> Result<ModelOutput>;
    fn parameters(&self) -> Vec<Var>;
}
