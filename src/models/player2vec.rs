use candle_core::{Device, Result, Tensor, Var};
use candle_nn::Activation;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::traits::{FraudModel, ModelInputs, ModelOutput};
use super::utils::{l2_loss, masked_accuracy, masked_softmax_cross_entropy};
use crate::config::Config;
use crate::nn::{GraphConvolution, GraphConvolutionParams, MetaPathAttention, NodeInput};

/// Player2Vec (Zhang et al., "Key Player Identification in Underground Forums
/// over Attributed Heterogeneous Information Network Embedding Framework", CIKM 2019)
/// - a two layer GCN shared by every meta-path
/// - attention across the per-meta-path outputs: `Z = Σ_s β_s · gcn2(gcn1(X, A_s), A_s)`
/// - L2 decay on the first layer only
pub struct Player2Vec {
    gcn1: GraphConvolution,
    gcn2: GraphConvolution,
    attention: MetaPathAttention,
    num_features_nonzero: usize,
    class_size: usize,
    weight_decay: f64,
    dropout_rng: StdRng,
}
impl Player2Vec {
    pub fn new(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        config: &Config,
        device: &Device,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let dropout_rate = config.hyper.dropout;
        let gcn1 = GraphConvolution::new(
            input_dim,
            hidden_dim,
            GraphConvolutionParams {
                dropout_rate,
                activation_fn: Some(Activation::Relu),
                norm: true,
            },
            rng,
            device,
        )?;
        let gcn2 = GraphConvolution::new(
            hidden_dim,
            output_dim,
            GraphConvolutionParams {
                dropout_rate,
                activation_fn: None,
                norm: false,
            },
            rng,
            device,
        )?;
        let attention = MetaPathAttention::new(output_dim, config.dims.num_meta, rng, device)?;
        Ok(Self {
            gcn1,
            gcn2,
            attention,
            num_features_nonzero: config.dims.num_features_nonzero,
            class_size: config.dims.class_size,
            weight_decay: config.hyper.weight_decay,
            dropout_rng: StdRng::seed_from_u64(rng.gen()),
        })
    }

    /// Fused `N x output_dim` logits and the meta-path attention weights.
    pub fn logits(&mut self, inputs: &ModelInputs, train: bool) -> Result<(Tensor, Tensor)> {
        // the sparse dropout mask on layer 1 has one entry per stored feature
        if inputs.features.nnz() != self.num_features_nonzero {
            candle_core::bail!(
                "features have {} stored entries, model was built for {}",
                inputs.features.nnz(),
                self.num_features_nonzero
            );
        }
        let rng = &mut self.dropout_rng;
        let views = inputs
            .supports
            .iter()
            .map(|support| {
                let h = self
                    .gcn1
                    .forward_t(NodeInput::Sparse(&inputs.features), support, train, rng)?;
                self.gcn2
                    .forward_t(NodeInput::Dense(&h), support, train, rng)
            })
            .collect::<Result<Vec<_>>>()?;
        self.attention.forward(&views)
    }
}

impl FraudModel for Player2Vec {
    fn forward_t(
        &mut self,
        inputs: &ModelInputs,
        mask: &Tensor,
        train: bool,
    ) -> Result<ModelOutput> {
        let (_, classes) = inputs.labels.dims2()?;
        if classes != self.class_size {
            candle_core::bail!(
                "labels have {classes} classes, model was built for {}",
                self.class_size
            );
        }
        let (logits, _) = self.logits(inputs, train)?;
        let decay = (l2_loss(self.gcn1.weight())? + l2_loss(self.gcn1.bias())?)?;
        let loss = masked_softmax_cross_entropy(&logits, &inputs.labels, mask)?
            .add(&(decay * self.weight_decay)?)?;
        let accuracy = masked_accuracy(&logits, &inputs.labels, mask)?;
        Ok(ModelOutput { loss, accuracy })
    }

    fn parameters(&self) -> Vec<Var> {
        let mut vars = self.gcn1.parameters();
        vars.extend(self.gcn2.parameters());
        vars.extend(self.attention.parameters());
        vars
    }
}
