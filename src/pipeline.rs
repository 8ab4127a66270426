//! Wiring from a loaded dataset to a finished run.

use candle_core::{DType, Device, Tensor};
use rand::rngs::StdRng;
use tracing::info;

use crate::config::{Config, DerivedDimensions, Hyperparameters};
use crate::datasets::RawDataset;
use crate::error::{Error, Result};
use crate::masks::{Split, SplitMasks};
use crate::models::{ModelInputs, Player2Vec};
use crate::preprocess::{normalize_features, normalize_supports, AdjacencyNorm};
use crate::sparse::SparseTensor;
use crate::train::{MaskIndices, Reporter, RunSummary, Trainer};
use crate::utils::mask_to_index;

/// Normalized matrices and verified masks, still on the host.
#[derive(Clone, Debug)]
pub struct PreparedData {
    pub supports: Vec<SparseTensor>,
    pub features: SparseTensor,
    pub labels: Tensor,
    pub masks: SplitMasks,
}
impl PreparedData {
    pub fn to_device(&self, device: &Device) -> Result<(ModelInputs, MaskIndices)> {
        let inputs = ModelInputs {
            supports: self
                .supports
                .iter()
                .map(|s| s.to_device(device))
                .collect::<Result<_>>()?,
            features: self.features.to_device(device)?,
            labels: self.labels.to_dtype(DType::F32)?.to_device(device)?,
        };
        let masks = MaskIndices {
            train: mask_to_index(&self.masks.train, device)?,
            val: mask_to_index(&self.masks.val, device)?,
            test: mask_to_index(&self.masks.test, device)?,
        };
        Ok((inputs, masks))
    }
}

/// Normalizes every matrix and builds the split masks. The node count is
/// taken from the label matrix.
pub fn prepare(raw: &RawDataset, norm: &AdjacencyNorm) -> Result<PreparedData> {
    let (num_nodes, _) = raw.labels.dims2()?;
    let features = normalize_features(&raw.features, num_nodes)?;
    let supports = normalize_supports(&raw.supports, num_nodes, norm)?;
    if supports.is_empty() {
        return Err(Error::Dataset("no adjacency matrices".into()));
    }
    let masks = SplitMasks::build(&raw.splits, num_nodes)?;
    info!(
        nodes = num_nodes,
        features = features.shape().1,
        feature_nnz = features.nnz(),
        supports = supports.len(),
        train = masks.count(Split::Train),
        val = masks.count(Split::Val),
        test = masks.count(Split::Test),
        "preprocessed"
    );
    Ok(PreparedData {
        supports,
        features,
        labels: raw.labels.clone(),
        masks,
    })
}

/// Builds the model from the data's dimensions and runs the full
/// train/validate/test cycle.
pub fn train<R: Reporter>(
    data: &PreparedData,
    hyper: Hyperparameters,
    device: &Device,
    rng: &mut StdRng,
    reporter: &mut R,
) -> Result<RunSummary> {
    let dims = DerivedDimensions::from_data(data)?;
    let config = Config::new(hyper, dims);
    info!(?dims, "derived dimensions");

    let (inputs, masks) = data.to_device(device)?;
    let mut model = Player2Vec::new(
        dims.input_dim,
        config.hyper.hidden_dim,
        dims.output_dim,
        &config,
        device,
        rng,
    )?;
    Trainer::new(&mut model, &config.hyper)?.run(&inputs, &masks, reporter)
}
