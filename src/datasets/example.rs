use candle_core::{Device, Tensor};
use rand::Rng;

use super::{Dataset, RawDataset};
use crate::error::Result;
use crate::masks::SplitIndices;
use crate::sparse::CooMatrix;

/// Four authors, two relations (identity and a single 0-1 edge), one-hot
/// features and labels, and a fixed train/val/test split of {0, 1}/{2}/{3}.
#[derive(Clone, Copy, Debug, Default)]
pub struct Example;
impl Example {
    pub const NUM_NODES: usize = 4;
}

impl Dataset for Example {
    fn load<R: Rng>(&self, _rng: &mut R) -> Result<RawDataset> {
        let n = Self::NUM_NODES;
        let edge = CooMatrix::from_triplets((n, n), [(0, 1, 1.0), (1, 0, 1.0)])?;
        let features = CooMatrix::from_triplets((n, 2), (0..n).map(|i| (i, i % 2, 1.0)))?;
        let labels = Tensor::new(
            &[[1f32, 0.0], [0.0, 1.0], [1.0, 0.0], [0.0, 1.0]],
            &Device::Cpu,
        )?;
        Ok(RawDataset {
            supports: vec![CooMatrix::identity(n), edge],
            features,
            labels,
            splits: SplitIndices {
                train: vec![0, 1],
                val: vec![2],
                test: vec![3],
            },
        })
    }
}
