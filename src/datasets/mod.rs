use candle_core::Tensor;
use rand::Rng;

use crate::config::DatasetKind;
use crate::error::Result;
use crate::masks::SplitIndices;
use crate::sparse::CooMatrix;

mod dblp;
pub use dblp::*;

mod example;
pub use example::*;

mod split;
pub use split::*;

mod traits;
pub use traits::*;

/// What a loader hands to preprocessing: one raw adjacency per meta-path,
/// raw node features, an `N x C` one-hot label matrix and the split indices.
#[derive(Clone, Debug)]
pub struct RawDataset {
    pub supports: Vec<CooMatrix>,
    pub features: CooMatrix,
    pub labels: Tensor,
    pub splits: SplitIndices,
}

/// Loads the dataset named on the command line.
pub fn load<R: Rng>(
    kind: DatasetKind,
    path: &std::path::Path,
    train_size: f64,
    rng: &mut R,
) -> Result<RawDataset> {
    match kind {
        DatasetKind::Dblp => Dblp::new(path, train_size).load(rng),
        DatasetKind::Example => Example.load(rng),
    }
}
