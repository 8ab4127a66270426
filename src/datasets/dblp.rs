use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{DType, Tensor};
use itertools::Itertools;
use rand::Rng;
use tracing::info;

use super::{ClassLabels, Dataset, RandomSplit, RawDataset, SplitRatio};
use crate::error::{Error, Result};
use crate::sparse::CooMatrix;

// ```python
// data = scipy.io.loadmat("DBLP4057_GAT_with_idx_tra200_val_800.mat")
// np.savez("dblp.npz",
//     features=data["features"], label=data["label"],
//     net_APA=data["net_APA"], net_APCPA=data["net_APCPA"], net_APTPA=data["net_APTPA"])
// ```
/// DBLP authors with one dense adjacency per meta-path (`net_*` arrays).
#[derive(Clone, Debug)]
pub struct Dblp {
    path: PathBuf,
    ratio: SplitRatio,
}
impl Dblp {
    pub const TEST_RATIO: f64 = 0.4;
    const META_PATH_PREFIX: &'static str = "net_";

    pub fn new<P: AsRef<Path>>(path: P, train_size: f64) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            ratio: SplitRatio {
                test: Self::TEST_RATIO,
                train: train_size,
            },
        }
    }
}

fn dense_to_coo(t: &Tensor) -> Result<CooMatrix> {
    let shape = t.dims2()?;
    let data = t.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
    CooMatrix::from_dense(&data, shape)
}

impl Dataset for Dblp {
    fn load<R: Rng>(&self, rng: &mut R) -> Result<RawDataset> {
        let mut arrays: HashMap<String, Tensor> = HashMap::from_iter(Tensor::read_npz(&self.path)?);
        let mut take = |name: &str| {
            arrays.remove(name).ok_or_else(|| {
                Error::Dataset(format!("missing array '{name}' in {}", self.path.display()))
            })
        };
        let features = dense_to_coo(&take("features")?)?;
        let labels = take("label")?.to_dtype(DType::F32)?;

        // the stored meta-path graphs include self-connections
        let supports = arrays
            .keys()
            .filter(|k| k.starts_with(Self::META_PATH_PREFIX))
            .sorted()
            .map(|k| dense_to_coo(&arrays[k]).map(CooMatrix::without_diagonal))
            .collect::<Result<Vec<_>>>()?;
        if supports.is_empty() {
            return Err(Error::Dataset(format!(
                "no '{}*' arrays in {}",
                Self::META_PATH_PREFIX,
                self.path.display()
            )));
        }

        let splits = ClassLabels::from_one_hot(&labels)?.random_split(self.ratio, rng)?;
        info!(
            path = %self.path.display(),
            nodes = features.shape().0,
            features = features.shape().1,
            meta_paths = supports.len(),
            train = splits.train.len(),
            val = splits.val.len(),
            test = splits.test.len(),
            "loaded dblp"
        );
        Ok(RawDataset {
            supports,
            features,
            labels,
            splits,
        })
    }
}
