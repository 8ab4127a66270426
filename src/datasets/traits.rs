use rand::Rng;

use super::RawDataset;
use crate::error::Result;

pub trait Dataset {
    /// Loads raw matrices and split indices. `rng` drives any random split.
    fn load<R: Rng>(&self, rng: &mut R) -> Result<RawDataset>;
}

pub trait RandomSplit<Ratio> {
    type Output;
    fn random_split<R: Rng>(&self, ratio: Ratio, rng: &mut R) -> Result<Self::Output>;
}
