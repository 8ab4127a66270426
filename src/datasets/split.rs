use std::collections::BTreeMap;

use candle_core::{Tensor, D};
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

use super::RandomSplit;
use crate::error::{Error, Result};
use crate::masks::SplitIndices;

/// Share of each class held out for testing, and share of the remainder used
/// for training. Whatever is left becomes the validation split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitRatio {
    pub test: f64,
    pub train: f64,
}

/// Class id of every node.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassLabels(pub Vec<usize>);
impl ClassLabels {
    /// Argmax of each row of an `N x C` label matrix.
    pub fn from_one_hot(labels: &Tensor) -> Result<Self> {
        let classes = labels.argmax(D::Minus1)?.to_vec1::<u32>()?;
        Ok(Self(classes.into_iter().map(|c| c as usize).collect()))
    }
}

impl RandomSplit<SplitRatio> for ClassLabels {
    type Output = SplitIndices;

    /// Stratified split: every class is shuffled and cut with the same ratios.
    fn random_split<R: Rng>(&self, ratio: SplitRatio, rng: &mut R) -> Result<SplitIndices> {
        for r in [ratio.test, ratio.train] {
            if !(r > 0.0 && r < 1.0) {
                return Err(Error::Configuration(format!(
                    "split ratio {r} is not in (0, 1)"
                )));
            }
        }
        let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (node, &class) in self.0.iter().enumerate() {
            by_class.entry(class).or_default().push(node);
        }

        let mut split = SplitIndices::default();
        for (_, mut nodes) in by_class {
            nodes.shuffle(rng);
            let n_test = (nodes.len() as f64 * ratio.test).round() as usize;
            let rest = nodes.len() - n_test;
            let mut n_train = (rest as f64 * ratio.train).round() as usize;
            if rest >= 2 {
                n_train = n_train.clamp(1, rest - 1);
            }
            split.test.extend_from_slice(&nodes[..n_test]);
            split.train.extend_from_slice(&nodes[n_test..n_test + n_train]);
            split.val.extend_from_slice(&nodes[n_test + n_train..]);
        }
        split.train = split.train.into_iter().sorted().collect();
        split.val = split.val.into_iter().sorted().collect();
        split.test = split.test.into_iter().sorted().collect();
        Ok(split)
    }
}
