//! Boolean split masks over all nodes.

use std::fmt;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Split {
    Train,
    Val,
    Test,
}
impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Val => write!(f, "validation"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Node indices of each split, as handed out by a dataset loader.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub test: Vec<usize>,
}

/// `true` exactly at `indices`. Duplicates collapse.
pub fn sample_mask(indices: &[usize], len: usize) -> Result<Vec<bool>> {
    let mut mask = vec![false; len];
    for &index in indices {
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        mask[index] = true;
    }
    Ok(mask)
}

#[derive(Clone, Debug, PartialEq)]
pub struct SplitMasks {
    pub train: Vec<bool>,
    pub val: Vec<bool>,
    pub test: Vec<bool>,
}
impl SplitMasks {
    /// Builds the three masks and checks they are non-empty and pairwise disjoint.
    pub fn build(indices: &SplitIndices, num_nodes: usize) -> Result<Self> {
        let masks = Self {
            train: sample_mask(&indices.train, num_nodes)?,
            val: sample_mask(&indices.val, num_nodes)?,
            test: sample_mask(&indices.test, num_nodes)?,
        };
        for split in [Split::Train, Split::Val, Split::Test] {
            if !masks.get(split).iter().any(|&m| m) {
                return Err(Error::EmptySplit(split));
            }
        }
        for (first, second) in [
            (Split::Train, Split::Val),
            (Split::Train, Split::Test),
            (Split::Val, Split::Test),
        ] {
            let overlap = masks
                .get(first)
                .iter()
                .zip(masks.get(second))
                .position(|(&a, &b)| a && b);
            if let Some(node) = overlap {
                return Err(Error::SplitOverlap {
                    node,
                    first,
                    second,
                });
            }
        }
        Ok(masks)
    }
    pub fn get(&self, split: Split) -> &[bool] {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
            Split::Test => &self.test,
        }
    }
    pub fn count(&self, split: Split) -> usize {
        self.get(split).iter().filter(|&&m| m).count()
    }
    pub fn num_nodes(&self) -> usize {
        self.train.len()
    }
}
