//! Error types for the fraud detector pipeline.

use std::fmt;

use thiserror::Error;

use crate::masks::Split;

/// Training stage an error surfaced in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    ForwardTrain,
    Backward,
    Update,
    ForwardVal,
    ForwardTest,
}
impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ForwardTrain => write!(f, "forward-train"),
            Self::Backward => write!(f, "backward"),
            Self::Update => write!(f, "update"),
            Self::ForwardVal => write!(f, "forward-val"),
            Self::ForwardTest => write!(f, "forward-test"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or out-of-range hyperparameter.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("node index {index} out of range for {len} nodes")]
    IndexOutOfRange { index: usize, len: usize },

    /// NaN or infinity in a preprocessed matrix or a model output.
    #[error("non-finite value: {0}")]
    NumericFailure(String),

    #[error("node {node} belongs to both the {first} and the {second} split")]
    SplitOverlap {
        node: usize,
        first: Split,
        second: Split,
    },

    #[error("the {0} split is empty")]
    EmptySplit(Split),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error("{stage} failed")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn shape_mismatch(
        what: impl Into<String>,
        expected: impl fmt::Debug,
        actual: impl fmt::Debug,
    ) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }

    pub(crate) fn in_stage(self, stage: Stage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
