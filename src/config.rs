//! Run configuration, built in two phases: parsed flags ([`Hyperparameters`])
//! and dimensions read off the prepared data ([`DerivedDimensions`]).

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::{Error, Result};
use crate::pipeline::PreparedData;
use crate::preprocess::{AdjacencyNorm, NormScheme};

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum DatasetKind {
    /// DBLP authors with APA, APCPA and APTPA meta-paths, read from an npz file
    Dblp,
    /// Built-in four node toy graph
    Example,
}
impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Dblp => write!(f, "dblp"),
            Self::Example => write!(f, "example"),
        }
    }
}

fn parse_open_fraction(s: &str) -> std::result::Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if v > 0.0 && v < 1.0 {
        Ok(v)
    } else {
        Err(format!("{v} is not in (0, 1)"))
    }
}
fn parse_rate(s: &str) -> std::result::Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..1.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("{v} is not in [0, 1)"))
    }
}
fn parse_non_negative(s: &str) -> std::result::Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if v >= 0.0 && v.is_finite() {
        Ok(v)
    } else {
        Err(format!("{v} must be a finite non-negative number"))
    }
}
fn parse_positive(s: &str) -> std::result::Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if v > 0.0 && v.is_finite() {
        Ok(v)
    } else {
        Err(format!("{v} must be a finite positive number"))
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "fraud-gnn")]
#[command(about = "Train a Player2Vec meta-path GCN fraud detector", long_about = None)]
pub struct Args {
    /// Random seed
    #[arg(long, default_value_t = 123)]
    pub seed: u64,

    /// Dataset to train on
    #[arg(long = "dataset-str", alias = "dataset", value_enum, default_value_t = DatasetKind::Dblp)]
    pub dataset: DatasetKind,

    /// npz file holding the dblp arrays
    #[arg(long, default_value = "datasets/dblp.npz")]
    pub data_path: PathBuf,

    /// Training set share of the nodes left after the test split
    #[arg(long, default_value_t = 0.2, value_parser = parse_open_fraction)]
    pub train_size: f64,

    /// Number of epochs to train
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    pub epochs: u32,

    /// L2 penalty on the first graph convolution
    #[arg(long, default_value_t = 0.001, value_parser = parse_non_negative)]
    pub weight_decay: f64,

    /// Accepted for compatibility; training is full-batch
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_size: u32,

    /// Dropout rate
    #[arg(long, default_value_t = 0.5, value_parser = parse_rate)]
    pub dropout: f64,

    /// First moment decay of Adam
    #[arg(long, default_value_t = 0.9, value_parser = parse_rate)]
    pub momentum: f64,

    /// Learning rate
    #[arg(long = "lr", alias = "learning-rate", default_value_t = 0.001, value_parser = parse_positive)]
    pub lr: f64,

    /// Number of hidden units in the GCN
    #[arg(long, default_value_t = 128, value_parser = clap::value_parser!(u32).range(1..))]
    pub nhid: u32,

    /// Adjacency normalization: row (rows sum to at most 1) or symmetric
    /// (row sums may exceed 1)
    #[arg(long, default_value_t = NormScheme::Row)]
    pub adj_norm: NormScheme,

    /// Do not add self-loops before normalizing
    #[arg(long)]
    pub no_self_loops: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
impl Args {
    pub fn hyperparameters(&self) -> Result<Hyperparameters> {
        Hyperparameters {
            seed: self.seed,
            epochs: self.epochs as usize,
            learning_rate: self.lr,
            weight_decay: self.weight_decay,
            dropout: self.dropout as f32,
            momentum: self.momentum,
            hidden_dim: self.nhid as usize,
            batch_size: self.batch_size as usize,
            train_size: self.train_size,
            adjacency: AdjacencyNorm {
                scheme: self.adj_norm,
                self_loops: !self.no_self_loops,
            },
        }
        .validate()
    }
}

/// Fixed hyperparameters of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct Hyperparameters {
    pub seed: u64,
    pub epochs: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub dropout: f32,
    pub momentum: f64,
    pub hidden_dim: usize,
    pub batch_size: usize,
    pub train_size: f64,
    pub adjacency: AdjacencyNorm,
}
impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            seed: 123,
            epochs: 30,
            learning_rate: 0.001,
            weight_decay: 0.001,
            dropout: 0.5,
            momentum: 0.9,
            hidden_dim: 128,
            batch_size: 1000,
            train_size: 0.2,
            adjacency: AdjacencyNorm::default(),
        }
    }
}
impl Hyperparameters {
    /// Training is full-batch; any other batch size has no effect.
    pub fn batch_size_is_default(&self) -> bool {
        self.batch_size == Self::default().batch_size
    }

    pub fn validate(self) -> Result<Self> {
        let fail = |msg: String| Err(Error::Configuration(msg));
        if self.epochs == 0 {
            return fail("epochs must be at least 1".into());
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return fail(format!("learning rate {} must be positive", self.learning_rate));
        }
        if !(self.weight_decay >= 0.0 && self.weight_decay.is_finite()) {
            return fail(format!("weight decay {} must be non-negative", self.weight_decay));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return fail(format!("dropout {} is not in [0, 1)", self.dropout));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return fail(format!("momentum {} is not in [0, 1)", self.momentum));
        }
        if self.hidden_dim == 0 || self.batch_size == 0 {
            return fail("hidden size and batch size must be at least 1".into());
        }
        if !(self.train_size > 0.0 && self.train_size < 1.0) {
            return fail(format!("train size {} is not in (0, 1)", self.train_size));
        }
        Ok(self)
    }
}

/// Sizes read off the prepared data, computed once.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DerivedDimensions {
    pub num_nodes: usize,
    pub input_dim: usize,
    pub output_dim: usize,
    pub class_size: usize,
    pub num_meta: usize,
    /// Stored entries of the feature matrix; sizes the sparse dropout mask.
    pub num_features_nonzero: usize,
}
impl DerivedDimensions {
    pub fn from_data(data: &PreparedData) -> Result<Self> {
        let (num_nodes, input_dim) = data.features.shape();
        let (label_rows, class_size) = data.labels.dims2()?;
        if label_rows != num_nodes {
            return Err(Error::shape_mismatch("label rows", num_nodes, label_rows));
        }
        if data.masks.num_nodes() != num_nodes {
            return Err(Error::shape_mismatch(
                "mask length",
                num_nodes,
                data.masks.num_nodes(),
            ));
        }
        if data.supports.is_empty() {
            return Err(Error::Dataset("no adjacency matrices".into()));
        }
        for support in &data.supports {
            if support.shape() != (num_nodes, num_nodes) {
                return Err(Error::shape_mismatch(
                    "support",
                    (num_nodes, num_nodes),
                    support.shape(),
                ));
            }
        }
        Ok(Self {
            num_nodes,
            input_dim,
            output_dim: class_size,
            class_size,
            num_meta: data.supports.len(),
            num_features_nonzero: data.features.nnz(),
        })
    }
}

/// Immutable for the whole run.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub hyper: Hyperparameters,
    pub dims: DerivedDimensions,
}
impl Config {
    pub fn new(hyper: Hyperparameters, dims: DerivedDimensions) -> Self {
        Self { hyper, dims }
    }
}
