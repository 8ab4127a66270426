pub mod config;
pub mod datasets;
pub mod error;
pub mod masks;
pub mod models;
pub mod nn;
pub mod pipeline;
pub mod preprocess;
pub mod sparse;
pub mod train;
pub mod utils;

pub use error::{Error, Result};
