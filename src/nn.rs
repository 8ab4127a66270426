pub mod utils;

mod gcn;
pub use gcn::{GraphConvolution, GraphConvolutionParams, NodeInput};
mod attention;
pub use attention::MetaPathAttention;
