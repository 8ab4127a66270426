mod traits;
pub use traits::{FraudModel, ModelInputs, ModelOutput};
pub mod utils;

mod player2vec;
pub use player2vec::Player2Vec;
