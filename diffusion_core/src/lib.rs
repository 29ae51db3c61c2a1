mod error;
mod model;
mod stats;
mod tokenizer;

pub use error::MlError;
pub use model::SequenceModel;
pub use stats::EpochStats;
pub use tokenizer::{CLS, MASK, PAD, SEP, TokenId, Tokenizer};
