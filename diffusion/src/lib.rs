pub mod config;
pub mod corpus;
pub mod error;
mod eval;
pub mod loss;
pub mod noise;
pub mod numerics;
pub mod sampling;
pub mod strategy;
mod test_models;
pub mod training;

pub use config::{DiffusionConfig, GradientPolicy};
pub use corpus::Corpus;
pub use error::{DiffusionErr, Result};
pub use noise::NoiseScheduler;
pub use sampling::Sampler;
pub use strategy::Strategy;
pub use training::DiffusionTrainer;
