use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use diffusion_core::MlError;
use rayon::ThreadPoolBuildError;

/// The result type used in the entire diffusion module.
pub type Result<T> = std::result::Result<T, DiffusionErr>;

/// The diffusion module's error type.
///
/// Numeric anomalies are absorbed by fallbacks and never show up here, these are
/// the failures of the collaborators around the engine.
#[derive(Debug)]
pub enum DiffusionErr {
    /// The sequence model rejected an input.
    Model(MlError),
    /// The worker pool for concurrent training couldn't be built.
    ThreadPool(ThreadPoolBuildError),
    /// A configuration or corpus file couldn't be read.
    Io(io::Error),
    /// A configuration couldn't be parsed.
    Config(serde_json::Error),
}

impl Display for DiffusionErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffusionErr::Model(e) => write!(f, "sequence model error: {e}"),
            DiffusionErr::ThreadPool(e) => write!(f, "failed to build the worker pool: {e}"),
            DiffusionErr::Io(e) => write!(f, "io error: {e}"),
            DiffusionErr::Config(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl Error for DiffusionErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DiffusionErr::Model(e) => Some(e),
            DiffusionErr::ThreadPool(e) => Some(e),
            DiffusionErr::Io(e) => Some(e),
            DiffusionErr::Config(e) => Some(e),
        }
    }
}

impl From<MlError> for DiffusionErr {
    fn from(value: MlError) -> Self {
        Self::Model(value)
    }
}

impl From<ThreadPoolBuildError> for DiffusionErr {
    fn from(value: ThreadPoolBuildError) -> Self {
        Self::ThreadPool(value)
    }
}

impl From<io::Error> for DiffusionErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for DiffusionErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value)
    }
}
