use std::fmt;

/// Why a sequence model refused a forward or backward call.
#[derive(Debug, PartialEq, Eq)]
pub enum MlError {
    /// The model can't work with the given value at all.
    InvalidInput(&'static str),

    /// A matrix came in with the wrong amount of rows or columns.
    ShapeMismatch {
        /// Which dimension, e.g. "positions" or "logit columns".
        what: &'static str,
        got: usize,
        expected: usize,
    },

    /// Error terms whose rows don't split into whole `max_length` sequences.
    PartialSample { rows: usize, max_length: usize },
}

impl fmt::Display for MlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            MlError::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "expected {expected} {what}, got {got}"),
            MlError::PartialSample { rows, max_length } => write!(
                f,
                "{rows} error rows don't split into sequences of {max_length} positions"
            ),
        }
    }
}

impl std::error::Error for MlError {}
