use ndarray::{Array2, ArrayView2};

use crate::MlError;

/// A trainable sequence model, seen from the outside.
///
/// The diffusion engine never looks inside a `SequenceModel`: it feeds one-hot
/// encoded sequences forward and hands error terms back. It does not:
/// - know the model's architecture,
/// - choose how parameters are updated,
/// - persist anything.
///
/// `forward` borrows the model immutably and `backward` mutably, so a model shared
/// with concurrent forward passes can't be updated until every one of them is done.
pub trait SequenceModel: Send + Sync {
    /// Returns the amount of columns expected in every input and error row.
    fn vocab_size(&self) -> usize;

    /// Computes the logits for a one-hot encoded sequence.
    ///
    /// # Arguments
    /// * `one_hot` - A `[L][vocab_size]` matrix, one row per position.
    ///
    /// # Returns
    /// The `[L][vocab_size]` logits, row `i` holding the logits of position `i`.
    ///
    /// # Errors
    /// Returns `MlError` if invariants are violated (e.g., shape mismatch).
    fn forward(&self, one_hot: ArrayView2<'_, f32>) -> Result<Array2<f32>, MlError>;

    /// Updates the model's parameters given per-position error terms.
    ///
    /// # Arguments
    /// * `errors` - A matrix with `vocab_size` columns and a multiple of `L` rows,
    ///   `[L][vocab_size]` for a single sample or `[N * L][vocab_size]` for `N`
    ///   samples laid out one after the other.
    /// * `learning_rate` - The length of the step to take.
    ///
    /// # Errors
    /// Returns `MlError` if invariants are violated.
    fn backward(&mut self, errors: ArrayView2<'_, f32>, learning_rate: f32)
    -> Result<(), MlError>;
}
