use diffusion_core::{MlError, SequenceModel, TokenId};
use ndarray::Array2;

use crate::{Result, numerics::one_hot};

/// Runs a token sequence through the model.
///
/// # Returns
/// The `[L][vocab_size]` logits, or a shape mismatch if the model answered with
/// something else.
pub(crate) fn logits<M>(model: &M, tokens: &[TokenId]) -> Result<Array2<f32>>
where
    M: SequenceModel + ?Sized,
{
    let vocab_size = model.vocab_size();
    let logits = model.forward(one_hot(tokens, vocab_size).view())?;

    if logits.nrows() != tokens.len() {
        return Err(MlError::ShapeMismatch {
            what: "logit rows",
            got: logits.nrows(),
            expected: tokens.len(),
        }
        .into());
    }

    if logits.ncols() != vocab_size {
        return Err(MlError::ShapeMismatch {
            what: "logit columns",
            got: logits.ncols(),
            expected: vocab_size,
        }
        .into());
    }

    Ok(logits)
}
