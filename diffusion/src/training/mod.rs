mod concurrent;
mod trainer;

pub use trainer::DiffusionTrainer;

use diffusion_core::{SequenceModel, TokenId};

use crate::{
    Result, eval,
    loss::{SampleTerms, cross_entropy},
    strategy::Strategy,
};

/// Forwards a noised sample and computes its loss and error terms against the clean one.
///
/// # Arguments
/// * `model` - The model being trained.
/// * `strategy` - Decides which positions are supervised.
/// * `x0` - The clean sequence.
/// * `xt` - The noised sequence, same length as `x0`.
pub(crate) fn sample_terms<M>(
    model: &M,
    strategy: Strategy,
    x0: &[TokenId],
    xt: &[TokenId],
) -> Result<SampleTerms>
where
    M: SequenceModel + ?Sized,
{
    let logits = eval::logits(model, xt)?;
    Ok(cross_entropy(logits.view(), x0, |i| strategy.supervises(xt[i])))
}
