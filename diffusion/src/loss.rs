use diffusion_core::TokenId;
use ndarray::{Array2, ArrayView2};

use crate::numerics::softmax;

/// Probabilities are floored to this value before taking their logarithm.
pub const PROB_FLOOR: f32 = 1e-10;

/// Error terms are clipped element-wise into `[-GRAD_CLIP, GRAD_CLIP]`.
pub const GRAD_CLIP: f32 = 5.0;

/// Cross-entropy loss and error terms of a single sample.
#[derive(Debug, Clone)]
pub struct SampleTerms {
    /// Summed loss over the supervised positions.
    pub loss: f32,
    /// `[L][vocab_size]` error terms, zero rows at unsupervised positions.
    pub errors: Array2<f32>,
    /// Amount of supervised positions.
    pub positions: usize,
}

/// Computes the cross-entropy of `logits` against `targets` over the positions
/// selected by `supervised`.
///
/// At every supervised position `p = softmax(logits[i])` adds `-ln(max(p[target], 1e-10))`
/// to the loss and writes `clip(p - onehot(target))` into the error terms.
///
/// # Arguments
/// * `logits` - The `[L][vocab_size]` model output.
/// * `targets` - The `L` clean tokens.
/// * `supervised` - Whether position `i` contributes to the loss.
pub fn cross_entropy<F>(logits: ArrayView2<'_, f32>, targets: &[TokenId], supervised: F) -> SampleTerms
where
    F: Fn(usize) -> bool,
{
    let mut errors = Array2::zeros(logits.raw_dim());
    let mut loss = 0.0;
    let mut positions = 0;

    for (i, &target) in targets.iter().enumerate() {
        if !supervised(i) {
            continue;
        }

        let probs = softmax(&logits.row(i).to_vec());
        let p = probs.get(target).copied().unwrap_or(0.0);
        loss -= p.max(PROB_FLOOR).ln();
        positions += 1;

        for (m, (e, p)) in errors.row_mut(i).iter_mut().zip(&probs).enumerate() {
            let delta = if m == target { p - 1.0 } else { *p };
            *e = delta.clamp(-GRAD_CLIP, GRAD_CLIP);
        }
    }

    SampleTerms {
        loss,
        errors,
        positions,
    }
}
