use std::cmp::Ordering;

use diffusion_core::TokenId;
use ndarray::Array2;

/// Numerically stable softmax of a logit row.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&z| (z - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Returns the index of the largest value, the first one on ties.
pub fn argmax(values: &[f32]) -> TokenId {
    let mut best = 0;

    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }

    best
}

/// Expands a token sequence into a `[len][vocab_size]` one-hot matrix.
///
/// Ids outside of the vocabulary produce an all-zero row.
pub fn one_hot(tokens: &[TokenId], vocab_size: usize) -> Array2<f32> {
    let mut out = Array2::zeros((tokens.len(), vocab_size));

    for (i, &tok) in tokens.iter().enumerate() {
        if tok < vocab_size {
            out[(i, tok)] = 1.0;
        }
    }

    out
}

/// The `k` most probable `(token, probability)` pairs, most probable first.
///
/// Ties keep the lowest token id first. `k` is clamped into `[1, probs.len()]`.
pub fn top_k(probs: &[f32], k: usize) -> Vec<(TokenId, f32)> {
    let mut candidates: Vec<(TokenId, f32)> = probs.iter().copied().enumerate().collect();
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    candidates.truncate(k.clamp(1, probs.len().max(1)));
    candidates
}

/// Scales the candidates' probabilities so they add up to one.
///
/// Candidates without any mass are left untouched.
pub fn renormalize(candidates: &mut [(TokenId, f32)]) {
    let sum: f32 = candidates.iter().map(|&(_, p)| p).sum();
    if sum <= 0.0 {
        return;
    }

    for (_, p) in candidates.iter_mut() {
        *p /= sum;
    }
}

/// Inverse-CDF draw over `candidates` for a uniform value `r` in `[0, 1)`.
///
/// Falls back to the first candidate if rounding keeps the cumulative sum under `r`.
///
/// # Panics
/// If `candidates` is empty.
pub fn sample_inverse_cdf(candidates: &[(TokenId, f32)], r: f32) -> TokenId {
    let mut cumulative = 0.0;

    for &(token, p) in candidates {
        cumulative += p;
        if r <= cumulative {
            return token;
        }
    }

    candidates[0].0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_is_a_distribution() {
        let probs = softmax(&[1.0, 2.0, 3.0, 1000.0]);

        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(probs.iter().all(|p| p.is_finite() && *p >= 0.0));
        assert_eq!(argmax(&probs), 3);
    }

    #[test]
    fn softmax_of_uniform_logits_is_uniform() {
        let probs = softmax(&[0.5; 4]);
        assert!(probs.iter().all(|&p| (p - 0.25).abs() < 1e-6));
    }

    #[test]
    fn argmax_prefers_the_first_on_ties() {
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), 1);
    }

    #[test]
    fn one_hot_leaves_out_of_range_rows_empty() {
        let x = one_hot(&[2, 0, 7], 3);

        assert_eq!(x.shape(), [3, 3]);
        assert_eq!(x.row(0).to_vec(), [0.0, 0.0, 1.0]);
        assert_eq!(x.row(1).to_vec(), [1.0, 0.0, 0.0]);
        assert_eq!(x.row(2).to_vec(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn top_k_keeps_the_most_probable() {
        let candidates = top_k(&[0.1, 0.5, 0.0, 0.4], 2);
        assert_eq!(candidates, [(1, 0.5), (3, 0.4)]);

        assert_eq!(top_k(&[0.2, 0.8], 0), [(1, 0.8)]);
        assert_eq!(top_k(&[0.2, 0.8], 10).len(), 2);
    }

    #[test]
    fn inverse_cdf_walks_the_cumulative_sum() {
        let candidates = [(4, 0.5), (7, 0.3), (2, 0.2)];

        assert_eq!(sample_inverse_cdf(&candidates, 0.0), 4);
        assert_eq!(sample_inverse_cdf(&candidates, 0.5), 4);
        assert_eq!(sample_inverse_cdf(&candidates, 0.6), 7);
        assert_eq!(sample_inverse_cdf(&candidates, 0.99), 2);
    }

    #[test]
    fn inverse_cdf_falls_back_to_the_first_candidate() {
        let candidates = [(4, 0.3), (7, 0.3)];
        assert_eq!(sample_inverse_cdf(&candidates, 0.9), 4);
    }

    #[test]
    fn renormalize_skips_empty_mass() {
        let mut candidates = [(0, 0.2), (1, 0.6)];
        renormalize(&mut candidates);
        assert!((candidates[0].1 - 0.25).abs() < 1e-6);
        assert!((candidates[1].1 - 0.75).abs() < 1e-6);

        let mut empty = [(0, 0.0), (1, 0.0)];
        renormalize(&mut empty);
        assert_eq!(empty, [(0, 0.0), (1, 0.0)]);
    }
}
