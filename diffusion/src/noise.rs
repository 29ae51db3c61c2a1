use diffusion_core::{MASK, PAD, TokenId};
use rand::{Rng, seq::SliceRandom};

use crate::DiffusionConfig;

/// Highest corruption rate of step indexed masking.
const STEP_NOISE_CAP: f32 = 0.8;

/// The forward (noising) half of the diffusion process.
///
/// Holds the per-step mask fractions, computed once from the configuration:
/// `fraction[t] = clamp(start + (end - start) * t / (T - 1), 0, 1)`.
/// Step `0` is the closest to a clean sequence, step `T - 1` the most corrupted.
///
/// `PAD` positions are never masked by any of the noising functions.
#[derive(Debug, Clone)]
pub struct NoiseScheduler {
    mask_fraction: Vec<f32>,
}

impl NoiseScheduler {
    /// Creates a new `NoiseScheduler`.
    ///
    /// # Arguments
    /// * `config` - The run configuration, `num_timesteps` should be at least 2.
    ///
    /// # Returns
    /// A new `NoiseScheduler` instance.
    pub fn new(config: &DiffusionConfig) -> Self {
        let steps = config.timesteps();
        let (start, end) = (config.mask_schedule_start, config.mask_schedule_end);
        let denom = (steps - 1).max(1) as f32;

        let mask_fraction = (0..steps)
            .map(|t| (start + (end - start) * t as f32 / denom).clamp(0.0, 1.0))
            .collect();

        Self { mask_fraction }
    }

    /// Returns the amount of diffusion steps.
    pub fn steps(&self) -> usize {
        self.mask_fraction.len()
    }

    /// Returns the whole mask fraction table.
    pub fn mask_fractions(&self) -> &[f32] {
        &self.mask_fraction
    }

    /// Returns the fraction of non-pad tokens masked at step `t`, saturating at the last step.
    pub fn fraction(&self, t: usize) -> f32 {
        let last = self.mask_fraction.len() - 1;
        self.mask_fraction[t.min(last)]
    }

    /// Draws a uniform step index in `[0, T)`.
    pub fn sample_step<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.random_range(0..self.steps())
    }

    /// Masks every non-pad token independently with probability `min(0.8, (t + 1) / T)`.
    pub fn mask_by_step<R: Rng + ?Sized>(
        &self,
        x0: &[TokenId],
        t: usize,
        rng: &mut R,
    ) -> Vec<TokenId> {
        let level = ((t + 1) as f32 / self.steps() as f32).min(STEP_NOISE_CAP);
        mask_bernoulli(x0, level, rng)
    }

    /// Masks every non-pad token independently with probability `level`, a continuous
    /// step value in `[0, 1]`.
    pub fn mask_continuous<R: Rng + ?Sized>(
        &self,
        x0: &[TokenId],
        level: f32,
        rng: &mut R,
    ) -> Vec<TokenId> {
        mask_bernoulli(x0, level, rng)
    }

    /// Masks exactly `round(fraction[t] * non-pad tokens)` positions, chosen uniformly.
    pub fn mask_exact<R: Rng + ?Sized>(
        &self,
        x0: &[TokenId],
        t: usize,
        rng: &mut R,
    ) -> Vec<TokenId> {
        mask_fraction_exact(x0, self.fraction(t), rng)
    }
}

fn mask_bernoulli<R: Rng + ?Sized>(x0: &[TokenId], level: f32, rng: &mut R) -> Vec<TokenId> {
    x0.iter()
        .map(|&tok| {
            if tok != PAD && rng.random::<f32>() < level {
                MASK
            } else {
                tok
            }
        })
        .collect()
}

/// Masks exactly `round(fraction * non-pad tokens)` positions of `x0`.
///
/// The positions are the first ones of a uniform permutation of the non-pad
/// indices. A fraction of zero or less returns `x0` unchanged.
pub fn mask_fraction_exact<R: Rng + ?Sized>(
    x0: &[TokenId],
    fraction: f32,
    rng: &mut R,
) -> Vec<TokenId> {
    let mut noisy = x0.to_vec();
    if fraction <= 0.0 {
        return noisy;
    }

    let mut idxs: Vec<usize> = x0
        .iter()
        .enumerate()
        .filter(|&(_, &tok)| tok != PAD)
        .map(|(i, _)| i)
        .collect();
    idxs.shuffle(rng);

    let k = ((idxs.len() as f32 * fraction).round() as usize).min(idxs.len());
    for &i in &idxs[..k] {
        noisy[i] = MASK;
    }

    noisy
}
