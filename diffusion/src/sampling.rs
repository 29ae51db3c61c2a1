use diffusion_core::{MASK, SequenceModel, TokenId};
use log::{debug, trace};
use rand::Rng;

use crate::{
    DiffusionConfig, Result, eval,
    numerics::{argmax, renormalize, sample_inverse_cdf, softmax, top_k},
    strategy::Strategy,
};

/// Below this, the temperature and the remaining probability mass count as zero.
const EPSILON: f32 = 1e-12;

/// Token a position resolves to when nothing else is possible.
const FALLBACK: TokenId = 0;

/// The reverse (denoising) half of the diffusion process.
///
/// Only reads the model, any amount of samplers may share one.
pub struct Sampler<'m, M: SequenceModel + ?Sized> {
    model: &'m M,
    max_length: usize,
    steps: usize,
    temperature: f32,
    top_k: usize,
}

impl<'m, M: SequenceModel + ?Sized> Sampler<'m, M> {
    /// Creates a new `Sampler`.
    ///
    /// # Arguments
    /// * `model` - The denoising model.
    /// * `config` - The run configuration.
    pub fn new(model: &'m M, config: &DiffusionConfig) -> Self {
        Self {
            model,
            max_length: config.max_length,
            steps: config.timesteps(),
            temperature: config.temperature,
            top_k: config.top_k(model.vocab_size()),
        }
    }

    /// Generates a sequence the way `strategy` does.
    ///
    /// # Returns
    /// `max_length` token ids, none of them `MASK`.
    pub fn generate<R: Rng + ?Sized>(&self, strategy: Strategy, rng: &mut R) -> Result<Vec<TokenId>> {
        let mut seq = match strategy.remask_schedule(self.steps) {
            Some(remask) => self.refine(&remask, rng)?,
            None => self.greedy(rng)?,
        };

        for tok in seq.iter_mut().filter(|t| **t == MASK) {
            *tok = FALLBACK;
        }

        Ok(seq)
    }

    /// Starts from a random sequence and replaces every position with its most
    /// probable token, once per step.
    pub fn greedy<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<TokenId>> {
        let vocab_size = self.model.vocab_size().max(1);
        let mut seq: Vec<TokenId> = (0..self.max_length)
            .map(|_| rng.random_range(0..vocab_size))
            .collect();
        debug!("initial random tokens: {seq:?}");

        for step in (0..self.steps).rev() {
            let logits = eval::logits(self.model, &seq)?;

            for (tok, row) in seq.iter_mut().zip(logits.rows()) {
                *tok = argmax(&softmax(&row.to_vec()));
            }
            trace!(step = step; "greedy pass: {seq:?}");
        }

        Ok(seq)
    }

    /// Starts from a fully masked sequence and iteratively resolves the masked
    /// positions.
    ///
    /// Every step resolves each still masked position by sampling, then reverts each
    /// position resolved in that step back to `MASK` with the step's probability.
    ///
    /// # Arguments
    /// * `remask` - The re-masking probability of every step, in iteration order.
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// The refined sequence, positions still masked after the last step included.
    pub fn refine<R: Rng + ?Sized>(&self, remask: &[f32], rng: &mut R) -> Result<Vec<TokenId>> {
        let mut seq = vec![MASK; self.max_length];

        for (step, &p_remask) in remask.iter().enumerate() {
            let logits = eval::logits(self.model, &seq)?;
            let masked: Vec<usize> = (0..seq.len()).filter(|&i| seq[i] == MASK).collect();

            for &i in &masked {
                seq[i] = self.resolve(&logits.row(i).to_vec(), rng.random());
            }

            if p_remask > 0.0 {
                for &i in &masked {
                    if rng.random::<f32>() < p_remask {
                        seq[i] = MASK;
                    }
                }
            }

            trace!(step = step, masked = masked.len(), p_remask = p_remask; "refinement step");
        }

        Ok(seq)
    }

    /// Picks the token of a masked position.
    ///
    /// The probabilities are divided by the temperature, `MASK` loses all of its
    /// mass and what remains is renormalized. Then only the `top_k` most probable
    /// tokens are kept and one of them is drawn by inverse CDF against `r`.
    ///
    /// # Arguments
    /// * `logits` - The logits of the position.
    /// * `r` - A uniform draw in `[0, 1)`.
    ///
    /// # Returns
    /// The drawn token, `0` if no token other than `MASK` has any mass.
    pub fn resolve(&self, logits: &[f32], r: f32) -> TokenId {
        let mut probs = softmax(logits);

        if self.temperature > EPSILON {
            for p in probs.iter_mut() {
                *p /= self.temperature;
            }
        }

        if let Some(p) = probs.get_mut(MASK) {
            *p = 0.0;
        }

        let sum: f32 = probs.iter().sum();
        if !(sum >= EPSILON) {
            return FALLBACK;
        }

        for p in probs.iter_mut() {
            *p /= sum;
        }

        let mut candidates = top_k(&probs, self.top_k);
        renormalize(&mut candidates);
        sample_inverse_cdf(&candidates, r)
    }
}
