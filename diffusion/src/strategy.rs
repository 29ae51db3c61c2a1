use std::f32::consts::PI;

use diffusion_core::{MASK, TokenId};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::noise::NoiseScheduler;

/// A diffusion strategy: a matching trainer and generator pair.
///
/// Each variant selects the noising function, the positions that contribute to
/// the loss, the learning rate schedule and how the generator commits tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Step indexed Bernoulli masking, dense supervision, linear decay. Generates
    /// with greedy denoising passes from a random sequence.
    Basic,
    /// Continuous Bernoulli masking, supervision at masked positions only, cosine
    /// decay, concurrent batched training. Generates by annealed refinement with
    /// `p_remask = (s - 1) / s`.
    #[default]
    Masked,
    /// Exact fraction masking, supervision at masked positions only, linear decay,
    /// shuffled corpus. Generates by annealed refinement with `p_remask = t / T`.
    FractionExact,
}

impl Strategy {
    /// Corrupts a clean sequence the way this strategy trains on.
    ///
    /// # Arguments
    /// * `scheduler` - The noise scheduler of the run.
    /// * `x0` - The clean sequence.
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// The noised sequence, same length as `x0`.
    pub fn noise<R: Rng + ?Sized>(
        &self,
        scheduler: &NoiseScheduler,
        x0: &[TokenId],
        rng: &mut R,
    ) -> Vec<TokenId> {
        match self {
            Strategy::Basic => {
                let t = scheduler.sample_step(rng);
                scheduler.mask_by_step(x0, t, rng)
            }
            Strategy::Masked => {
                let level = rng.random::<f32>();
                scheduler.mask_continuous(x0, level, rng)
            }
            Strategy::FractionExact => {
                let t = scheduler.sample_step(rng);
                scheduler.mask_exact(x0, t, rng)
            }
        }
    }

    /// Returns true if a position holding `noised` in the corrupted sequence
    /// contributes to the loss.
    pub fn supervises(&self, noised: TokenId) -> bool {
        match self {
            Strategy::Basic => true,
            Strategy::Masked | Strategy::FractionExact => noised == MASK,
        }
    }

    /// Learning rate of `epoch` out of `epochs`.
    pub fn learning_rate(&self, base: f32, epoch: usize, epochs: usize) -> f32 {
        let progress = epoch as f32 / epochs.max(1) as f32;

        match self {
            Strategy::Basic | Strategy::FractionExact => base * (1.0 - progress),
            Strategy::Masked => base * (1.0 + (progress * PI).cos()) / 2.0,
        }
    }

    /// The re-masking probability of every refinement step, in iteration order.
    ///
    /// Returns `None` for strategies that don't refine masked sequences.
    pub fn remask_schedule(&self, steps: usize) -> Option<Vec<f32>> {
        match self {
            Strategy::Basic => None,
            Strategy::Masked => Some(
                (1..=steps)
                    .rev()
                    .map(|s| (s - 1) as f32 / s as f32)
                    .collect(),
            ),
            Strategy::FractionExact => Some(
                (0..steps)
                    .rev()
                    .map(|t| t as f32 / steps as f32)
                    .collect(),
            ),
        }
    }

    /// Returns true if this strategy trains with the concurrent batched engine.
    pub fn is_concurrent(&self) -> bool {
        matches!(self, Strategy::Masked)
    }

    /// Returns true if this strategy reshuffles the corpus every epoch.
    pub fn shuffles(&self) -> bool {
        matches!(self, Strategy::FractionExact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_decay() {
        let s = Strategy::Basic;
        assert_eq!(s.learning_rate(1.0, 0, 4), 1.0);
        assert_eq!(s.learning_rate(1.0, 2, 4), 0.5);
        assert_eq!(s.learning_rate(1.0, 3, 4), 0.25);
        assert_eq!(Strategy::FractionExact.learning_rate(0.2, 1, 2), 0.1);
    }

    #[test]
    fn cosine_decay() {
        let s = Strategy::Masked;
        assert!((s.learning_rate(1.0, 0, 4) - 1.0).abs() < 1e-6);
        assert!((s.learning_rate(1.0, 2, 4) - 0.5).abs() < 1e-6);
        assert!(s.learning_rate(1.0, 3, 4) < 0.5);
    }

    #[test]
    fn supervision() {
        assert!(Strategy::Basic.supervises(7));
        assert!(!Strategy::Masked.supervises(7));
        assert!(Strategy::Masked.supervises(MASK));
        assert!(Strategy::FractionExact.supervises(MASK));
    }

    #[test]
    fn remask_schedules_anneal_to_zero() {
        assert_eq!(Strategy::Basic.remask_schedule(3), None);

        let harmonic = Strategy::Masked.remask_schedule(3).unwrap();
        assert_eq!(harmonic.len(), 3);
        assert!((harmonic[0] - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(harmonic[1], 0.5);
        assert_eq!(harmonic[2], 0.0);

        let linear = Strategy::FractionExact.remask_schedule(4).unwrap();
        assert_eq!(linear, [0.75, 0.5, 0.25, 0.0]);
    }
}
