use std::{fs, num::NonZeroUsize, path::Path, thread};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{Result, strategy::Strategy};

/// When the concurrent trainer hands its accumulated error terms to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientPolicy {
    /// A single backward call per epoch over every sample's error terms.
    #[default]
    Epoch,
    /// One backward call per batch, issued in batch order once all batches finished.
    Batch,
}

/// Immutable configuration of a diffusion run.
///
/// Out of range values are clamped where they are used, never rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionConfig {
    pub num_timesteps: usize,
    pub max_length: usize,
    pub learning_rate: f32,
    pub epochs: usize,
    pub temperature: f32,
    pub top_k: usize,
    /// Fraction of tokens masked at step `0`.
    pub mask_schedule_start: f32,
    /// Fraction of tokens masked at step `num_timesteps - 1`.
    pub mask_schedule_end: f32,

    pub strategy: Strategy,
    pub batch_size: usize,
    /// Share of the available cores used by the concurrent trainer.
    pub cpu_fraction: f32,
    pub gradient_policy: GradientPolicy,
    /// Epochs between progress reports.
    pub log_interval: usize,
    pub seed: Option<u64>,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            num_timesteps: 10,
            max_length: 16,
            learning_rate: 0.05,
            epochs: 100,
            temperature: 1.0,
            top_k: 5,
            mask_schedule_start: 0.1,
            mask_schedule_end: 0.9,
            strategy: Strategy::default(),
            batch_size: 10,
            cpu_fraction: 0.8,
            gradient_policy: GradientPolicy::default(),
            log_interval: 10,
            seed: None,
        }
    }
}

impl DiffusionConfig {
    /// Parses a configuration from json, missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a json configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Returns the amount of diffusion steps, at least one.
    pub fn timesteps(&self) -> usize {
        self.num_timesteps.max(1)
    }

    /// Returns the batch size of the concurrent trainer, at least one.
    pub fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Returns the epochs between progress reports, at least one.
    pub fn log_interval(&self) -> usize {
        self.log_interval.max(1)
    }

    /// Returns `top_k` clamped into `[1, vocab_size]`.
    pub fn top_k(&self, vocab_size: usize) -> usize {
        self.top_k.clamp(1, vocab_size.max(1))
    }

    /// Returns the amount of workers the concurrent trainer may run at once.
    ///
    /// That is `floor(available_parallelism * cpu_fraction)`, never less than one.
    pub fn worker_count(&self) -> usize {
        let cores = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);

        let workers = (cores as f32 * self.cpu_fraction).floor();
        if workers.is_nan() || workers < 1.0 {
            1
        } else {
            workers as usize
        }
    }

    /// Creates the random number generator for a run, seeded if the config has a seed.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
