use std::time::{Duration, Instant};

use diffusion_core::{EpochStats, SequenceModel, TokenId, Tokenizer};
use log::info;
use ndarray::Axis;
use rand::{Rng, rngs::StdRng};
use rayon::ThreadPoolBuilder;

use super::{
    concurrent::{Aggregate, aggregate, run_batches},
    sample_terms,
};
use crate::{
    DiffusionConfig, GradientPolicy, Result, corpus::Corpus, noise::NoiseScheduler,
    sampling::Sampler, strategy::Strategy,
};

/// A diffusion `Trainer`. Contains the relevant components needed for training a
/// denoising model and sampling from it, including the model itself.
///
/// The configured `Strategy` picks both the training engine and the generator.
pub struct DiffusionTrainer<M, R>
where
    M: SequenceModel,
    R: Rng,
{
    model: M,
    tokenizer: Tokenizer,
    config: DiffusionConfig,
    scheduler: NoiseScheduler,
    rng: R,
}

impl<M: SequenceModel> DiffusionTrainer<M, StdRng> {
    /// Returns a new `DiffusionTrainer` using the generator described by the config's seed.
    pub fn from_config(model: M, tokenizer: Tokenizer, config: DiffusionConfig) -> Self {
        let rng = config.rng();
        Self::new(model, tokenizer, config, rng)
    }
}

impl<M, R> DiffusionTrainer<M, R>
where
    M: SequenceModel,
    R: Rng,
{
    /// Returns a new `DiffusionTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained, its vocabulary must match the tokenizer's.
    /// * `tokenizer` - Maps text to token ids and back.
    /// * `config` - The run configuration.
    /// * `rng` - The random number generator behind every stochastic operation.
    pub fn new(model: M, tokenizer: Tokenizer, config: DiffusionConfig, rng: R) -> Self {
        let scheduler = NoiseScheduler::new(&config);

        Self {
            model,
            tokenizer,
            config,
            scheduler,
            rng,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn config(&self) -> &DiffusionConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &NoiseScheduler {
        &self.scheduler
    }

    /// Tokenizes `sentences` into a corpus and trains on it.
    pub fn train_sentences<S: AsRef<str>>(&mut self, sentences: &[S]) -> Result<Vec<EpochStats>> {
        let corpus = Corpus::encode(&self.tokenizer, sentences, self.config.max_length);
        self.train(&corpus)
    }

    /// Trains the model for the configured amount of epochs.
    ///
    /// # Arguments
    /// * `corpus` - The clean sequences, fitted to the configured `max_length`.
    ///
    /// # Returns
    /// The statistics of every epoch, or the first error raised by the model.
    pub fn train(&mut self, corpus: &Corpus) -> Result<Vec<EpochStats>> {
        if self.config.strategy.is_concurrent() {
            self.train_concurrent(corpus)
        } else {
            self.train_sequential(corpus)
        }
    }

    /// One sample at a time, updating the model right after each sample.
    fn train_sequential(&mut self, corpus: &Corpus) -> Result<Vec<EpochStats>> {
        let strategy = self.config.strategy;
        let epochs = self.config.epochs;
        let max_length = corpus.max_length().max(1) as f32;
        let mut data = corpus.clone();
        let mut stats = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            let start = Instant::now();
            let lr = strategy.learning_rate(self.config.learning_rate, epoch, epochs);

            if strategy.shuffles() {
                data.shuffle(&mut self.rng);
            }

            let mut total_loss = 0.0;
            for x0 in data.samples() {
                let xt = strategy.noise(&self.scheduler, x0, &mut self.rng);
                let terms = sample_terms(&self.model, strategy, x0, &xt)?;

                total_loss += match strategy {
                    Strategy::Basic => terms.loss / max_length,
                    _ => terms.loss,
                };

                self.model.backward(terms.errors.view(), lr)?;
            }

            let loss = total_loss / data.len().max(1) as f32;
            let epoch_stats = EpochStats::new(epoch, loss, lr, data.len());
            self.report(&epoch_stats, start.elapsed())?;
            stats.push(epoch_stats);
        }

        Ok(stats)
    }

    /// Batches are noised and evaluated concurrently on a bounded worker pool, then
    /// their error terms are folded and handed to the model by this thread alone.
    fn train_concurrent(&mut self, corpus: &Corpus) -> Result<Vec<EpochStats>> {
        let strategy = self.config.strategy;
        let epochs = self.config.epochs;
        let batch_size = self.config.batch_size();
        let max_length = corpus.max_length();
        let vocab_size = self.model.vocab_size();
        let workers = self.config.worker_count();

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("diffusion-worker-{i}"))
            .build()?;

        info!(
            workers = workers,
            batches = corpus.num_batches(batch_size);
            "starting concurrent training"
        );

        let mut stats = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            let start = Instant::now();
            let lr = strategy.learning_rate(self.config.learning_rate, epoch, epochs);

            let outcomes = run_batches(
                &pool,
                &self.model,
                &self.scheduler,
                strategy,
                corpus,
                batch_size,
                &mut self.rng,
            )?;
            let Aggregate { loss, errors } =
                aggregate(outcomes, corpus.len(), batch_size, max_length, vocab_size);

            match self.config.gradient_policy {
                _ if errors.is_empty() => {}
                GradientPolicy::Epoch => self.model.backward(errors.view(), lr)?,
                GradientPolicy::Batch => {
                    for rows in errors.axis_chunks_iter(Axis(0), batch_size * max_length) {
                        self.model.backward(rows, lr)?;
                    }
                }
            }

            let epoch_stats = EpochStats::new(epoch, loss, lr, corpus.len());
            self.report(&epoch_stats, start.elapsed())?;
            stats.push(epoch_stats);
        }

        Ok(stats)
    }

    /// Logs the progress every `log_interval` epochs, along with a monitoring
    /// generation for the concurrent strategy.
    fn report(&mut self, stats: &EpochStats, elapsed: Duration) -> Result<()> {
        if stats.epoch() % self.config.log_interval() != 0 {
            return Ok(());
        }

        info!(
            epoch = stats.epoch(),
            loss = stats.loss(),
            lr = stats.learning_rate(),
            secs = elapsed.as_secs_f32();
            "epoch finished"
        );

        if self.config.strategy.is_concurrent() {
            let sample = self.generate_text()?;
            info!("sample generation: {sample}");
        }

        Ok(())
    }

    /// Generates a sequence with the configured strategy's generator.
    ///
    /// # Returns
    /// `max_length` token ids, none of them `MASK`.
    pub fn generate(&mut self) -> Result<Vec<TokenId>> {
        Sampler::new(&self.model, &self.config).generate(self.config.strategy, &mut self.rng)
    }

    /// Generates a sequence and decodes it into text.
    pub fn generate_text(&mut self) -> Result<String> {
        let ids = self.generate()?;
        Ok(self.tokenizer.decode(&ids))
    }
}
