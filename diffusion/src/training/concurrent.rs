use std::sync::mpsc;

use diffusion_core::{SequenceModel, TokenId};
use log::debug;
use ndarray::{Array2, s};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::ThreadPool;

use super::sample_terms;
use crate::{Result, corpus::Corpus, noise::NoiseScheduler, strategy::Strategy};

/// What a batch worker hands back to the aggregator.
#[derive(Debug, Clone)]
pub(crate) struct BatchOutcome {
    pub index: usize,
    /// Loss averaged over the batch's samples.
    pub loss: f32,
    /// One `[L][vocab_size]` error term matrix per sample, in batch order.
    pub rows: Vec<Array2<f32>>,
}

/// The reduction of every batch outcome of an epoch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Aggregate {
    /// Batch losses averaged over the batches.
    pub loss: f32,
    /// `[N * L][vocab_size]` error terms, sample `i` at rows `i * L..(i + 1) * L`.
    pub errors: Array2<f32>,
}

/// Noises, forwards and computes the error terms of every sample of a batch.
///
/// Only reads the model.
fn run_batch<M, R>(
    model: &M,
    scheduler: &NoiseScheduler,
    strategy: Strategy,
    index: usize,
    batch: &[Vec<TokenId>],
    rng: &mut R,
) -> Result<BatchOutcome>
where
    M: SequenceModel + ?Sized,
    R: Rng + ?Sized,
{
    let mut loss = 0.0;
    let mut rows = Vec::with_capacity(batch.len());

    for x0 in batch {
        let xt = strategy.noise(scheduler, x0, rng);
        let terms = sample_terms(model, strategy, x0, &xt)?;
        loss += terms.loss;
        rows.push(terms.errors);
    }

    Ok(BatchOutcome {
        index,
        loss: loss / batch.len().max(1) as f32,
        rows,
    })
}

/// Runs one task per batch on `pool`, at most as many at once as the pool has threads.
///
/// Every task gets its own generator, seeded from `rng` before anything is spawned,
/// so the outcomes don't depend on how the tasks get scheduled. Returns once every
/// task is done.
///
/// # Returns
/// The outcome of every batch in completion order, or the first model error.
pub(crate) fn run_batches<M, R>(
    pool: &ThreadPool,
    model: &M,
    scheduler: &NoiseScheduler,
    strategy: Strategy,
    corpus: &Corpus,
    batch_size: usize,
    rng: &mut R,
) -> Result<Vec<BatchOutcome>>
where
    M: SequenceModel + ?Sized,
    R: Rng + ?Sized,
{
    let num_batches = corpus.num_batches(batch_size);
    let seeds: Vec<u64> = (0..num_batches).map(|_| rng.random()).collect();
    let (tx, rx) = mpsc::sync_channel(num_batches);

    pool.scope(|scope| {
        for ((index, batch), seed) in corpus.batches(batch_size).zip(seeds) {
            let tx = tx.clone();

            scope.spawn(move |_| {
                let mut rng = StdRng::seed_from_u64(seed);
                let outcome = run_batch(model, scheduler, strategy, index, batch, &mut rng);
                debug!(batch = index; "batch finished");

                // The receiver outlives the scope, this can't fail.
                let _ = tx.send(outcome);
            });
        }
    });

    drop(tx);
    rx.into_iter().collect()
}

/// Folds the batch outcomes into the epoch loss and the corpus indexed error terms.
///
/// The rows of sample `j` of batch `b` land at sample `b * batch_size + j`, samples
/// past `samples` are dropped. The result doesn't depend on the order of `outcomes`.
pub(crate) fn aggregate(
    mut outcomes: Vec<BatchOutcome>,
    samples: usize,
    batch_size: usize,
    max_length: usize,
    vocab_size: usize,
) -> Aggregate {
    outcomes.sort_by_key(|o| o.index);

    let loss = outcomes.iter().fold(0.0, |acc, o| acc + o.loss) / outcomes.len().max(1) as f32;
    let mut errors = Array2::zeros((samples * max_length, vocab_size));

    for outcome in &outcomes {
        let start = outcome.index * batch_size;

        for (j, rows) in outcome.rows.iter().enumerate() {
            let sample = start + j;
            if sample >= samples {
                break;
            }

            let at = sample * max_length;
            errors.slice_mut(s![at..at + max_length, ..]).assign(rows);
        }
    }

    Aggregate { loss, errors }
}
