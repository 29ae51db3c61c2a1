use diffusion_core::{MlError, SequenceModel};
use ndarray::{Array2, ArrayView2, Axis};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;

/// A table of logits, one row per position of a fixed length sequence.
///
/// The logits don't depend on the input tokens, which makes it a unigram model
/// per position. Enough to learn the token distribution of every slot in a
/// corpus of short sentences.
#[derive(Debug, Clone)]
pub struct PositionalModel {
    table: Array2<f32>,
}

impl PositionalModel {
    /// Creates a new `PositionalModel` with every logit drawn from `[-scale, scale)`.
    ///
    /// # Arguments
    /// * `max_length` - The length of the sequences it answers for.
    /// * `vocab_size` - The size of the vocabulary.
    /// * `scale` - The half width of the initialization range.
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// An error if `scale` is not positive.
    pub fn new<R: Rng + ?Sized>(
        max_length: usize,
        vocab_size: usize,
        scale: f32,
        rng: &mut R,
    ) -> Result<Self, MlError> {
        let uniform = Uniform::new(-scale, scale)
            .map_err(|_| MlError::InvalidInput("initialization scale must be positive"))?;

        Ok(Self {
            table: Array2::random_using((max_length, vocab_size), uniform, rng),
        })
    }

    /// Creates a new `PositionalModel` from an existing table.
    pub fn from_table(table: Array2<f32>) -> Self {
        Self { table }
    }

    pub fn max_length(&self) -> usize {
        self.table.nrows()
    }

    pub fn table(&self) -> ArrayView2<'_, f32> {
        self.table.view()
    }
}

impl SequenceModel for PositionalModel {
    fn vocab_size(&self) -> usize {
        self.table.ncols()
    }

    fn forward(&self, one_hot: ArrayView2<'_, f32>) -> Result<Array2<f32>, MlError> {
        if one_hot.ncols() != self.vocab_size() {
            return Err(MlError::ShapeMismatch {
                what: "one-hot columns",
                got: one_hot.ncols(),
                expected: self.vocab_size(),
            });
        }

        if one_hot.nrows() != self.max_length() {
            return Err(MlError::ShapeMismatch {
                what: "positions",
                got: one_hot.nrows(),
                expected: self.max_length(),
            });
        }

        Ok(self.table.clone())
    }

    /// The error terms of every sample are averaged position-wise and the table
    /// takes a step against them.
    fn backward(&mut self, errors: ArrayView2<'_, f32>, learning_rate: f32) -> Result<(), MlError> {
        let max_length = self.max_length();

        if errors.ncols() != self.vocab_size() {
            return Err(MlError::ShapeMismatch {
                what: "error term columns",
                got: errors.ncols(),
                expected: self.vocab_size(),
            });
        }

        if max_length == 0 || errors.nrows() % max_length != 0 {
            return Err(MlError::PartialSample {
                rows: errors.nrows(),
                max_length,
            });
        }

        let samples = errors.nrows() / max_length;
        if samples == 0 {
            return Ok(());
        }

        let mut grad = Array2::<f32>::zeros(self.table.raw_dim());
        for sample in errors.axis_chunks_iter(Axis(0), max_length) {
            grad += &sample;
        }

        self.table.scaled_add(-learning_rate / samples as f32, &grad);

        Ok(())
    }
}
