#![cfg(test)]

use diffusion_core::{MlError, SequenceModel};
use ndarray::{Array2, ArrayView2};

/// Answers with the same logits at every position.
pub struct UniformModel {
    vocab_size: usize,
}

impl UniformModel {
    pub fn new(vocab_size: usize) -> Self {
        Self { vocab_size }
    }
}

impl SequenceModel for UniformModel {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn forward(&self, one_hot: ArrayView2<'_, f32>) -> Result<Array2<f32>, MlError> {
        Ok(Array2::zeros((one_hot.nrows(), self.vocab_size)))
    }

    fn backward(&mut self, _: ArrayView2<'_, f32>, _: f32) -> Result<(), MlError> {
        Ok(())
    }
}

/// Answers with a fixed logit row at every position of a fixed length sequence.
pub struct FixedModel {
    len: usize,
    row: Vec<f32>,
    vocab_size: usize,
}

impl FixedModel {
    pub fn new(len: usize, row: Vec<f32>) -> Self {
        Self {
            len,
            vocab_size: row.len(),
            row,
        }
    }

    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = vocab_size;
        self
    }
}

impl SequenceModel for FixedModel {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn forward(&self, one_hot: ArrayView2<'_, f32>) -> Result<Array2<f32>, MlError> {
        if one_hot.nrows() != self.len {
            return Err(MlError::ShapeMismatch {
                what: "positions",
                got: one_hot.nrows(),
                expected: self.len,
            });
        }

        let mut logits = Array2::zeros((self.len, self.row.len()));
        for mut r in logits.rows_mut() {
            r.iter_mut().zip(&self.row).for_each(|(l, v)| *l = *v);
        }

        Ok(logits)
    }

    fn backward(&mut self, _: ArrayView2<'_, f32>, _: f32) -> Result<(), MlError> {
        Ok(())
    }
}

/// Uniform logits, remembers every backward call.
#[derive(Default)]
pub struct RecordingModel {
    pub vocab_size: usize,
    pub calls: Vec<(Array2<f32>, f32)>,
    pub fail_forward: bool,
}

impl RecordingModel {
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            ..Default::default()
        }
    }
}

impl SequenceModel for RecordingModel {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn forward(&self, one_hot: ArrayView2<'_, f32>) -> Result<Array2<f32>, MlError> {
        if self.fail_forward {
            return Err(MlError::InvalidInput("forward disabled"));
        }

        Ok(Array2::zeros((one_hot.nrows(), self.vocab_size)))
    }

    fn backward(&mut self, errors: ArrayView2<'_, f32>, learning_rate: f32) -> Result<(), MlError> {
        self.calls.push((errors.to_owned(), learning_rate));
        Ok(())
    }
}

/// Answers with its own one-hot input, so every token is its own argmax.
pub struct EchoModel {
    vocab_size: usize,
}

impl EchoModel {
    pub fn new(vocab_size: usize) -> Self {
        Self { vocab_size }
    }
}

impl SequenceModel for EchoModel {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn forward(&self, one_hot: ArrayView2<'_, f32>) -> Result<Array2<f32>, MlError> {
        Ok(one_hot.to_owned())
    }

    fn backward(&mut self, _: ArrayView2<'_, f32>, _: f32) -> Result<(), MlError> {
        Ok(())
    }
}
