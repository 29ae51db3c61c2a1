use std::{fs, path::Path};

use diffusion_core::{PAD, TokenId, Tokenizer};
use rand::{Rng, seq::SliceRandom};

use crate::Result;

/// A training corpus of fixed-length clean sequences.
///
/// Every sequence is truncated or padded with `PAD` to the same length.
#[derive(Debug, Clone)]
pub struct Corpus {
    samples: Vec<Vec<TokenId>>,
    max_length: usize,
}

impl Corpus {
    /// Creates a new corpus from already tokenized sequences.
    ///
    /// # Arguments
    /// * `sequences` - The token sequences, of any length.
    /// * `max_length` - The length every sequence is fitted to.
    pub fn new<I>(sequences: I, max_length: usize) -> Self
    where
        I: IntoIterator<Item = Vec<TokenId>>,
    {
        let samples = sequences
            .into_iter()
            .map(|seq| fit(seq, max_length))
            .collect();

        Self {
            samples,
            max_length,
        }
    }

    /// Tokenizes and fits a list of sentences.
    pub fn encode<I, S>(tokenizer: &Tokenizer, sentences: I, max_length: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sequences = sentences
            .into_iter()
            .map(|s| tokenizer.encode(s.as_ref()));

        Self::new(sequences, max_length)
    }

    /// Reads a corpus file, one sentence per non-empty line.
    ///
    /// # Returns
    /// The sentences of the file or an io error.
    pub fn read_sentences<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let text = fs::read_to_string(path)?;

        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    #[inline]
    pub fn samples(&self) -> &[Vec<TokenId>] {
        &self.samples
    }

    /// Shuffles the order of the samples.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.samples.shuffle(rng);
    }

    /// Splits the corpus in contiguous batches of `batch_size` samples, the last one
    /// possibly shorter.
    ///
    /// # Panics
    /// If `batch_size` is zero.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = (usize, &[Vec<TokenId>])> {
        self.samples.chunks(batch_size).enumerate()
    }

    /// Returns the amount of batches of `batch_size` samples.
    pub fn num_batches(&self, batch_size: usize) -> usize {
        self.samples.len().div_ceil(batch_size)
    }
}

fn fit(mut seq: Vec<TokenId>, max_length: usize) -> Vec<TokenId> {
    seq.resize(max_length, PAD);
    seq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_padded_and_truncated() {
        let corpus = Corpus::new([vec![4, 5], vec![4, 5, 6, 7, 8]], 4);

        assert_eq!(corpus.samples(), [vec![4, 5, PAD, PAD], vec![4, 5, 6, 7]]);
        assert_eq!(corpus.max_length(), 4);
    }

    #[test]
    fn sentences_are_tokenized() {
        let tokenizer = Tokenizer::from_corpus(["a b c"]);
        let corpus = Corpus::encode(&tokenizer, ["A b", "c unknown a"], 3);

        assert_eq!(corpus.samples(), [vec![4, 5, PAD], vec![6, PAD, 4]]);
    }

    #[test]
    fn batches_cover_the_corpus_in_order() {
        let corpus = Corpus::new((0..5).map(|i| vec![i + 4]), 1);
        let batches: Vec<_> = corpus.batches(2).collect();

        assert_eq!(corpus.num_batches(2), 3);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], (0, &[vec![4], vec![5]][..]));
        assert_eq!(batches[2], (2, &[vec![8]][..]));
    }
}
