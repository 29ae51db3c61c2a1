use std::collections::HashMap;

/// A token identifier, an index into the vocabulary.
pub type TokenId = usize;

/// Padding, fills sequences up to their fixed length.
pub const PAD: TokenId = 0;
/// The corruption marker placed by the noising process.
pub const MASK: TokenId = 1;
pub const CLS: TokenId = 2;
pub const SEP: TokenId = 3;

const SPECIALS: [&str; 4] = ["[PAD]", "[MASK]", "[CLS]", "[SEP]"];

/// A closed, word level vocabulary.
///
/// The four special tokens always take the ids `0..4`, every other word gets the
/// next free id in order of first appearance in the corpus it was built from.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    vocab: HashMap<String, TokenId>,
    words: Vec<String>,
}

impl Tokenizer {
    /// Builds the vocabulary of a corpus.
    ///
    /// # Arguments
    /// * `sentences` - The corpus, words are lowercased and split on whitespace.
    ///
    /// # Returns
    /// A new `Tokenizer` instance.
    pub fn from_corpus<I, S>(sentences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokenizer = Self {
            vocab: HashMap::new(),
            words: Vec::new(),
        };

        for special in SPECIALS {
            tokenizer.insert(special);
        }

        for sentence in sentences {
            for word in sentence.as_ref().to_lowercase().split_whitespace() {
                tokenizer.insert(word);
            }
        }

        tokenizer
    }

    fn insert(&mut self, word: &str) {
        if self.vocab.contains_key(word) {
            return;
        }

        self.vocab.insert(word.to_string(), self.words.len());
        self.words.push(word.to_string());
    }

    /// Returns the amount of entries in the vocabulary, special tokens included.
    pub fn vocab_size(&self) -> usize {
        self.words.len()
    }

    /// Returns the id of `word`, if it is part of the vocabulary.
    pub fn id(&self, word: &str) -> Option<TokenId> {
        self.vocab.get(word).copied()
    }

    /// Returns true if `id` is one of the reserved ids.
    pub fn is_special(id: TokenId) -> bool {
        id < SPECIALS.len()
    }

    /// Turns a text into token ids, unknown words map to `PAD`.
    pub fn encode(&self, text: &str) -> Vec<TokenId> {
        text.to_lowercase()
            .split_whitespace()
            .map(|word| self.id(word).unwrap_or(PAD))
            .collect()
    }

    /// Turns token ids back into text, dropping special and unknown ids.
    pub fn decode(&self, ids: &[TokenId]) -> String {
        ids.iter()
            .filter(|&&id| !Self::is_special(id))
            .filter_map(|&id| self.words.get(id))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_tokens_take_the_first_ids() {
        let tokenizer = Tokenizer::from_corpus(["hello world"]);

        assert_eq!(tokenizer.id("[PAD]"), Some(PAD));
        assert_eq!(tokenizer.id("[MASK]"), Some(MASK));
        assert_eq!(tokenizer.id("[CLS]"), Some(CLS));
        assert_eq!(tokenizer.id("[SEP]"), Some(SEP));
        assert_eq!(tokenizer.id("hello"), Some(4));
        assert_eq!(tokenizer.id("world"), Some(5));
        assert_eq!(tokenizer.vocab_size(), 6);
    }

    #[test]
    fn repeated_words_keep_their_first_id() {
        let tokenizer = Tokenizer::from_corpus(["The cat", "the DOG the cat"]);

        assert_eq!(tokenizer.encode("the cat dog"), [4, 5, 6]);
        assert_eq!(tokenizer.vocab_size(), 7);
    }

    #[test]
    fn unknown_words_encode_as_pad() {
        let tokenizer = Tokenizer::from_corpus(["a b"]);
        assert_eq!(tokenizer.encode("a zebra b"), [4, PAD, 5]);
    }

    #[test]
    fn decode_drops_special_and_out_of_range_ids() {
        let tokenizer = Tokenizer::from_corpus(["a b"]);
        assert_eq!(tokenizer.decode(&[CLS, 4, MASK, 5, PAD, 99, SEP]), "a b");
    }

    #[test]
    fn decode_inverts_encode_on_normalized_known_text() {
        let tokenizer = Tokenizer::from_corpus(["the quick brown fox", "jumps over the dog"]);

        for text in ["the quick brown fox", "fox jumps over the quick dog", "the"] {
            assert_eq!(tokenizer.decode(&tokenizer.encode(text)), text);
        }
    }
}
