//! Vector lookups and similarity queries.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::convert::TryFrom;
use std::f32;
use std::io::{BufRead, Write};

use itertools::Itertools;
use ndarray::{concatenate, Array1, Axis};
use ordered_float::NotNan;

use crate::config::{LossType, OovPolicy};
use crate::error::{Error, Result};
use crate::model::MonolingualModel;
use crate::subword::CharNGrams;
use crate::train::infer_sentence;
use crate::util::cosine_similarity;

/// Selection of the weights that represent a word.
///
/// Output weights only exist for models trained with negative sampling.
/// For models trained with hierarchical softmax, every policy behaves as
/// `Input`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Policy {
    /// Input weights.
    Input = 0,

    /// Concatenation of the input and output weights.
    Concat = 1,

    /// Sum of the input and output weights.
    Sum = 2,

    /// Output weights.
    Output = 3,
}

impl Default for Policy {
    fn default() -> Self {
        Policy::Input
    }
}

impl TryFrom<u32> for Policy {
    type Error = Error;

    fn try_from(policy: u32) -> Result<Self> {
        match policy {
            0 => Ok(Policy::Input),
            1 => Ok(Policy::Concat),
            2 => Ok(Policy::Sum),
            3 => Ok(Policy::Output),
            _ => Err(Error::Config(format!("Unknown vector policy: {}", policy))),
        }
    }
}

/// A word with its similarity.
///
/// This data structure is used to store a pair consisting of a word and
/// its similarity to a query word.
#[derive(Debug, Eq, PartialEq)]
pub struct WordSimilarityResult<'a> {
    similarity: NotNan<f32>,
    word: &'a str,
}

impl<'a> WordSimilarityResult<'a> {
    /// Get the word's similarity in angular similarity.
    pub fn angular_similarity(&self) -> f32 {
        1f32 - (self.similarity.acos() / f32::consts::PI)
    }

    /// Get the word's similarity in cosine similarity.
    pub fn cosine_similarity(&self) -> f32 {
        *self.similarity
    }

    pub fn word(&self) -> &str {
        self.word
    }
}

impl<'a> Ord for WordSimilarityResult<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.similarity.cmp(&self.similarity) {
            Ordering::Equal => self.word.cmp(other.word),
            ordering => ordering,
        }
    }
}

impl<'a> PartialOrd for WordSimilarityResult<'a> {
    fn partial_cmp(&self, other: &WordSimilarityResult) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl MonolingualModel {
    /// Policy that is in effect for this model.
    fn effective_policy(&self, policy: Policy) -> Policy {
        match self.config.loss {
            LossType::NegativeSampling => policy,
            LossType::HierarchicalSoftmax => Policy::Input,
        }
    }

    /// Length of the vectors returned for `policy`.
    pub fn vec_dims(&self, policy: Policy) -> usize {
        match self.effective_policy(policy) {
            Policy::Concat => 2 * self.dims(),
            _ => self.dims(),
        }
    }

    /// Vector of the vocabulary entry `idx`.
    pub(crate) fn word_vec_idx(&self, idx: usize, policy: Policy) -> Array1<f32> {
        let input = self.weights.input.row(idx);
        match self.effective_policy(policy) {
            Policy::Input => input.to_owned(),
            Policy::Output => self.weights.output.row(idx).to_owned(),
            Policy::Sum => &input + &self.weights.output.row(idx),
            Policy::Concat => concatenate![Axis(0), input, self.weights.output.row(idx)],
        }
    }

    /// Get the vector of a word.
    ///
    /// Returns `None` when the word is not in the vocabulary.
    pub fn word_vec(&self, word: &str, policy: Policy) -> Option<Array1<f32>> {
        self.vocab
            .idx(word)
            .map(|idx| self.word_vec_idx(idx, policy))
    }

    /// Get the vector of a word, falling back to the out-of-vocabulary
    /// policy of the model for unknown words.
    pub fn word_vec_oov(&self, word: &str, policy: Policy) -> Array1<f32> {
        self.lookup(word, policy)
            .unwrap_or_else(|| Array1::zeros(self.vec_dims(policy)))
    }

    /// Known words, or the n-gram vectors of unknown words.
    fn lookup(&self, word: &str, policy: Policy) -> Option<Array1<f32>> {
        self.word_vec(word, policy).or_else(|| match self.config.oov {
            OovPolicy::Zero => None,
            OovPolicy::NGrams => self.ngram_vec(word, policy),
        })
    }

    /// Mean of the vectors of the character n-grams of `word` that are in
    /// the vocabulary.
    fn ngram_vec(&self, word: &str, policy: Policy) -> Option<Array1<f32>> {
        let mut sum = Array1::zeros(self.vec_dims(policy));
        let mut n = 0;

        for ngram in word.char_ngrams(self.config.min_ngram, self.config.max_ngram) {
            if let Some(idx) = self.vocab.idx(&ngram) {
                sum += &self.word_vec_idx(idx, policy);
                n += 1;
            }
        }

        if n == 0 {
            None
        } else {
            Some(sum / n as f32)
        }
    }

    /// Bag-of-words vector of a whitespace-separated sequence.
    ///
    /// This is the mean of the vectors of the tokens of the sequence.
    /// Tokens for which the out-of-vocabulary policy gives no vector are
    /// skipped. Returns a zero vector when no token has a vector.
    pub fn bow(&self, sequence: &str, policy: Policy) -> Array1<f32> {
        let mut sum = Array1::zeros(self.vec_dims(policy));
        let mut n = 0;

        for vec in sequence
            .split_whitespace()
            .filter_map(|word| self.lookup(word, policy))
        {
            sum += &vec;
            n += 1;
        }

        if n > 0 {
            sum /= n as f32;
        }

        sum
    }

    /// Infer the paragraph vector of a sentence.
    ///
    /// A fresh paragraph vector is trained on the sentence for the
    /// configured number of epochs, while the word and output weights
    /// stay fixed. Paragraph vectors only have input weights, so the
    /// policy only determines the length of the returned vector: with
    /// `Concat` the vector is padded with zeros.
    pub fn sent_vec(&self, sentence: &str, policy: Policy) -> Array1<f32> {
        let vec = infer_sentence(
            &self.config,
            &self.vocab,
            &self.table,
            &self.weights,
            sentence,
        );

        match self.vec_dims(policy) - vec.len() {
            0 => vec,
            padding => concatenate![Axis(0), vec, Array1::<f32>::zeros(padding)],
        }
    }

    /// Infer the paragraph vector of every line of `read`.
    ///
    /// Vectors are written one per line, the components separated by a
    /// space.
    pub fn sent_vecs<R, W>(&self, read: R, write: &mut W, policy: Policy) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        for line in read.lines() {
            let line = line.map_err(|e| Error::read_error("Cannot read sentence", e))?;
            let vec = self.sent_vec(&line, policy);
            writeln!(write, "{}", vec.iter().join(" "))
                .map_err(|e| Error::write_error("Cannot write sentence vector", e))?;
        }

        Ok(())
    }

    /// Cosine similarity of two words.
    pub fn similarity(&self, word1: &str, word2: &str, policy: Policy) -> f32 {
        cosine_similarity(
            self.word_vec_oov(word1, policy).view(),
            self.word_vec_oov(word2, policy).view(),
        )
    }

    /// Cosine distance of two words, `1 - similarity`.
    pub fn distance(&self, word1: &str, word2: &str, policy: Policy) -> f32 {
        1. - self.similarity(word1, word2, policy)
    }

    /// Cosine similarity of the bag-of-words vectors of two sequences.
    pub fn similarity_ngrams(&self, seq1: &str, seq2: &str, policy: Policy) -> f32 {
        cosine_similarity(
            self.bow(seq1, policy).view(),
            self.bow(seq2, policy).view(),
        )
    }

    /// Cosine similarity of the inferred paragraph vectors of two
    /// sentences.
    pub fn similarity_sentence(&self, seq1: &str, seq2: &str, policy: Policy) -> f32 {
        cosine_similarity(
            self.sent_vec(seq1, policy).view(),
            self.sent_vec(seq2, policy).view(),
        )
    }

    /// Find the words that are most similar to `word`.
    ///
    /// At most `limit` results are returned, ordered by descending
    /// cosine similarity. Returns `None` when `word` is not in the
    /// vocabulary.
    pub fn most_similar(
        &self,
        word: &str,
        limit: usize,
        policy: Policy,
    ) -> Option<Vec<WordSimilarityResult>> {
        let query_idx = self.vocab.idx(word)?;
        let query = self.word_vec_idx(query_idx, policy);

        let mut results = BinaryHeap::with_capacity(limit);
        for (idx, entry) in self.vocab.entries().iter().enumerate() {
            if idx == query_idx {
                continue;
            }

            let vec = self.word_vec_idx(idx, policy);
            let similarity = match NotNan::new(cosine_similarity(query.view(), vec.view())) {
                Ok(similarity) => similarity,
                Err(_) => continue,
            };

            let word_similarity = WordSimilarityResult {
                word: entry.word(),
                similarity,
            };

            if results.len() < limit {
                results.push(word_similarity);
            } else if let Some(mut peek) = results.peek_mut() {
                if word_similarity < *peek {
                    *peek = word_similarity
                }
            }
        }

        Some(results.into_sorted_vec())
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;
    use std::io::Cursor;

    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2, Array2};

    use super::Policy;
    use crate::config::{Config, LossType, OovPolicy};
    use crate::model::MonolingualModel;
    use crate::sampling::UnigramTable;
    use crate::vocab::Vocab;
    use crate::weights::WeightStore;

    fn test_model(loss: LossType, oov: OovPolicy) -> MonolingualModel {
        let config = Config {
            dims: 3,
            loss,
            oov,
            min_ngram: 2,
            max_ngram: 3,
            epochs: 3,
            unigram_table_size: 100,
            ..Config::default()
        };

        let mut model = MonolingualModel::new(config);
        model.vocab = Vocab::from_counts(vec![
            ("cat".to_owned(), 10),
            ("dog".to_owned(), 8),
            ("car".to_owned(), 5),
            ("at".to_owned(), 2),
        ]);
        model.table = UnigramTable::new(&model.vocab, 100);
        model.weights = WeightStore {
            input: arr2(&[
                [1., 0., 0.],
                [0.9, 0.1, 0.],
                [0., 1., 0.],
                [0., 0., 2.],
            ]),
            output: arr2(&[
                [0., 1., 0.],
                [0., 1., 1.],
                [1., 0., 0.],
                [0., 0., 1.],
            ]),
            output_hs: Array2::zeros((3, 3)),
            sentences: Array2::zeros((0, 3)),
        };

        model
    }

    #[test]
    fn policy_from_integer() {
        assert_eq!(Policy::try_from(0).unwrap(), Policy::Input);
        assert_eq!(Policy::try_from(1).unwrap(), Policy::Concat);
        assert_eq!(Policy::try_from(2).unwrap(), Policy::Sum);
        assert_eq!(Policy::try_from(3).unwrap(), Policy::Output);
        assert!(Policy::try_from(4).is_err());
    }

    #[test]
    fn word_vec_policies() {
        let model = test_model(LossType::NegativeSampling, OovPolicy::Zero);
        assert_eq!(model.word_vec("dog", Policy::Input), Some(arr1(&[0.9, 0.1, 0.])));
        assert_eq!(model.word_vec("dog", Policy::Output), Some(arr1(&[0., 1., 1.])));
        assert_eq!(model.word_vec("dog", Policy::Sum), Some(arr1(&[0.9, 1.1, 1.])));
        assert_eq!(
            model.word_vec("dog", Policy::Concat),
            Some(arr1(&[0.9, 0.1, 0., 0., 1., 1.]))
        );
        assert_eq!(model.word_vec("bird", Policy::Input), None);
    }

    #[test]
    fn hierarchical_softmax_uses_input_weights() {
        let model = test_model(LossType::HierarchicalSoftmax, OovPolicy::Zero);
        for &policy in &[Policy::Input, Policy::Concat, Policy::Sum, Policy::Output] {
            assert_eq!(model.word_vec("car", policy), Some(arr1(&[0., 1., 0.])));
            assert_eq!(model.vec_dims(policy), 3);
        }
    }

    #[test]
    fn oov_zero_policy() {
        let model = test_model(LossType::NegativeSampling, OovPolicy::Zero);
        assert_eq!(model.word_vec_oov("cats", Policy::Input), arr1(&[0., 0., 0.]));
        assert_eq!(model.word_vec_oov("cats", Policy::Concat).len(), 6);
        assert_eq!(model.similarity("cats", "cat", Policy::Input), 0.);
    }

    #[test]
    fn oov_ngram_policy() {
        let model = test_model(LossType::NegativeSampling, OovPolicy::NGrams);

        // 'cats' contains the known n-grams 'cat' and 'at'.
        let vec = model.word_vec_oov("cats", Policy::Input);
        assert_eq!(vec, arr1(&[0.5, 0., 1.]));

        // No n-gram is known.
        assert_eq!(model.word_vec_oov("xyz", Policy::Input), arr1(&[0., 0., 0.]));
    }

    #[test]
    fn bow_averages_known_words() {
        let model = test_model(LossType::NegativeSampling, OovPolicy::Zero);
        assert_eq!(model.bow("cat car bird", Policy::Input), arr1(&[0.5, 0.5, 0.]));
        assert_eq!(model.bow("", Policy::Input), arr1(&[0., 0., 0.]));
        assert_eq!(model.bow("bird", Policy::Input), arr1(&[0., 0., 0.]));
    }

    #[test]
    fn similarity_and_distance() {
        let model = test_model(LossType::NegativeSampling, OovPolicy::Zero);
        assert_eq!(model.similarity("cat", "cat", Policy::Input), 1.);
        assert_eq!(model.distance("dog", "dog", Policy::Input), 0.);
        assert_abs_diff_eq!(model.similarity("cat", "car", Policy::Input), 0.);
        assert_abs_diff_eq!(model.distance("cat", "car", Policy::Input), 1.);

        let sim = model.similarity("cat", "dog", Policy::Input);
        assert_abs_diff_eq!(sim, 0.9 / 0.82f32.sqrt(), epsilon = 1e-6);
        assert_abs_diff_eq!(
            model.similarity("dog", "cat", Policy::Input),
            sim,
            epsilon = 1e-6
        );
    }

    #[test]
    fn similarity_ngrams_of_sequences() {
        let model = test_model(LossType::NegativeSampling, OovPolicy::Zero);
        assert_abs_diff_eq!(
            model.similarity_ngrams("cat car", "car cat", Policy::Input),
            1.,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            model.similarity_ngrams("cat", "at", Policy::Input),
            0.,
            epsilon = 1e-6
        );
        assert_eq!(model.similarity_ngrams("cat", "bird", Policy::Input), 0.);
    }

    #[test]
    fn sentence_vectors_are_deterministic() {
        let model = test_model(LossType::NegativeSampling, OovPolicy::Zero);
        let v1 = model.sent_vec("cat dog car", Policy::Input);
        let v2 = model.sent_vec("cat dog car", Policy::Input);
        assert_eq!(v1, v2);
        assert_eq!(v1.len(), 3);
        assert_eq!(model.sent_vec("cat dog car", Policy::Concat).len(), 6);
        assert_abs_diff_eq!(
            model.similarity_sentence("cat dog car", "cat dog car", Policy::Input),
            1.,
            epsilon = 1e-6
        );
        assert_eq!(
            model.similarity_sentence("bird", "cat", Policy::Input),
            0.
        );
    }

    #[test]
    fn sent_vecs_writes_one_line_per_sentence() {
        let model = test_model(LossType::NegativeSampling, OovPolicy::Zero);
        let mut output = Vec::new();
        model
            .sent_vecs(Cursor::new("cat dog\n\ncar at\n"), &mut output, Policy::Input)
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        for line in lines {
            assert_eq!(line.split(' ').count(), 3);
        }
    }

    #[test]
    fn most_similar_is_ordered() {
        let model = test_model(LossType::NegativeSampling, OovPolicy::Zero);
        let results = model.most_similar("cat", 2, Policy::Input).unwrap();
        let words = results.iter().map(|r| r.word()).collect::<Vec<_>>();
        assert_eq!(words, vec!["dog", "at"]);
        assert!(results[0].cosine_similarity() >= results[1].cosine_similarity());

        assert_eq!(model.most_similar("cat", 10, Policy::Input).unwrap().len(), 3);
        assert!(model.most_similar("bird", 2, Policy::Input).is_none());
    }
}
