//! Training configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Training objective.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Predict a word from the average of its context.
    Cbow,

    /// Predict each context word from the focus word.
    SkipGram,
}

/// Output layer approximation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    /// Hierarchical softmax over the Huffman tree of the vocabulary.
    HierarchicalSoftmax,

    /// Logistic loss with negatives drawn from the unigram table.
    NegativeSampling,
}

/// Vector returned for out-of-vocabulary words.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OovPolicy {
    /// The zero vector.
    Zero,

    /// The mean of the vectors of known words that are character
    /// n-grams of the unknown word.
    NGrams,
}

/// Model and training hyperparameters.
///
/// The configuration is fixed when a model is constructed. It is
/// serialized to TOML in model snapshots.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Embedding dimensionality.
    pub dims: usize,

    /// Maximum number of context words on each side of the focus word.
    pub window_size: usize,

    pub model: ModelType,

    pub loss: LossType,

    /// Number of negatives per positive example.
    pub negative_samples: usize,

    /// Subsampling threshold, `0` disables subsampling.
    pub subsampling: f32,

    /// Words occurring fewer times are discarded.
    pub min_count: u64,

    pub epochs: usize,

    pub threads: usize,

    /// Initial learning rate.
    pub learning_rate: f32,

    /// Train a paragraph vector for every line of the corpus.
    pub sentence_vectors: bool,

    pub oov: OovPolicy,

    /// Minimum n-gram length of the n-gram OOV policy.
    pub min_ngram: usize,

    /// Maximum n-gram length of the n-gram OOV policy.
    pub max_ngram: usize,

    /// Number of distinct words after which rare words are pruned while
    /// counting.
    pub max_vocab_size: usize,

    pub unigram_table_size: usize,

    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dims: 100,
            window_size: 5,
            model: ModelType::Cbow,
            loss: LossType::NegativeSampling,
            negative_samples: 5,
            subsampling: 1e-3,
            min_count: 5,
            epochs: 5,
            threads: 4,
            learning_rate: 0.05,
            sentence_vectors: false,
            oov: OovPolicy::Zero,
            min_ngram: 3,
            max_ngram: 6,
            max_vocab_size: 21_000_000,
            unigram_table_size: 100_000_000,
            seed: 1,
        }
    }
}

impl Config {
    /// Read a configuration from TOML.
    ///
    /// Options that are not present get their default values.
    pub fn from_toml(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Config(format!("Cannot parse TOML: {}", e)))
    }

    /// Check that the hyperparameters can be used for training.
    pub fn validate(&self) -> Result<()> {
        if self.dims == 0 {
            return Err(Error::Config("dimensionality must be at least 1".into()));
        }

        if self.window_size == 0 {
            return Err(Error::Config("window size must be at least 1".into()));
        }

        if self.threads == 0 {
            return Err(Error::Config("thread count must be at least 1".into()));
        }

        if self.epochs == 0 {
            return Err(Error::Config("epoch count must be at least 1".into()));
        }

        if self.learning_rate.is_nan() || self.learning_rate <= 0. {
            return Err(Error::Config(format!(
                "learning rate must be positive, was {}",
                self.learning_rate
            )));
        }

        if self.subsampling < 0. {
            return Err(Error::Config(format!(
                "subsampling threshold must not be negative, was {}",
                self.subsampling
            )));
        }

        if self.loss == LossType::NegativeSampling {
            if self.negative_samples == 0 {
                return Err(Error::Config(
                    "negative sampling requires at least one negative".into(),
                ));
            }

            if self.unigram_table_size == 0 {
                return Err(Error::Config("unigram table cannot be empty".into()));
            }
        }

        if self.min_ngram == 0 || self.min_ngram > self.max_ngram {
            return Err(Error::Config(format!(
                "invalid n-gram range [{}, {}]",
                self.min_ngram, self.max_ngram
            )));
        }

        if self.max_vocab_size == 0 {
            return Err(Error::Config("maximum vocabulary size must be at least 1".into()));
        }

        Ok(())
    }
}
