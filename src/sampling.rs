//! Negative sampling.

use rand::Rng;

use crate::vocab::Vocab;

/// Exponent applied to word counts to smooth the unigram distribution.
const POWER: f64 = 0.75;

/// Maximum number of draws when sampling a word other than the target.
const MAX_RETRIES: usize = 10;

/// Table for sampling from the smoothed unigram distribution.
///
/// Each slot holds a vocabulary index, the number of slots that an index
/// occupies is proportional to `count^0.75`. Drawing a uniformly random
/// slot then samples from the smoothed distribution in constant time.
#[derive(Clone, Debug, Default)]
pub struct UnigramTable {
    table: Vec<u32>,
}

impl UnigramTable {
    /// Construct a table with `table_size` slots over the vocabulary.
    pub fn new(vocab: &Vocab, table_size: usize) -> Self {
        if vocab.is_empty() || table_size == 0 {
            return UnigramTable::default();
        }

        let total_pow = vocab
            .entries()
            .iter()
            .map(|entry| (entry.count() as f64).powf(POWER))
            .sum::<f64>();

        let mut table = Vec::with_capacity(table_size);
        let mut cumulative = 0f64;
        for entry in vocab.entries() {
            cumulative += (entry.count() as f64).powf(POWER) / total_pow;
            let upper = ((cumulative * table_size as f64).round() as usize).min(table_size);
            if upper > table.len() {
                table.resize(upper, entry.index() as u32);
            }
        }

        // Rounding may leave the last slots unfilled.
        let last = (vocab.len() - 1) as u32;
        table.resize(table_size, last);

        UnigramTable { table }
    }

    /// Draw a vocabulary index.
    ///
    /// Panics when the table is empty.
    pub fn sample<R>(&self, rng: &mut R) -> usize
    where
        R: Rng,
    {
        self.table[rng.gen_range(0..self.table.len())] as usize
    }

    /// Draw a vocabulary index different from `target`.
    ///
    /// Returns `None` when every draw within the retry bound collided
    /// with the target, e.g. for a vocabulary of one word.
    pub fn sample_excluding<R>(&self, target: usize, rng: &mut R) -> Option<usize>
    where
        R: Rng,
    {
        (0..MAX_RETRIES)
            .map(|_| self.sample(rng))
            .find(|&idx| idx != target)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
