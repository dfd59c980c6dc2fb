//! Character n-grams of words.

use std::cmp;

/// Iterator over the n-grams of a sequence between a minimum and maximum
/// length.
///
/// **Warning:** no guarantee is provided with regard to the iteration
/// order. The iterator only guarantees that all n-grams are produced.
pub struct NGrams<'a, T>
where
    T: 'a,
{
    max_n: usize,
    min_n: usize,
    seq: &'a [T],
    ngram: &'a [T],
}

impl<'a, T> NGrams<'a, T> {
    /// Create a new n-gram iterator.
    ///
    /// The iterator will create n-grams of length *[min_n, max_n]*
    pub fn new(seq: &'a [T], min_n: usize, max_n: usize) -> Self {
        assert!(min_n != 0, "The minimum n-gram length cannot be zero.");
        assert!(
            min_n <= max_n,
            "The maximum length should be equal to or greater than the minimum length."
        );

        let upper = cmp::min(max_n, seq.len());

        NGrams {
            min_n,
            max_n,
            seq,
            ngram: &seq[..upper],
        }
    }
}

impl<'a, T> Iterator for NGrams<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        if self.ngram.len() < self.min_n {
            if self.seq.len() <= self.min_n {
                return None;
            }

            // Start the n-grams at the next position.
            self.seq = &self.seq[1..];

            let upper = cmp::min(self.max_n, self.seq.len());
            self.ngram = &self.seq[..upper];
        }

        let ngram = self.ngram;

        self.ngram = &self.ngram[..self.ngram.len() - 1];

        Some(ngram)
    }
}

/// Extension trait for extracting character n-grams.
pub trait CharNGrams {
    /// Return the character n-grams of length *[min_n, max_n]*.
    ///
    /// N-grams that occur more than once are returned once for every
    /// occurrence.
    fn char_ngrams(&self, min_n: usize, max_n: usize) -> Vec<String>;
}

impl CharNGrams for str {
    fn char_ngrams(&self, min_n: usize, max_n: usize) -> Vec<String> {
        let chars: Vec<_> = self.chars().collect();
        NGrams::new(&chars, min_n, max_n)
            .map(|ngram| ngram.iter().collect())
            .collect()
    }
}
