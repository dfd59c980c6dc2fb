//! Model weight matrices.

use ndarray::{Array2, ArrayView1};
use rand::distributions::Uniform;
use rand::Rng;

use crate::util::l2_normalize_array;

/// Weight matrices of a model.
///
/// * `input`: word embeddings, one row per vocabulary entry.
/// * `output`: output weights for negative sampling, one row per
///   vocabulary entry.
/// * `output_hs`: output weights for hierarchical softmax, one row per
///   internal node of the Huffman tree.
/// * `sentences`: paragraph vectors, one row per training sentence.
///
/// The matrices are allocated once per training run and never resized.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightStore {
    pub(crate) input: Array2<f32>,
    pub(crate) output: Array2<f32>,
    pub(crate) output_hs: Array2<f32>,
    pub(crate) sentences: Array2<f32>,
}

impl Default for WeightStore {
    fn default() -> Self {
        WeightStore {
            input: Array2::zeros((0, 0)),
            output: Array2::zeros((0, 0)),
            output_hs: Array2::zeros((0, 0)),
            sentences: Array2::zeros((0, 0)),
        }
    }
}

impl WeightStore {
    /// Allocate the word weight matrices.
    ///
    /// Input weights are drawn from *U(-0.5/dims, 0.5/dims)*, output
    /// weights start at zero. The sentence matrix is empty until
    /// `init_sent_weights` is called.
    pub fn init_net<R>(vocab_len: usize, n_internal: usize, dims: usize, rng: &mut R) -> Self
    where
        R: Rng,
    {
        WeightStore {
            input: random_matrix(vocab_len, dims, rng),
            output: Array2::zeros((vocab_len, dims)),
            output_hs: Array2::zeros((n_internal, dims)),
            sentences: Array2::zeros((0, dims)),
        }
    }

    /// Allocate paragraph vectors for `n_sentences` sentences.
    pub fn init_sent_weights<R>(&mut self, n_sentences: usize, rng: &mut R)
    where
        R: Rng,
    {
        self.sentences = random_matrix(n_sentences, self.dims(), rng);
    }

    pub fn dims(&self) -> usize {
        self.input.ncols()
    }

    /// Word embeddings.
    pub fn input(&self) -> &Array2<f32> {
        &self.input
    }

    /// Negative sampling output weights.
    pub fn output(&self) -> &Array2<f32> {
        &self.output
    }

    /// Hierarchical softmax output weights.
    pub fn output_hs(&self) -> &Array2<f32> {
        &self.output_hs
    }

    /// Paragraph vectors of the training sentences.
    pub fn sentences(&self) -> &Array2<f32> {
        &self.sentences
    }

    pub fn sentence(&self, idx: usize) -> Option<ArrayView1<f32>> {
        if idx < self.sentences.nrows() {
            Some(self.sentences.row(idx))
        } else {
            None
        }
    }

    /// L2-normalize the rows of all matrices.
    pub fn normalize(&mut self) {
        l2_normalize_array(self.input.view_mut());
        l2_normalize_array(self.output.view_mut());
        l2_normalize_array(self.output_hs.view_mut());
        l2_normalize_array(self.sentences.view_mut());
    }
}

pub(crate) fn random_matrix<R>(rows: usize, dims: usize, rng: &mut R) -> Array2<f32>
where
    R: Rng,
{
    let bound = 0.5 / dims as f32;
    let dist = Uniform::new(-bound, bound);
    Array2::from_shape_simple_fn((rows, dims), || rng.sample(dist))
}
