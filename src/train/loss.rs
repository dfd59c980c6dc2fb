//! Output layer updates.

use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;

use crate::config::{Config, LossType};
use crate::hogwild::HogwildArray2;
use crate::sampling::UnigramTable;
use crate::vocab::Vocab;

const EXP_TABLE_SIZE: usize = 1000;

/// Dot products beyond this magnitude saturate the logistic function.
const MAX_EXP: f32 = 6.0;

/// Precomputed logistic function on *[-MAX_EXP, MAX_EXP]*.
pub(crate) struct SigmoidTable {
    table: Vec<f32>,
}

impl SigmoidTable {
    pub fn new() -> Self {
        let table = (0..EXP_TABLE_SIZE)
            .map(|i| {
                let x = (i as f32 / EXP_TABLE_SIZE as f32 * 2.0 - 1.0) * MAX_EXP;
                let e = x.exp();
                e / (e + 1.0)
            })
            .collect();

        SigmoidTable { table }
    }

    /// Approximate the logistic function, `1 / (1 + e^-x)`.
    ///
    /// Returns `None` when `x` is outside *(-MAX_EXP, MAX_EXP)*.
    pub fn sigmoid(&self, x: f32) -> Option<f32> {
        if x <= -MAX_EXP || x >= MAX_EXP {
            return None;
        }

        let idx = ((x + MAX_EXP) * (EXP_TABLE_SIZE as f32 / MAX_EXP / 2.0)) as usize;
        Some(self.table[idx.min(EXP_TABLE_SIZE - 1)])
    }
}

/// Rows of an output weight matrix.
pub(crate) trait OutputRows {
    fn row(&self, idx: usize) -> ArrayView1<f32>;

    /// Add `alpha * v` to row `idx`.
    fn scaled_add_row(&mut self, idx: usize, alpha: f32, v: ArrayView1<f32>);
}

impl<'a> OutputRows for &'a HogwildArray2 {
    fn row(&self, idx: usize) -> ArrayView1<f32> {
        HogwildArray2::row(self, idx)
    }

    fn scaled_add_row(&mut self, idx: usize, alpha: f32, v: ArrayView1<f32>) {
        self.row_mut(idx).scaled_add(alpha, &v);
    }
}

impl<'a> OutputRows for &'a mut Array2<f32> {
    fn row(&self, idx: usize) -> ArrayView1<f32> {
        Array2::row(self, idx)
    }

    fn scaled_add_row(&mut self, idx: usize, alpha: f32, v: ArrayView1<f32>) {
        self.row_mut(idx).scaled_add(alpha, &v);
    }
}

/// Shared references are frozen output layers, updates are discarded.
impl<'a> OutputRows for &'a Array2<f32> {
    fn row(&self, idx: usize) -> ArrayView1<f32> {
        Array2::row(self, idx)
    }

    fn scaled_add_row(&mut self, _idx: usize, _alpha: f32, _v: ArrayView1<f32>) {}
}

/// Output layer of a model.
///
/// Both losses compute the gradient of the hidden representation, which
/// the caller applies to the input side (word or sentence vectors). When
/// `update` is set, the output weights are updated as well.
pub(crate) struct OutputLayer<'a> {
    loss: LossType,
    negatives: usize,
    vocab: &'a Vocab,
    table: &'a UnigramTable,
    sigmoid: SigmoidTable,
}

impl<'a> OutputLayer<'a> {
    pub fn new(config: &Config, vocab: &'a Vocab, table: &'a UnigramTable) -> Self {
        OutputLayer {
            loss: config.loss,
            negatives: config.negative_samples,
            vocab,
            table,
            sigmoid: SigmoidTable::new(),
        }
    }

    /// Update for predicting `target` from `hidden` with the configured loss.
    #[allow(clippy::too_many_arguments)]
    pub fn update<O, R>(
        &self,
        target: usize,
        hidden: ArrayView1<f32>,
        alpha: f32,
        output: O,
        output_hs: O,
        update: bool,
        rng: &mut R,
    ) -> Array1<f32>
    where
        O: OutputRows,
        R: Rng,
    {
        match self.loss {
            LossType::HierarchicalSoftmax => {
                self.hierarchical_update(target, hidden, alpha, output_hs, update)
            }
            LossType::NegativeSampling => {
                self.neg_sampling_update(target, hidden, alpha, output, update, rng)
            }
        }
    }

    /// Hierarchical softmax update.
    ///
    /// Walks the internal nodes from the root to the leaf of `target`. At
    /// every node the logistic regression predicting the branch is
    /// updated; the code bit `0` is the positive label.
    pub fn hierarchical_update<O>(
        &self,
        target: usize,
        hidden: ArrayView1<f32>,
        alpha: f32,
        mut output: O,
        update: bool,
    ) -> Array1<f32>
    where
        O: OutputRows,
    {
        let entry = self.vocab.entry(target);
        let mut error = Array1::zeros(hidden.len());

        for (&node, &bit) in entry.parents().iter().zip(entry.code()) {
            let f = match self.sigmoid.sigmoid(hidden.dot(&output.row(node))) {
                Some(f) => f,
                None => continue,
            };

            let gradient = (1.0 - bit as f32 - f) * alpha;
            error.scaled_add(gradient, &output.row(node));
            if update {
                output.scaled_add_row(node, gradient, hidden);
            }
        }

        error
    }

    /// Negative sampling update.
    ///
    /// One positive example for `target`, followed by the configured
    /// number of negatives from the unigram table. Negatives that cannot
    /// be drawn distinct from the target are skipped.
    pub fn neg_sampling_update<O, R>(
        &self,
        target: usize,
        hidden: ArrayView1<f32>,
        alpha: f32,
        mut output: O,
        update: bool,
        rng: &mut R,
    ) -> Array1<f32>
    where
        O: OutputRows,
        R: Rng,
    {
        let mut error = Array1::zeros(hidden.len());

        for d in 0..=self.negatives {
            let (word, label) = if d == 0 {
                (target, 1.0)
            } else {
                match self.table.sample_excluding(target, rng) {
                    Some(word) => (word, 0.0),
                    None => continue,
                }
            };

            let f = hidden.dot(&output.row(word));
            let gradient = match self.sigmoid.sigmoid(f) {
                Some(f) => (label - f) * alpha,
                None if f > 0.0 => (label - 1.0) * alpha,
                None => label * alpha,
            };

            error.scaled_add(gradient, &output.row(word));
            if update {
                output.scaled_add_row(word, gradient, hidden);
            }
        }

        error
    }
}
