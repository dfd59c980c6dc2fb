//! Training of word and sentence embeddings.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::panic;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use log::{debug, warn};
use ndarray::{Array1, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::config::{Config, ModelType};
use crate::error::{Error, Result};
use crate::hogwild::HogwildArray2;
use crate::sampling::UnigramTable;
use crate::vocab::Vocab;
use crate::weights::{random_matrix, WeightStore};

pub(crate) mod loss;
use loss::OutputLayer;

pub mod partition;
pub use partition::{chunkify, Chunk};

/// Number of words a worker processes between learning rate updates.
const ALPHA_REFRESH_WORDS: u64 = 10_000;

const MIN_ALPHA_FACTOR: f32 = 1e-4;

/// Corpus position counters shared by the training workers.
#[derive(Debug, Default)]
pub struct TrainingCounters {
    training_words: AtomicU64,
    training_lines: AtomicU64,
    words_processed: AtomicU64,
}

impl TrainingCounters {
    pub fn new(training_words: u64, training_lines: u64) -> Self {
        TrainingCounters {
            training_words: AtomicU64::new(training_words),
            training_lines: AtomicU64::new(training_lines),
            words_processed: AtomicU64::new(0),
        }
    }

    /// Number of in-vocabulary tokens in the corpus.
    pub fn training_words(&self) -> u64 {
        self.training_words.load(Ordering::Relaxed)
    }

    /// Number of lines in the corpus.
    pub fn training_lines(&self) -> u64 {
        self.training_lines.load(Ordering::Relaxed)
    }

    /// Number of tokens processed so far, summed over all epochs.
    pub fn words_processed(&self) -> u64 {
        self.words_processed.load(Ordering::Relaxed)
    }

    /// Add to the processed words, returns the new total.
    fn add_processed(&self, n: u64) -> u64 {
        self.words_processed.fetch_add(n, Ordering::Relaxed) + n
    }
}

/// Linearly decaying learning rate.
fn decayed_alpha(learning_rate: f32, processed: u64, total: u64) -> f32 {
    let progress = processed as f64 / (total as f64 + 1.);
    learning_rate * ((1. - progress) as f32).max(MIN_ALPHA_FACTOR)
}

/// Asynchronous trainer.
///
/// The trainer owns the weight matrices for the duration of a training
/// run. Workers share them through `HogwildArray2`, see its documentation
/// for the consistency guarantees.
pub(crate) struct Trainer<'a> {
    config: &'a Config,
    vocab: &'a Vocab,
    layer: OutputLayer<'a>,
    input: HogwildArray2,
    output: HogwildArray2,
    output_hs: HogwildArray2,
    sentences: HogwildArray2,
    counters: TrainingCounters,
}

impl<'a> Trainer<'a> {
    pub fn new(
        config: &'a Config,
        vocab: &'a Vocab,
        table: &'a UnigramTable,
        weights: WeightStore,
        counters: TrainingCounters,
    ) -> Self {
        Trainer {
            config,
            vocab,
            layer: OutputLayer::new(config, vocab, table),
            input: HogwildArray2::new(weights.input),
            output: HogwildArray2::new(weights.output),
            output_hs: HogwildArray2::new(weights.output_hs),
            sentences: HogwildArray2::new(weights.sentences),
            counters,
        }
    }

    /// Release the trained weights and the final counters.
    pub fn into_parts(self) -> (WeightStore, TrainingCounters) {
        let weights = WeightStore {
            input: self.input.into_inner(),
            output: self.output.into_inner(),
            output_hs: self.output_hs.into_inner(),
            sentences: self.sentences.into_inner(),
        };

        (weights, self.counters)
    }

    /// Train on the given chunks of a corpus, one worker thread per chunk.
    ///
    /// Returns when all workers finished. The first worker error is
    /// returned, panics of workers are propagated.
    pub fn train(&self, path: &Path, chunks: &[Chunk]) -> Result<()> {
        thread::scope(|s| {
            let workers = chunks
                .iter()
                .enumerate()
                .map(|(id, chunk)| s.spawn(move || self.train_chunk(path, chunk, id)))
                .collect::<Vec<_>>();

            workers
                .into_iter()
                .map(|worker| worker.join().unwrap_or_else(|e| panic::resume_unwind(e)))
                .collect::<Result<()>>()
        })
    }

    /// Learning rate after `processed` words.
    pub fn alpha(&self, processed: u64) -> f32 {
        decayed_alpha(
            self.config.learning_rate,
            processed,
            self.config.epochs as u64 * self.counters.training_words(),
        )
    }

    /// Run all epochs over a single chunk.
    pub fn train_chunk(&self, path: &Path, chunk: &Chunk, id: usize) -> Result<()> {
        let mut rng = XorShiftRng::seed_from_u64(self.config.seed.wrapping_add(id as u64));

        let f = File::open(path).map_err(|e| {
            Error::read_error(format!("Cannot open training file {}", path.display()), e)
        })?;
        let mut reader = BufReader::new(f);

        let mut alpha = self.alpha(self.counters.words_processed());
        let mut word_count = 0u64;
        let mut last_word_count = 0u64;
        let mut buf = Vec::new();

        for _ in 0..self.config.epochs {
            reader
                .seek(SeekFrom::Start(chunk.start))
                .map_err(|e| Error::read_error("Cannot seek in training file", e))?;

            let mut pos = chunk.start;
            let mut line_idx = chunk.first_line;
            while pos < chunk.end {
                buf.clear();
                let n_read = reader
                    .read_until(b'\n', &mut buf)
                    .map_err(|e| Error::read_error("Cannot read line from training file", e))?;
                if n_read == 0 {
                    break;
                }
                pos += n_read as u64;

                let sent_id = line_idx;
                line_idx += 1;

                let sentence = match std::str::from_utf8(&buf) {
                    Ok(sentence) => sentence,
                    Err(_) => {
                        warn!("Worker {}: skipping line {}, invalid UTF-8", id, sent_id);
                        continue;
                    }
                };

                word_count += self.train_sentence(sentence, sent_id, alpha, &mut rng);

                if word_count - last_word_count > ALPHA_REFRESH_WORDS {
                    let processed = self.counters.add_processed(word_count - last_word_count);
                    last_word_count = word_count;
                    alpha = self.alpha(processed);

                    debug!(
                        "Worker {}: alpha: {:.6}, progress: {:.2}%",
                        id,
                        alpha,
                        processed as f64 * 100.
                            / (self.config.epochs as f64 * self.counters.training_words() as f64
                                + 1.)
                    );
                }
            }
        }

        self.counters.add_processed(word_count - last_word_count);

        Ok(())
    }

    /// Train on a sentence.
    ///
    /// Returns the number of in-vocabulary words of the sentence before
    /// subsampling.
    pub fn train_sentence<R>(&self, sentence: &str, sent_id: usize, alpha: f32, rng: &mut R) -> u64
    where
        R: Rng,
    {
        let nodes = self.vocab.nodes(sentence);
        let n_words = nodes.len() as u64;

        let sent = if sent_id < self.sentences.nrows() {
            Some(sent_id)
        } else {
            None
        };

        let nodes = self.subsample(nodes, rng);
        for pos in 0..nodes.len() {
            self.train_word(&nodes, pos, sent, alpha, rng);
        }

        n_words
    }

    /// Randomly discard frequent words.
    ///
    /// A word with count `f` is kept with probability
    /// `(sqrt(f / (t * T)) + 1) * (t * T) / f`, where `t` is the
    /// subsampling threshold and `T` the number of training words.
    pub fn subsample<R>(&self, nodes: Vec<usize>, rng: &mut R) -> Vec<usize>
    where
        R: Rng,
    {
        if self.config.subsampling <= 0. {
            return nodes;
        }

        let threshold = self.config.subsampling as f64 * self.counters.training_words() as f64;
        nodes
            .into_iter()
            .filter(|&idx| {
                let f = self.vocab.entry(idx).count() as f64;
                let p = ((f / threshold).sqrt() + 1.) * threshold / f;
                p >= rng.gen::<f64>()
            })
            .collect()
    }

    fn train_word<R>(&self, nodes: &[usize], pos: usize, sent: Option<usize>, alpha: f32, rng: &mut R)
    where
        R: Rng,
    {
        match self.config.model {
            ModelType::Cbow => self.train_word_cbow(nodes, pos, sent, alpha, rng),
            ModelType::SkipGram => self.train_word_skipgram(nodes, pos, sent, alpha, rng),
        }
    }

    /// Predict the word at `pos` from its context.
    fn train_word_cbow<R>(
        &self,
        nodes: &[usize],
        pos: usize,
        sent: Option<usize>,
        alpha: f32,
        rng: &mut R,
    ) where
        R: Rng,
    {
        let context = context_words(nodes, pos, self.config.window_size, rng);
        let n_inputs = context.len() + sent.is_some() as usize;
        if n_inputs == 0 {
            return;
        }

        let mut hidden = Array1::zeros(self.input.ncols());
        for &word in &context {
            hidden += &self.input.row(word);
        }
        if let Some(sent) = sent {
            hidden += &self.sentences.row(sent);
        }
        hidden /= n_inputs as f32;

        let error = self.layer.update(
            nodes[pos],
            hidden.view(),
            alpha,
            &self.output,
            &self.output_hs,
            true,
            rng,
        );

        for &word in &context {
            self.input.row_mut(word).scaled_add(1., &error);
        }
        if let Some(sent) = sent {
            self.sentences.row_mut(sent).scaled_add(1., &error);
        }
    }

    /// Predict the context of the word at `pos` from the word.
    fn train_word_skipgram<R>(
        &self,
        nodes: &[usize],
        pos: usize,
        sent: Option<usize>,
        alpha: f32,
        rng: &mut R,
    ) where
        R: Rng,
    {
        let target = nodes[pos];

        for word in context_words(nodes, pos, self.config.window_size, rng) {
            let error = self.update(word, self.input.row(target), alpha, rng);
            self.input.row_mut(target).scaled_add(1., &error);
        }

        if let Some(sent) = sent {
            let error = self.update(target, self.sentences.row(sent), alpha, rng);
            self.sentences.row_mut(sent).scaled_add(1., &error);
        }
    }

    fn update<R>(&self, target: usize, hidden: ArrayView1<f32>, alpha: f32, rng: &mut R) -> Array1<f32>
    where
        R: Rng,
    {
        self.layer
            .update(target, hidden, alpha, &self.output, &self.output_hs, true, rng)
    }
}

/// Words in a randomly shrunk window around `pos`.
fn context_words<R>(nodes: &[usize], pos: usize, window_size: usize, rng: &mut R) -> Vec<usize>
where
    R: Rng,
{
    let b = rng.gen_range(1..=window_size);
    let start = pos.saturating_sub(b);
    let end = (pos + b + 1).min(nodes.len());

    (start..end)
        .filter(|&c| c != pos)
        .map(|c| nodes[c])
        .collect()
}

/// Infer the paragraph vector of an unseen sentence.
///
/// A fresh sentence vector is trained against the fixed word and output
/// weights. The learning rate decays linearly over the epochs. Returns a
/// zero vector when the sentence has no in-vocabulary words.
pub(crate) fn infer_sentence(
    config: &Config,
    vocab: &Vocab,
    table: &UnigramTable,
    weights: &WeightStore,
    sentence: &str,
) -> Array1<f32> {
    let dims = weights.dims();
    let nodes = vocab.nodes(sentence);
    if nodes.is_empty() {
        return Array1::zeros(dims);
    }

    let layer = OutputLayer::new(config, vocab, table);
    let mut rng = XorShiftRng::seed_from_u64(config.seed);
    let mut sent = random_matrix(1, dims, &mut rng).row(0).to_owned();

    for epoch in 0..config.epochs {
        let alpha = decayed_alpha(config.learning_rate, epoch as u64, config.epochs as u64);

        for pos in 0..nodes.len() {
            let error = match config.model {
                ModelType::Cbow => {
                    let context = context_words(&nodes, pos, config.window_size, &mut rng);
                    let mut hidden = sent.clone();
                    for &word in &context {
                        hidden += &weights.input.row(word);
                    }
                    hidden /= (context.len() + 1) as f32;

                    layer.update(
                        nodes[pos],
                        hidden.view(),
                        alpha,
                        &weights.output,
                        &weights.output_hs,
                        false,
                        &mut rng,
                    )
                }
                ModelType::SkipGram => layer.update(
                    nodes[pos],
                    sent.view(),
                    alpha,
                    &weights.output,
                    &weights.output_hs,
                    false,
                    &mut rng,
                ),
            };

            sent += &error;
        }
    }

    sent
}
