//! Monolingual embedding models.

use std::convert::TryInto;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use log::info;
use ndarray::{Array1, Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::chunks::io::{ChunkIdentifier, Header, ReadChunk, WriteChunk};
use crate::chunks::metadata::{Metadata, TrainingStats};
use crate::chunks::storage::NdArray;
use crate::compat::text::{WriteSentenceVectors, WriteTextDims};
use crate::compat::word2vec::WriteWord2Vec;
use crate::config::{Config, LossType};
use crate::error::{Error, Result};
use crate::io::{ReadModel, WriteModel};
use crate::sampling::UnigramTable;
use crate::similarity::Policy;
use crate::train::loss::OutputLayer;
use crate::train::{chunkify, Trainer, TrainingCounters};
use crate::vocab::{read_vocab, Vocab};
use crate::weights::WeightStore;

const SNAPSHOT_CHUNKS: [ChunkIdentifier; 6] = [
    ChunkIdentifier::Metadata,
    ChunkIdentifier::CountedVocab,
    ChunkIdentifier::NdArray,
    ChunkIdentifier::NdArray,
    ChunkIdentifier::NdArray,
    ChunkIdentifier::NdArray,
];

/// Word and paragraph embedding model.
///
/// A model is constructed from a configuration and trained on a corpus
/// with `train`. Every line of the corpus is a sentence of
/// whitespace-separated tokens.
#[derive(Clone, Debug)]
pub struct MonolingualModel {
    pub(crate) config: Config,
    pub(crate) vocab: Vocab,
    pub(crate) table: UnigramTable,
    pub(crate) weights: WeightStore,
    training_words: u64,
    training_lines: u64,
    words_processed: u64,
}

impl Default for MonolingualModel {
    fn default() -> Self {
        MonolingualModel::new(Config::default())
    }
}

impl MonolingualModel {
    /// Construct an untrained model.
    pub fn new(config: Config) -> Self {
        MonolingualModel {
            config,
            vocab: Vocab::default(),
            table: UnigramTable::default(),
            weights: WeightStore::default(),
            training_words: 0,
            training_lines: 0,
            words_processed: 0,
        }
    }

    /// Train the model on a corpus.
    ///
    /// Training replaces the vocabulary and all weights of the model. The
    /// model is only modified when training succeeds: configuration
    /// errors, I/O errors and degenerate corpora leave it untouched.
    pub fn train(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.config.validate()?;

        let (vocab, training_lines) = read_vocab(path, &self.config)?;
        if vocab.len() < 2 {
            return Err(Error::DegenerateCorpus(format!(
                "the vocabulary has {} word(s) with a count of at least {}, at least 2 are required",
                vocab.len(),
                self.config.min_count
            )));
        }

        let table = match self.config.loss {
            LossType::NegativeSampling => {
                UnigramTable::new(&vocab, self.config.unigram_table_size)
            }
            LossType::HierarchicalSoftmax => UnigramTable::default(),
        };

        let chunks = chunkify(path, self.config.threads)?;
        info!(
            "Training on {} chunks, sizes: {:?}",
            chunks.len(),
            chunks.iter().map(|c| c.len()).collect::<Vec<_>>()
        );

        let mut rng = XorShiftRng::seed_from_u64(self.config.seed);
        let mut weights =
            WeightStore::init_net(vocab.len(), vocab.n_internal(), self.config.dims, &mut rng);
        if self.config.sentence_vectors {
            let n_sentences = training_lines.try_into().map_err(|_| Error::Overflow)?;
            weights.init_sent_weights(n_sentences, &mut rng);
        }

        let counters = TrainingCounters::new(vocab.n_tokens(), training_lines);
        let trainer = Trainer::new(&self.config, &vocab, &table, weights, counters);
        trainer.train(path, &chunks)?;
        let (weights, counters) = trainer.into_parts();

        info!(
            "Training finished, processed {} words",
            counters.words_processed()
        );

        self.training_words = counters.training_words();
        self.training_lines = counters.training_lines();
        self.words_processed = counters.words_processed();
        self.vocab = vocab;
        self.table = table;
        self.weights = weights;

        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn weights(&self) -> &WeightStore {
        &self.weights
    }

    /// Embedding dimensionality of the trained weights.
    pub fn dims(&self) -> usize {
        self.weights.dims()
    }

    /// Number of in-vocabulary tokens of the training corpus.
    pub fn training_words(&self) -> u64 {
        self.training_words
    }

    /// Number of lines of the training corpus.
    pub fn training_lines(&self) -> u64 {
        self.training_lines
    }

    /// Number of tokens processed during training, summed over epochs.
    pub fn words_processed(&self) -> u64 {
        self.words_processed
    }

    /// L2-normalize the rows of all weight matrices.
    pub fn normalize_weights(&mut self) {
        self.weights.normalize();
    }

    /// Mutable access to the internals of the model.
    ///
    /// This is used by models that train on top of a monolingual model,
    /// such as models that align the embeddings of two languages.
    pub fn internals(&mut self) -> ModelInternals<'_> {
        let MonolingualModel {
            config,
            vocab,
            table,
            weights,
            ..
        } = self;
        let (config, vocab, table): (&Config, &Vocab, &UnigramTable) = (config, vocab, table);

        ModelInternals {
            config,
            vocab,
            table,
            layer: OutputLayer::new(config, vocab, table),
            weights,
        }
    }

    /// Save the model snapshot to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let f = File::create(path).map_err(|e| {
            Error::write_error(format!("Cannot create model file {}", path.display()), e)
        })?;
        let mut writer = BufWriter::new(f);
        self.write_model(&mut writer)?;
        writer
            .flush()
            .map_err(|e| Error::write_error("Cannot flush model file", e))
    }

    /// Load a model snapshot from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            Error::read_error(format!("Cannot open model file {}", path.display()), e)
        })?;
        Self::read_model(&mut BufReader::new(f))
    }

    /// Save the word embeddings in the word2vec binary format.
    pub fn save_vectors_bin(&self, path: impl AsRef<Path>, policy: Policy) -> Result<()> {
        let mut writer = create_output(path.as_ref())?;
        self.write_word2vec_binary(&mut writer, policy)?;
        writer
            .flush()
            .map_err(|e| Error::write_error("Cannot flush embedding file", e))
    }

    /// Save the word embeddings in the word2vec text format.
    pub fn save_vectors(&self, path: impl AsRef<Path>, policy: Policy) -> Result<()> {
        let mut writer = create_output(path.as_ref())?;
        self.write_text_dims(&mut writer, policy)?;
        writer
            .flush()
            .map_err(|e| Error::write_error("Cannot flush embedding file", e))
    }

    /// Save the paragraph vectors of the training sentences in the
    /// word2vec text format.
    pub fn save_sent_vectors(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = create_output(path.as_ref())?;
        self.write_sentence_vectors(&mut writer)?;
        writer
            .flush()
            .map_err(|e| Error::write_error("Cannot flush embedding file", e))
    }

    fn metadata(&self) -> Result<Metadata> {
        Metadata::from_model(
            &self.config,
            TrainingStats {
                training_words: self.training_words,
                training_lines: self.training_lines,
                words_processed: self.words_processed,
            },
        )
    }
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    let f = File::create(path).map_err(|e| {
        Error::write_error(format!("Cannot create embedding file {}", path.display()), e)
    })?;
    Ok(BufWriter::new(f))
}

impl ReadModel for MonolingualModel {
    fn read_model<R>(read: &mut R) -> Result<Self>
    where
        R: Read + Seek,
    {
        let header = Header::read_chunk(read)?;
        if header.chunk_identifiers() != SNAPSHOT_CHUNKS {
            return Err(Error::Format(format!(
                "Unexpected chunks in model file: {:?}",
                header.chunk_identifiers()
            )));
        }

        let metadata = Metadata::read_chunk(read)?;
        let config = metadata.config()?;
        let stats = metadata.training_stats()?;

        let vocab = Vocab::read_chunk(read)?;
        let input: Array2<f32> = NdArray::read_chunk(read)?.into();
        let output: Array2<f32> = NdArray::read_chunk(read)?.into();
        let output_hs: Array2<f32> = NdArray::read_chunk(read)?.into();
        let sentences: Array2<f32> = NdArray::read_chunk(read)?.into();

        let dims = input.ncols();
        if input.nrows() != vocab.len()
            || output.nrows() != vocab.len()
            || output_hs.nrows() != vocab.n_internal()
            || [&output, &output_hs, &sentences]
                .iter()
                .any(|m| m.ncols() != dims)
        {
            return Err(Error::Format(
                "Weight matrix shapes do not match the vocabulary".to_owned(),
            ));
        }

        let table = match config.loss {
            LossType::NegativeSampling if !vocab.is_empty() => {
                UnigramTable::new(&vocab, config.unigram_table_size)
            }
            _ => UnigramTable::default(),
        };

        Ok(MonolingualModel {
            training_words: stats.training_words,
            training_lines: stats.training_lines,
            words_processed: stats.words_processed,
            config,
            vocab,
            table,
            weights: WeightStore {
                input,
                output,
                output_hs,
                sentences,
            },
        })
    }
}

impl WriteModel for MonolingualModel {
    fn write_model<W>(&self, write: &mut W) -> Result<()>
    where
        W: Write + Seek,
    {
        let header = Header::new(SNAPSHOT_CHUNKS.to_vec());
        header.write_chunk(write)?;
        self.metadata()?.write_chunk(write)?;
        self.vocab.write_chunk(write)?;

        for matrix in &[
            &self.weights.input,
            &self.weights.output,
            &self.weights.output_hs,
            &self.weights.sentences,
        ] {
            NdArray::write_ndarray_chunk(matrix.view(), write)?;
        }

        Ok(())
    }
}

/// Borrowed internals of a model.
///
/// Gives access to the vocabulary, the unigram table and the weights, and
/// applies output layer updates to the weights of the model.
pub struct ModelInternals<'a> {
    config: &'a Config,
    vocab: &'a Vocab,
    table: &'a UnigramTable,
    layer: OutputLayer<'a>,
    weights: &'a mut WeightStore,
}

impl<'a> ModelInternals<'a> {
    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn vocab(&self) -> &Vocab {
        self.vocab
    }

    pub fn unigram_table(&self) -> &UnigramTable {
        self.table
    }

    pub fn weights(&self) -> &WeightStore {
        self.weights
    }

    /// Word embeddings, one row per vocabulary entry.
    pub fn input_mut(&mut self) -> &mut Array2<f32> {
        &mut self.weights.input
    }

    /// Paragraph vectors, one row per training sentence.
    pub fn sentences_mut(&mut self) -> &mut Array2<f32> {
        &mut self.weights.sentences
    }

    /// Hierarchical softmax update for predicting word `target` from
    /// `hidden`.
    ///
    /// Returns the gradient of `hidden`. The output weights are updated
    /// when `update` is set.
    pub fn hierarchical_update(
        &mut self,
        target: usize,
        hidden: ArrayView1<f32>,
        alpha: f32,
        update: bool,
    ) -> Array1<f32> {
        self.layer
            .hierarchical_update(target, hidden, alpha, &mut self.weights.output_hs, update)
    }

    /// Negative sampling update for predicting word `target` from
    /// `hidden`.
    ///
    /// Returns the gradient of `hidden`. The output weights are updated
    /// when `update` is set.
    pub fn neg_sampling_update<R>(
        &mut self,
        target: usize,
        hidden: ArrayView1<f32>,
        alpha: f32,
        update: bool,
        rng: &mut R,
    ) -> Array1<f32>
    where
        R: Rng,
    {
        self.layer
            .neg_sampling_update(target, hidden, alpha, &mut self.weights.output, update, rng)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Seek, SeekFrom};

    use ndarray::arr1;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    use super::MonolingualModel;
    use crate::config::{Config, LossType};
    use crate::error::Error;
    use crate::io::{ReadModel, WriteModel};
    use crate::vocab::Vocab;
    use crate::weights::WeightStore;

    fn test_model(loss: LossType) -> MonolingualModel {
        let config = Config {
            dims: 4,
            loss,
            unigram_table_size: 100,
            ..Config::default()
        };
        let mut model = MonolingualModel::new(config);
        model.vocab = Vocab::from_counts(vec![
            ("a".to_owned(), 4),
            ("b".to_owned(), 2),
            ("c".to_owned(), 1),
        ]);

        let mut rng = XorShiftRng::seed_from_u64(1);
        model.weights = WeightStore::init_net(3, 2, 4, &mut rng);
        model.weights.init_sent_weights(2, &mut rng);
        model
    }

    #[test]
    fn write_read_roundtrip() {
        let check_model = test_model(LossType::NegativeSampling);
        let mut cursor = Cursor::new(Vec::new());
        check_model.write_model(&mut cursor).unwrap();
        cursor.seek(SeekFrom::Start(0)).unwrap();
        let model = MonolingualModel::read_model(&mut cursor).unwrap();

        assert_eq!(model.config(), check_model.config());
        assert_eq!(model.vocab(), check_model.vocab());
        assert_eq!(model.weights(), check_model.weights());
        assert_eq!(model.table.len(), 100);
    }

    #[test]
    fn untrained_model_roundtrip() {
        let check_model = MonolingualModel::default();
        let mut cursor = Cursor::new(Vec::new());
        check_model.write_model(&mut cursor).unwrap();
        cursor.seek(SeekFrom::Start(0)).unwrap();
        let model = MonolingualModel::read_model(&mut cursor).unwrap();
        assert!(model.vocab().is_empty());
        assert_eq!(model.training_words(), 0);
    }

    #[test]
    fn snapshot_with_invalid_config_is_rejected() {
        let mut check_model = test_model(LossType::NegativeSampling);
        check_model.config.min_ngram = 0;
        let mut cursor = Cursor::new(Vec::new());
        check_model.write_model(&mut cursor).unwrap();
        cursor.seek(SeekFrom::Start(0)).unwrap();

        match MonolingualModel::read_model(&mut cursor) {
            Err(Error::Format(_)) => (),
            other => panic!("Expected format error, got: {:?}", other),
        }
    }

    #[test]
    fn truncated_snapshot_is_an_error() {
        let check_model = test_model(LossType::HierarchicalSoftmax);
        let mut cursor = Cursor::new(Vec::new());
        check_model.write_model(&mut cursor).unwrap();
        let mut data = cursor.into_inner();
        data.truncate(data.len() - 10);
        assert!(MonolingualModel::read_model(&mut Cursor::new(data)).is_err());
    }

    #[test]
    fn internals_update_model_weights() {
        let mut model = test_model(LossType::HierarchicalSoftmax);
        let check = model.weights().output_hs().clone();

        let hidden = arr1(&[0.5f32, 0.5, -0.5, 1.0]);
        let mut internals = model.internals();
        assert_eq!(internals.vocab().len(), 3);
        internals.hierarchical_update(2, hidden.view(), 0.1, false);
        assert_eq!(internals.weights().output_hs(), &check);
        internals.hierarchical_update(2, hidden.view(), 0.1, true);
        assert_ne!(internals.weights().output_hs(), &check);

        internals.input_mut().fill(0.);
        assert!(model.weights().input().iter().all(|&v| v == 0.));
    }

    #[test]
    fn internals_neg_sampling() {
        let mut model = test_model(LossType::NegativeSampling);
        model.table = crate::sampling::UnigramTable::new(&model.vocab, 100);
        let check = model.weights().output().clone();

        let hidden = arr1(&[0.5f32, 0.5, -0.5, 1.0]);
        let mut rng = XorShiftRng::seed_from_u64(1);
        let mut internals = model.internals();
        let error = internals.neg_sampling_update(0, hidden.view(), 0.1, true, &mut rng);
        assert_eq!(error.len(), 4);
        assert_ne!(internals.weights().output(), &check);
    }
}
