//! Training vocabularies.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use fnv::FnvHashMap;
use log::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

pub mod huffman;
use huffman::create_binary_tree;

/// Vocabulary entry.
///
/// Besides the word and its frequency, an entry stores the Huffman code
/// of the word and the internal tree nodes on the path to the word. These
/// are the output units used by hierarchical softmax.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VocabEntry {
    word: String,
    count: u64,
    index: usize,
    code: Vec<u8>,
    parents: Vec<usize>,
}

impl VocabEntry {
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Corpus frequency.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Huffman code, one bit per internal node on the path from the root.
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Internal nodes from the root towards this entry.
    pub fn parents(&self) -> &[usize] {
        &self.parents
    }
}

/// Vocabulary with Huffman codes.
///
/// Entries are ordered by descending frequency, the index of an entry is
/// its position in this order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Vocab {
    entries: Vec<VocabEntry>,
    indices: HashMap<String, usize>,
}

impl Vocab {
    /// Construct a vocabulary from words and their counts.
    ///
    /// Words are assigned indices in the given order and should be sorted
    /// by descending count.
    ///
    /// Panics when there are duplicate words.
    pub fn from_counts(counts: impl Into<Vec<(String, u64)>>) -> Self {
        let counts = counts.into();
        let codes = create_binary_tree(&counts.iter().map(|(_, count)| *count).collect::<Vec<_>>());

        let mut indices = HashMap::with_capacity(counts.len());
        let entries = counts
            .into_iter()
            .zip(codes)
            .enumerate()
            .map(|(index, ((word, count), code))| {
                indices.insert(word.clone(), index);
                VocabEntry {
                    word,
                    count,
                    index,
                    code: code.bits,
                    parents: code.parents,
                }
            })
            .collect::<Vec<_>>();

        assert_eq!(
            entries.len(),
            indices.len(),
            "words contained duplicate entries."
        );

        Vocab { entries, indices }
    }

    /// Get the index of a word.
    pub fn idx(&self, word: &str) -> Option<usize> {
        self.indices.get(word).cloned()
    }

    pub fn entry(&self, idx: usize) -> &VocabEntry {
        &self.entries[idx]
    }

    pub fn entries(&self) -> &[VocabEntry] {
        &self.entries
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.word.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of internal nodes of the Huffman tree.
    pub fn n_internal(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    /// Sum of the counts of all entries.
    pub fn n_tokens(&self) -> u64 {
        self.entries.iter().map(VocabEntry::count).sum()
    }

    /// Look up the tokens of a whitespace-separated sentence.
    ///
    /// Tokens that are not in the vocabulary are dropped.
    pub fn nodes(&self, sentence: &str) -> Vec<usize> {
        sentence
            .split_whitespace()
            .filter_map(|word| self.idx(word))
            .collect()
    }
}

/// Incremental vocabulary construction.
///
/// The builder counts words in bounded memory: when the number of
/// distinct words exceeds the maximum size, words that do not exceed a
/// threshold are pruned and the threshold is raised. Counts that were
/// pruned are lost, so with small size bounds the final counts are an
/// approximation that depends on corpus order.
pub struct VocabBuilder {
    counts: FnvHashMap<String, u64>,
    max_size: usize,
    min_count: u64,
    min_reduce: u64,
}

impl VocabBuilder {
    pub fn new(min_count: u64, max_size: usize) -> Self {
        VocabBuilder {
            counts: FnvHashMap::default(),
            max_size,
            min_count,
            min_reduce: 1,
        }
    }

    /// Insert a word or increment its count.
    pub fn add_word(&mut self, word: &str) {
        match self.counts.get_mut(word) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(word.to_owned(), 1);
            }
        }

        if self.counts.len() > self.max_size {
            self.reduce();
        }
    }

    /// Prune words with a count at or below the current threshold.
    pub fn reduce(&mut self) {
        let min_reduce = self.min_reduce;
        self.counts.retain(|_, &mut count| count > min_reduce);
        self.min_reduce += 1;
    }

    /// Number of distinct words currently counted.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, word: &str) -> Option<u64> {
        self.counts.get(word).cloned()
    }

    /// Discard rare words and construct the vocabulary.
    ///
    /// Words are sorted by descending frequency, ties are ordered by the
    /// words themselves.
    pub fn build(self) -> Vocab {
        let min_count = self.min_count;
        let mut counts = self
            .counts
            .into_iter()
            .filter(|(_, count)| *count >= min_count)
            .collect::<Vec<_>>();
        counts.sort_unstable_by(|(w1, c1), (w2, c2)| Reverse(c1).cmp(&Reverse(c2)).then(w1.cmp(w2)));

        Vocab::from_counts(counts)
    }
}

/// Build the vocabulary of a corpus.
///
/// The corpus is read line by line, every line is a sentence of
/// whitespace-separated tokens. Lines that are not valid UTF-8 are
/// skipped, but still counted. Returns the vocabulary and the number of
/// lines in the corpus.
pub fn read_vocab(path: impl AsRef<Path>, config: &Config) -> Result<(Vocab, u64)> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| {
        Error::read_error(format!("Cannot open training file {}", path.display()), e)
    })?;
    let (vocab, n_lines) = read_vocab_from(BufReader::new(f), config)?;

    info!(
        "Vocabulary size: {}, words in training file: {}, lines: {}",
        vocab.len(),
        vocab.n_tokens(),
        n_lines
    );

    Ok((vocab, n_lines))
}

pub(crate) fn read_vocab_from<R>(mut read: R, config: &Config) -> Result<(Vocab, u64)>
where
    R: BufRead,
{
    let mut builder = VocabBuilder::new(config.min_count, config.max_vocab_size);
    let mut n_lines = 0;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n_read = read
            .read_until(b'\n', &mut buf)
            .map_err(|e| Error::read_error("Cannot read line from training file", e))?;
        if n_read == 0 {
            break;
        }

        n_lines += 1;
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(_) => {
                warn!("Skipping line {}: invalid UTF-8", n_lines);
                continue;
            }
        };

        for word in line.split_whitespace() {
            builder.add_word(word);
        }
    }

    Ok((builder.build(), n_lines))
}
