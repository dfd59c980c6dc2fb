//! Writers for the word2vec text format.
//!
//! The first line holds the number of vectors and their length. Every
//! following line contains a token followed by the vector components,
//! separated by spaces:
//!
//! *word0 component_1 component_2 ... component_n*

use std::io::Write;

use itertools::Itertools;
use ndarray::ArrayView1;

use crate::error::{Error, Result};
use crate::model::MonolingualModel;
use crate::similarity::Policy;

/// Prefix of the tokens of paragraph vectors, followed by the sentence
/// index.
pub const SENTENCE_TOKEN_PREFIX: &str = "_*";

fn write_record<W>(write: &mut W, token: &str, vec: ArrayView1<f32>) -> Result<()>
where
    W: Write,
{
    writeln!(write, "{} {}", token, vec.iter().join(" "))
        .map_err(|e| Error::write_error("Cannot write embedding", e))
}

/// Method to write word embeddings in word2vec text format.
pub trait WriteTextDims<W>
where
    W: Write,
{
    /// Write the word embeddings to the given writer.
    ///
    /// `policy` selects the weights that represent a word.
    fn write_text_dims(&self, writer: &mut W, policy: Policy) -> Result<()>;
}

impl<W> WriteTextDims<W> for MonolingualModel
where
    W: Write,
{
    fn write_text_dims(&self, write: &mut W, policy: Policy) -> Result<()> {
        writeln!(write, "{} {}", self.vocab().len(), self.vec_dims(policy))
            .map_err(|e| Error::write_error("Cannot write word embedding matrix shape", e))?;

        for (idx, word) in self.vocab().words().enumerate() {
            write_record(write, word, self.word_vec_idx(idx, policy).view())?;
        }

        Ok(())
    }
}

/// Method to write the paragraph vectors of the training sentences in
/// word2vec text format.
///
/// The token of the paragraph vector of sentence *i* is `_*i`.
pub trait WriteSentenceVectors<W>
where
    W: Write,
{
    fn write_sentence_vectors(&self, writer: &mut W) -> Result<()>;
}

impl<W> WriteSentenceVectors<W> for MonolingualModel
where
    W: Write,
{
    fn write_sentence_vectors(&self, write: &mut W) -> Result<()> {
        let sentences = self.weights().sentences();
        writeln!(write, "{} {}", sentences.nrows(), sentences.ncols())
            .map_err(|e| Error::write_error("Cannot write sentence matrix shape", e))?;

        for (idx, vec) in sentences.outer_iter().enumerate() {
            write_record(write, &format!("{}{}", SENTENCE_TOKEN_PREFIX, idx), vec)?;
        }

        Ok(())
    }
}
