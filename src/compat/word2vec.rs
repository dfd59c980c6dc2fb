//! Writer for the word2vec binary format.
//!
//! The file starts with a line holding the vocabulary size and the
//! vector length. Every word is then written as the word, a space, the
//! vector components as little-endian `f32` and a newline.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{Error, Result};
use crate::model::MonolingualModel;
use crate::similarity::Policy;

/// Method to write word embeddings in word2vec binary format.
pub trait WriteWord2Vec<W>
where
    W: Write,
{
    /// Write the word embeddings to the given writer.
    ///
    /// `policy` selects the weights that represent a word.
    fn write_word2vec_binary(&self, w: &mut W, policy: Policy) -> Result<()>;
}

impl<W> WriteWord2Vec<W> for MonolingualModel
where
    W: Write,
{
    fn write_word2vec_binary(&self, w: &mut W, policy: Policy) -> Result<()> {
        writeln!(w, "{} {}", self.vocab().len(), self.vec_dims(policy))
            .map_err(|e| Error::write_error("Cannot write word embedding matrix shape", e))?;

        for (idx, word) in self.vocab().words().enumerate() {
            write!(w, "{} ", word).map_err(|e| Error::write_error("Cannot write token", e))?;

            for &v in &self.word_vec_idx(idx, policy) {
                w.write_f32::<LittleEndian>(v)
                    .map_err(|e| Error::write_error("Cannot write embedding component", e))?;
            }

            w.write_all(&[0x0a])
                .map_err(|e| Error::write_error("Cannot write embedding separator", e))?;
        }

        Ok(())
    }
}
