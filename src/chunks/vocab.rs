//! Vocabulary chunks

use std::collections::HashSet;
use std::convert::TryInto;
use std::io::{Read, Seek, Write};
use std::mem::size_of;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::chunks::io::{ChunkIdentifier, ReadChunk, WriteChunk};
use crate::error::{Error, Result};
use crate::vocab::Vocab;

/// Words with their corpus frequencies, in index order.
///
/// Huffman codes are not stored, they are rebuilt from the counts when
/// the vocabulary is read.
impl ReadChunk for Vocab {
    fn read_chunk<R>(read: &mut R) -> Result<Self>
    where
        R: Read + Seek,
    {
        ChunkIdentifier::ensure_chunk_type(read, ChunkIdentifier::CountedVocab)?;

        // Read and discard chunk length.
        read.read_u64::<LittleEndian>()
            .map_err(|e| Error::read_error("Cannot read vocabulary chunk length", e))?;

        let vocab_len: usize = read
            .read_u64::<LittleEndian>()
            .map_err(|e| Error::read_error("Cannot read vocabulary length", e))?
            .try_into()
            .map_err(|_| Error::Overflow)?;

        let mut counts = Vec::with_capacity(vocab_len);
        let mut seen = HashSet::with_capacity(vocab_len);
        for _ in 0..vocab_len {
            let word_len = read
                .read_u32::<LittleEndian>()
                .map_err(|e| Error::read_error("Cannot read word length", e))?
                as usize;
            let mut bytes = vec![0; word_len];
            read.read_exact(&mut bytes)
                .map_err(|e| Error::read_error("Cannot read word", e))?;
            let word = String::from_utf8(bytes)
                .map_err(|e| Error::Format(format!("Word contains invalid UTF-8: {}", e)))?;
            let count = read
                .read_u64::<LittleEndian>()
                .map_err(|e| Error::read_error("Cannot read word count", e))?;
            if !seen.insert(word.clone()) {
                return Err(Error::Format(format!(
                    "Vocabulary contains duplicate word: {}",
                    word
                )));
            }
            counts.push((word, count));
        }

        if counts.windows(2).any(|w| w[0].1 < w[1].1) {
            return Err(Error::Format(String::from(
                "Vocabulary is not sorted by frequency",
            )));
        }

        Ok(Vocab::from_counts(counts))
    }
}

impl WriteChunk for Vocab {
    fn chunk_identifier(&self) -> ChunkIdentifier {
        ChunkIdentifier::CountedVocab
    }

    fn chunk_len(&self, _offset: u64) -> u64 {
        // Chunk identifier (u32) + chunk len (u64) + vocab len (u64) + for
        // each word: word length (u32), word bytes, count (u64).
        (size_of::<u32>()
            + size_of::<u64>()
            + size_of::<u64>()
            + self
                .words()
                .map(|w| size_of::<u32>() + w.len() + size_of::<u64>())
                .sum::<usize>()) as u64
    }

    fn write_chunk<W>(&self, write: &mut W) -> Result<()>
    where
        W: Write + Seek,
    {
        let remaining_chunk_len =
            self.chunk_len(0) - (size_of::<u32>() + size_of::<u64>()) as u64;

        write
            .write_u32::<LittleEndian>(self.chunk_identifier() as u32)
            .map_err(|e| Error::write_error("Cannot write vocabulary chunk identifier", e))?;
        write
            .write_u64::<LittleEndian>(remaining_chunk_len)
            .map_err(|e| Error::write_error("Cannot write vocabulary chunk length", e))?;
        write
            .write_u64::<LittleEndian>(self.len() as u64)
            .map_err(|e| Error::write_error("Cannot write vocabulary length", e))?;

        for entry in self.entries() {
            write
                .write_u32::<LittleEndian>(entry.word().len() as u32)
                .map_err(|e| Error::write_error("Cannot write word length", e))?;
            write
                .write_all(entry.word().as_bytes())
                .map_err(|e| Error::write_error("Cannot write word", e))?;
            write
                .write_u64::<LittleEndian>(entry.count())
                .map_err(|e| Error::write_error("Cannot write word count", e))?;
        }

        Ok(())
    }
}
