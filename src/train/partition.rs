//! Partitioning of a corpus for parallel training.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};

/// Contiguous byte range of a corpus consisting of whole lines.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Chunk {
    /// Offset of the first byte.
    pub start: u64,

    /// Offset one past the last byte.
    pub end: u64,

    /// Index of the first line of the chunk within the corpus.
    pub first_line: usize,
}

impl Chunk {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }
}

/// Split a corpus into `n_chunks` chunks of roughly equal size.
///
/// The chunks cover the file without gaps or overlap. Every chunk starts
/// at the beginning of a line, so no line is split over two chunks. A
/// chunk is empty when the corpus has fewer lines than chunks.
pub fn chunkify(path: impl AsRef<Path>, n_chunks: usize) -> Result<Vec<Chunk>> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| {
        Error::read_error(format!("Cannot open training file {}", path.display()), e)
    })?;
    let len = f
        .metadata()
        .map_err(|e| Error::read_error("Cannot get training file size", e))?
        .len();

    chunkify_from(BufReader::new(f), len, n_chunks)
}

pub(crate) fn chunkify_from<R>(mut read: R, len: u64, n_chunks: usize) -> Result<Vec<Chunk>>
where
    R: BufRead,
{
    assert!(n_chunks > 0, "Cannot split a corpus into zero chunks");

    // Chunk i starts at the first line start at or after i * len / n_chunks.
    let mut targets = (1..n_chunks as u64)
        .map(|i| len * i / n_chunks as u64)
        .peekable();
    let mut boundaries = Vec::with_capacity(n_chunks + 1);
    boundaries.push((0, 0));

    let mut pos = 0u64;
    let mut line = 0usize;
    let mut buf = Vec::new();
    loop {
        while let Some(&target) = targets.peek() {
            if target > pos {
                break;
            }

            boundaries.push((pos, line));
            targets.next();
        }

        buf.clear();
        let n_read = read
            .read_until(b'\n', &mut buf)
            .map_err(|e| Error::read_error("Cannot read line from training file", e))?;
        if n_read == 0 {
            break;
        }

        pos += n_read as u64;
        line += 1;
    }

    // Targets past the last line start give empty chunks at the end.
    boundaries.extend(targets.map(|_| (pos, line)));
    boundaries.push((pos, line));

    Ok(boundaries
        .windows(2)
        .map(|w| Chunk {
            start: w[0].0,
            end: w[1].0,
            first_line: w[0].1,
        })
        .collect())
}
