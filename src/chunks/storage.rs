//! Weight matrix chunks

use std::convert::TryInto;
use std::io::{Read, Seek, SeekFrom, Write};
use std::mem::size_of;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{Array2, ArrayView2};

use crate::chunks::io::{ChunkIdentifier, ReadChunk, TypeId, WriteChunk};
use crate::error::{Error, Result};
use crate::util::padding;

/// In-memory `ndarray` matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct NdArray {
    inner: Array2<f32>,
}

impl NdArray {
    pub fn new(arr: Array2<f32>) -> Self {
        NdArray { inner: arr }
    }

    pub fn view(&self) -> ArrayView2<f32> {
        self.inner.view()
    }

    pub(crate) fn chunk_len(data: ArrayView2<f32>, offset: u64) -> u64 {
        let n_padding = padding::<f32>(offset + size_of::<u32>() as u64);

        // Chunk identifier (u32) + chunk len (u64) + rows (u64) + cols (u32) + type id (u32) + padding + matrix.
        (size_of::<u32>()
            + size_of::<u64>()
            + size_of::<u64>()
            + size_of::<u32>()
            + size_of::<u32>()
            + data.len() * size_of::<f32>()) as u64
            + n_padding
    }

    /// Write a matrix without taking ownership.
    pub(crate) fn write_ndarray_chunk<W>(data: ArrayView2<f32>, write: &mut W) -> Result<()>
    where
        W: Write + Seek,
    {
        write
            .write_u32::<LittleEndian>(ChunkIdentifier::NdArray as u32)
            .map_err(|e| Error::write_error("Cannot write matrix chunk identifier", e))?;

        let pos = write
            .seek(SeekFrom::Current(0))
            .map_err(|e| Error::write_error("Cannot get file position for computing padding", e))?;
        let n_padding = padding::<f32>(pos);

        // The length was computed relative to the start of the chunk.
        let remaining_chunk_len = Self::chunk_len(data, pos - size_of::<u32>() as u64)
            - (size_of::<u32>() + size_of::<u64>()) as u64;

        write
            .write_u64::<LittleEndian>(remaining_chunk_len)
            .map_err(|e| Error::write_error("Cannot write matrix chunk length", e))?;
        write
            .write_u64::<LittleEndian>(data.nrows() as u64)
            .map_err(|e| Error::write_error("Cannot write number of rows of the matrix", e))?;
        write
            .write_u32::<LittleEndian>(data.ncols() as u32)
            .map_err(|e| Error::write_error("Cannot write number of columns of the matrix", e))?;
        write
            .write_u32::<LittleEndian>(f32::type_id())
            .map_err(|e| Error::write_error("Cannot write matrix type identifier", e))?;

        // The matrix data starts at a multiple of the size of f32.
        let padding = vec![0; n_padding as usize];
        write
            .write_all(&padding)
            .map_err(|e| Error::write_error("Cannot write padding", e))?;

        for row in data.outer_iter() {
            for &col in row.iter() {
                write
                    .write_f32::<LittleEndian>(col)
                    .map_err(|e| Error::write_error("Cannot write matrix component", e))?;
            }
        }

        Ok(())
    }
}

impl From<Array2<f32>> for NdArray {
    fn from(arr: Array2<f32>) -> Self {
        NdArray::new(arr)
    }
}

impl From<NdArray> for Array2<f32> {
    fn from(arr: NdArray) -> Self {
        arr.inner
    }
}

impl ReadChunk for NdArray {
    fn read_chunk<R>(read: &mut R) -> Result<Self>
    where
        R: Read + Seek,
    {
        ChunkIdentifier::ensure_chunk_type(read, ChunkIdentifier::NdArray)?;

        // Read and discard chunk length.
        read.read_u64::<LittleEndian>()
            .map_err(|e| Error::read_error("Cannot read matrix chunk length", e))?;

        let rows = read
            .read_u64::<LittleEndian>()
            .map_err(|e| Error::read_error("Cannot read number of rows of the matrix", e))?
            .try_into()
            .map_err(|_| Error::Overflow)?;
        let cols = read
            .read_u32::<LittleEndian>()
            .map_err(|e| Error::read_error("Cannot read number of columns of the matrix", e))?
            as usize;

        f32::ensure_data_type(read)?;

        let n_padding = padding::<f32>(
            read.seek(SeekFrom::Current(0))
                .map_err(|e| Error::read_error("Cannot get file position for computing padding", e))?,
        );
        read.seek(SeekFrom::Current(n_padding as i64))
            .map_err(|e| Error::read_error("Cannot skip padding", e))?;

        let mut data = vec![0f32; rows * cols];
        read.read_f32_into::<LittleEndian>(&mut data)
            .map_err(|e| Error::read_error("Cannot read matrix", e))?;
        let data = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Format(format!("Invalid matrix shape: {}", e)))?;

        Ok(NdArray { inner: data })
    }
}

impl WriteChunk for NdArray {
    fn chunk_identifier(&self) -> ChunkIdentifier {
        ChunkIdentifier::NdArray
    }

    fn chunk_len(&self, offset: u64) -> u64 {
        Self::chunk_len(self.inner.view(), offset)
    }

    fn write_chunk<W>(&self, write: &mut W) -> Result<()>
    where
        W: Write + Seek,
    {
        Self::write_ndarray_chunk(self.inner.view(), write)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Seek, SeekFrom};

    use byteorder::{LittleEndian, ReadBytesExt};
    use ndarray::Array2;

    use super::NdArray;
    use crate::chunks::io::{ReadChunk, WriteChunk};

    const N_ROWS: usize = 20;
    const N_COLS: usize = 7;

    fn test_ndarray() -> NdArray {
        let test_data = Array2::from_shape_fn((N_ROWS, N_COLS), |(r, c)| {
            r as f32 * N_COLS as f32 + c as f32
        });

        NdArray::new(test_data)
    }

    #[test]
    fn ndarray_correct_chunk_size() {
        let check_arr = test_ndarray();
        for offset in 0..16u64 {
            let mut cursor = Cursor::new(Vec::new());
            cursor.seek(SeekFrom::Start(offset)).unwrap();
            check_arr.write_chunk(&mut cursor).unwrap();

            cursor.seek(SeekFrom::Start(offset)).unwrap();
            cursor.read_u32::<LittleEndian>().unwrap();
            let chunk_size = cursor.read_u64::<LittleEndian>().unwrap();
            assert_eq!(
                cursor.read_to_end(&mut Vec::new()).unwrap() as u64,
                chunk_size
            );

            let data = cursor.into_inner();
            assert_eq!(data.len() as u64 - offset, check_arr.chunk_len(offset));
        }
    }

    #[test]
    fn ndarray_write_read_roundtrip() {
        let check_arr = test_ndarray();
        for offset in 0..4u64 {
            let mut cursor = Cursor::new(Vec::new());
            cursor.seek(SeekFrom::Start(offset)).unwrap();
            check_arr.write_chunk(&mut cursor).unwrap();
            cursor.seek(SeekFrom::Start(offset)).unwrap();
            let arr = NdArray::read_chunk(&mut cursor).unwrap();
            assert_eq!(arr, check_arr);
        }
    }

    #[test]
    fn empty_matrix_roundtrip() {
        let check_arr = NdArray::new(Array2::zeros((0, 5)));
        let mut cursor = Cursor::new(Vec::new());
        check_arr.write_chunk(&mut cursor).unwrap();
        cursor.seek(SeekFrom::Start(0)).unwrap();
        let arr = NdArray::read_chunk(&mut cursor).unwrap();
        assert_eq!(arr.view().dim(), (0, 5));
    }
}
