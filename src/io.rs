//! Traits for reading and writing model snapshots.
//!
//! This module provides traits for reading models (`ReadModel`),
//! reading only the metadata of a model (`ReadMetadata`), and writing
//! models (`WriteModel`).

use std::io::{Read, Seek, Write};

use crate::error::Result;

/// Read a model snapshot.
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
///
/// use monovec::prelude::*;
///
/// let mut reader = BufReader::new(File::open("model.mvec").unwrap());
/// let model = MonolingualModel::read_model(&mut reader).unwrap();
/// ```
pub trait ReadModel
where
    Self: Sized,
{
    /// Read the model.
    fn read_model<R>(read: &mut R) -> Result<Self>
    where
        R: Read + Seek;
}

/// Read the metadata of a model snapshot.
///
/// This is considerably faster than reading the full model when only
/// the training configuration is needed.
pub trait ReadMetadata
where
    Self: Sized,
{
    /// Read the metadata.
    fn read_metadata<R>(read: &mut R) -> Result<Self>
    where
        R: Read + Seek;
}

/// Write a model snapshot.
pub trait WriteModel {
    fn write_model<W>(&self, write: &mut W) -> Result<()>
    where
        W: Write + Seek;
}
