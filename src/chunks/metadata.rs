//! Metadata chunks

use std::convert::TryInto;
use std::io::{Read, Seek, Write};
use std::mem;
use std::ops::Deref;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use toml::{Table, Value};

use crate::chunks::io::{ChunkIdentifier, Header, ReadChunk, WriteChunk};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::io::ReadMetadata;

const CONFIG_KEY: &str = "config";

const TRAINING_KEY: &str = "training";

/// Corpus counters of a training run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TrainingStats {
    /// In-vocabulary tokens of the corpus.
    pub training_words: u64,

    /// Lines of the corpus.
    pub training_lines: u64,

    /// Tokens processed over all epochs.
    pub words_processed: u64,
}

impl TrainingStats {
    fn counters(&self) -> [(&'static str, u64); 3] {
        [
            ("training_words", self.training_words),
            ("training_lines", self.training_lines),
            ("words_processed", self.words_processed),
        ]
    }
}

/// Model metadata.
///
/// A TOML document with a `config` table holding the training
/// configuration and a `training` table holding the corpus counters.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    inner: Table,
}

impl Metadata {
    pub fn new(inner: Table) -> Self {
        Metadata { inner }
    }

    /// Metadata of a model trained with `config`.
    pub fn from_model(config: &Config, stats: TrainingStats) -> Result<Self> {
        let config = Value::try_from(config)
            .map_err(|e| Error::Format(format!("Cannot serialize configuration: {}", e)))?;

        let mut training = Table::new();
        for &(key, value) in &stats.counters() {
            let value = value.try_into().map_err(|_| Error::Overflow)?;
            training.insert(key.to_owned(), Value::Integer(value));
        }

        let mut inner = Table::new();
        inner.insert(CONFIG_KEY.to_owned(), config);
        inner.insert(TRAINING_KEY.to_owned(), Value::Table(training));

        Ok(Metadata { inner })
    }

    /// Get the training configuration.
    ///
    /// Fails when the configuration is missing or is not usable for
    /// training.
    pub fn config(&self) -> Result<Config> {
        let config: Config = self
            .inner
            .get(CONFIG_KEY)
            .cloned()
            .ok_or_else(|| Error::Format("Metadata lacks the model configuration".to_owned()))?
            .try_into()
            .map_err(|e| Error::Format(format!("Cannot deserialize configuration: {}", e)))?;

        config
            .validate()
            .map_err(|e| Error::Format(format!("Metadata holds an invalid configuration: {}", e)))?;

        Ok(config)
    }

    /// Get the corpus counters.
    pub fn training_stats(&self) -> Result<TrainingStats> {
        let training = self
            .inner
            .get(TRAINING_KEY)
            .and_then(Value::as_table)
            .ok_or_else(|| Error::Format("Metadata lacks the training counters".to_owned()))?;

        let counter = |key: &str| -> Result<u64> {
            training
                .get(key)
                .and_then(Value::as_integer)
                .ok_or_else(|| Error::Format(format!("Metadata lacks training counter: {}", key)))?
                .try_into()
                .map_err(|_| Error::Overflow)
        };

        Ok(TrainingStats {
            training_words: counter("training_words")?,
            training_lines: counter("training_lines")?,
            words_processed: counter("words_processed")?,
        })
    }
}

impl Deref for Metadata {
    type Target = Table;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl ReadChunk for Metadata {
    fn read_chunk<R>(read: &mut R) -> Result<Self>
    where
        R: Read + Seek,
    {
        ChunkIdentifier::ensure_chunk_type(read, ChunkIdentifier::Metadata)?;

        let chunk_len = read
            .read_u64::<LittleEndian>()
            .map_err(|e| Error::read_error("Cannot read chunk length", e))?
            as usize;

        let mut buf = vec![0; chunk_len];
        read.read_exact(&mut buf)
            .map_err(|e| Error::read_error("Cannot read TOML metadata", e))?;
        let buf_str = String::from_utf8(buf)
            .map_err(|e| Error::Format(format!("TOML metadata contains invalid UTF-8: {}", e)))?;

        Ok(Metadata::new(buf_str.parse::<Table>().map_err(|e| {
            Error::Format(format!("Cannot deserialize TOML metadata: {}", e))
        })?))
    }
}

impl WriteChunk for Metadata {
    fn chunk_identifier(&self) -> ChunkIdentifier {
        ChunkIdentifier::Metadata
    }

    fn chunk_len(&self, _offset: u64) -> u64 {
        // chunk identifier (u32) + metadata length (u64) + metadata
        (mem::size_of::<u32>() + mem::size_of::<u64>() + self.to_string().len()) as u64
    }

    fn write_chunk<W>(&self, write: &mut W) -> Result<()>
    where
        W: Write + Seek,
    {
        let metadata_str = self.to_string();

        write
            .write_u32::<LittleEndian>(self.chunk_identifier() as u32)
            .map_err(|e| Error::write_error("Cannot write metadata chunk identifier", e))?;
        write
            .write_u64::<LittleEndian>(metadata_str.len() as u64)
            .map_err(|e| Error::write_error("Cannot write metadata length", e))?;
        write
            .write_all(metadata_str.as_bytes())
            .map_err(|e| Error::write_error("Cannot write metadata", e))?;

        Ok(())
    }
}

impl ReadMetadata for Metadata {
    fn read_metadata<R>(read: &mut R) -> Result<Self>
    where
        R: Read + Seek,
    {
        let header = Header::read_chunk(read)?;

        match header.chunk_identifiers().first() {
            Some(ChunkIdentifier::Metadata) => Metadata::read_chunk(read),
            Some(identifier) => Err(Error::Format(format!(
                "Expected metadata as the first chunk, got: {}",
                identifier
            ))),
            None => Err(Error::Format(String::from(
                "Model file does not contain chunks",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Seek, SeekFrom};

    use byteorder::{LittleEndian, ReadBytesExt};
    use toml::toml;

    use super::{Metadata, TrainingStats};
    use crate::chunks::io::{ReadChunk, WriteChunk};
    use crate::config::{Config, ModelType};
    use crate::error::Error;

    fn read_chunk_size(read: &mut impl Read) -> u64 {
        // Skip identifier.
        read.read_u32::<LittleEndian>().unwrap();

        read.read_u64::<LittleEndian>().unwrap()
    }

    fn test_stats() -> TrainingStats {
        TrainingStats {
            training_words: 1200,
            training_lines: 40,
            words_processed: 6000,
        }
    }

    fn test_metadata() -> Metadata {
        let config = Config {
            dims: 20,
            model: ModelType::SkipGram,
            ..Config::default()
        };
        Metadata::from_model(&config, test_stats()).unwrap()
    }

    #[test]
    fn metadata_correct_chunk_size() {
        let check_metadata = test_metadata();
        for offset in 0..16u64 {
            let mut cursor = Cursor::new(Vec::new());
            cursor.seek(SeekFrom::Start(offset)).unwrap();
            check_metadata.write_chunk(&mut cursor).unwrap();
            cursor.seek(SeekFrom::Start(offset)).unwrap();

            let chunk_size = read_chunk_size(&mut cursor);
            assert_eq!(
                cursor.read_to_end(&mut Vec::new()).unwrap() as u64,
                chunk_size
            );

            let data = cursor.into_inner();
            assert_eq!(data.len() as u64 - offset, check_metadata.chunk_len(offset));
        }
    }

    #[test]
    fn metadata_restores_config_and_stats() {
        let check_metadata = test_metadata();
        let mut cursor = Cursor::new(Vec::new());
        check_metadata.write_chunk(&mut cursor).unwrap();
        cursor.seek(SeekFrom::Start(0)).unwrap();
        let metadata = Metadata::read_chunk(&mut cursor).unwrap();

        assert_eq!(metadata, check_metadata);
        let config = metadata.config().unwrap();
        assert_eq!(config.dims, 20);
        assert_eq!(config.model, ModelType::SkipGram);
        assert_eq!(metadata.training_stats().unwrap(), test_stats());
    }

    #[test]
    fn invalid_config_is_a_format_error() {
        let metadata = Metadata::new(toml! {
            [config]
            min_ngram = 0

            [training]
            training_words = 1
            training_lines = 1
            words_processed = 1
        });
        assert!(matches!(metadata.config(), Err(Error::Format(_))));
        assert!(metadata.training_stats().is_ok());
    }

    #[test]
    fn missing_counters_are_a_format_error() {
        let metadata = Metadata::new(toml! {
            [config]
            dims = 10

            [training]
            training_words = 1
        });
        assert!(metadata.config().is_ok());
        assert!(matches!(metadata.training_stats(), Err(Error::Format(_))));

        let negative = Metadata::new(
            "[training]\ntraining_words = -1\ntraining_lines = 1\nwords_processed = 1\n"
                .parse()
                .unwrap(),
        );
        assert!(matches!(negative.training_stats(), Err(Error::Overflow)));
        assert!(matches!(negative.config(), Err(Error::Format(_))));
    }
}
