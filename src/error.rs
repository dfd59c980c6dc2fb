//! Error types.

use std::io;

use thiserror::Error;

/// `Result` type alias for operations that can lead to errors.
pub type Result<T> = ::std::result::Result<T, Error>;

/// monovec errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The training configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The corpus does not yield a usable vocabulary.
    #[error("Degenerate corpus: {0}")]
    DegenerateCorpus(String),

    /// Invalid file format.
    #[error("{0}")]
    Format(String),

    /// Read error.
    #[error("{desc:?}: {error:?}")]
    Read { desc: String, error: io::Error },

    /// Write error.
    #[error("{desc:?}: {error:?}")]
    Write { desc: String, error: io::Error },

    /// Value does not fit in the target type.
    #[error("Value overflows the target type")]
    Overflow,
}

impl Error {
    pub fn read_error(desc: impl Into<String>, error: io::Error) -> Self {
        Error::Read {
            desc: desc.into(),
            error,
        }
    }

    pub fn write_error(desc: impl Into<String>, error: io::Error) -> Self {
        Error::Write {
            desc: desc.into(),
            error,
        }
    }
}
