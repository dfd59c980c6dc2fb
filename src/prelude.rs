//! Prelude exports the most commonly-used types and traits.

pub use crate::chunks::metadata::{Metadata, TrainingStats};

pub use crate::compat::text::{WriteSentenceVectors, WriteTextDims};

pub use crate::compat::word2vec::WriteWord2Vec;

pub use crate::config::{Config, LossType, ModelType, OovPolicy};

pub use crate::error::{Error, Result};

pub use crate::io::{ReadMetadata, ReadModel, WriteModel};

pub use crate::model::{ModelInternals, MonolingualModel};

pub use crate::similarity::{Policy, WordSimilarityResult};

pub use crate::vocab::Vocab;
