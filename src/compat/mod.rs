//! Writers for the word2vec interchange formats.

pub mod text;

pub mod word2vec;
