//! A library for training word and paragraph embeddings.
//!
//! monovec trains word2vec-style embeddings (CBOW or skip-gram, with
//! hierarchical softmax or negative sampling) on a plain-text corpus,
//! optionally learning a paragraph vector for every line. Trained models
//! can be queried for word, n-gram and sentence similarities, saved as
//! snapshots, and exported in the word2vec binary and text formats.

pub mod chunks;

pub mod compat;

pub mod config;

pub mod error;

pub(crate) mod hogwild;

pub mod io;

pub mod model;

pub mod prelude;

pub mod sampling;

pub mod similarity;

pub mod subword;

pub mod train;

pub(crate) mod util;

pub mod vocab;

pub mod weights;
