//! Chunks of the model snapshot format.
//!
//! A snapshot starts with a header listing the chunks of the file,
//! followed by the chunks themselves.

pub mod io;

pub mod metadata;

pub mod storage;

pub mod vocab;
