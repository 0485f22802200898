//! Statistical text generation engine for Urdu stories.
//!
//! This crate provides the training and inference core of the system:
//! - Byte-pair-encoding (BPE) subword tokenizer (training, encode, decode)
//! - Trigram language model with count-based back-off
//! - Temperature-controlled, optionally seeded sampling generator
//! - Binary persistence of the trained artifact and the tokenized-corpus cache
//!
//! Only the high-level API is exposed publicly. The serving layer is expected
//! to validate request parameters before calling into this crate; the engine
//! itself knows nothing about HTTP or request formats.

/// Corpus loading: pre-cleaned text in, story list out.
///
/// Independent of the tokenizer and the model.
pub mod corpus;

/// BPE tokenizer: vocabulary, merge rules, training and encode/decode.
pub mod tokenizer;

/// Trigram language model and the sampling generator.
pub mod model;

/// Persistence of trained artifacts and the tokenized-corpus cache.
pub mod artifact;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;
