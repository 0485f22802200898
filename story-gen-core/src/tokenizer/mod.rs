//! Byte-pair-encoding subword tokenizer.
//!
//! This module covers the whole tokenizer lifecycle:
//! - Vocabulary construction and the reserved control tokens (`vocab`)
//! - Ordered merge rules and their id-pair lookup table (`merges`)
//! - Training a merge sequence from a corpus (`trainer`)
//! - Encoding and decoding arbitrary text with a trained vocabulary (`bpe`)

/// Token ids, the vocabulary and the reserved control tokens.
pub mod vocab;

/// Merge rules, ranked by the training iteration that learned them.
pub mod merges;

/// BPE vocabulary training over a corpus.
pub mod trainer;

/// The trained tokenizer: encode text to token ids and back.
pub mod bpe;
