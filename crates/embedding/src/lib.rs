//! Embedding tables for the sequence-to-sequence model.
//!
//! [`TokenEmbedding`] maps `(batch, seq)` token ids to `(batch, seq, hidden)`
//! vectors; [`LearnedPositionalEmbedding`] supplies one learned vector per
//! position up to a fixed maximum length.

pub mod positional;
pub mod token;

pub use positional::{LearnedPositionalEmbedding, PositionalEmbeddingConfig};
pub use token::{TokenEmbedding, TokenEmbeddingConfig};
