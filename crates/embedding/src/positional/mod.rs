//! Positional encodings added to token embeddings.

pub mod learned;

pub use learned::{LearnedPositionalEmbedding, PositionalEmbeddingConfig};
