//! Encoder-decoder transformer for sequence-to-sequence translation.
//!
//! [`Seq2SeqTransformer`] builds source padding and target causal masks,
//! encodes the source with a stack of [`EncoderLayer`]s and decodes the target
//! with a stack of [`DecoderLayer`]s, returning vocabulary logits together with
//! the final cross-attention weights. Every attention layer uses the scoring
//! mechanism named in [`Seq2SeqConfig::attention`].

pub mod alignment;
pub mod config;
pub mod decoder;
mod embed;
pub mod encoder;
pub mod error;
pub mod model;

pub use alignment::{hard_alignment, head_average};
pub use config::Seq2SeqConfig;
pub use decoder::{Decoder, DecoderLayer};
pub use encoder::{Encoder, EncoderLayer};
pub use error::ModelError;
pub use model::Seq2SeqTransformer;
