//! Building blocks for transformer layers.
//!
//! Feed-forward, normalisation, dropout and residual components assembled from
//! Candle primitives. All learnable tensors are [`candle_core::Var`]s sampled
//! through [`init`] so that model builds can be seeded.

pub mod activations;
pub mod checks;
pub mod dropout;
pub mod init;
pub mod linear;
pub mod mlp;
pub mod norm;
pub mod residual;

pub use activations::ActivationKind;
pub use dropout::Dropout;
pub use linear::{Linear, LinearConfig, LinearInit};
pub use mlp::{FeedForwardConfig, PositionwiseFeedForward};
pub use norm::{LayerNorm, NormConfig};
pub use residual::{Residual, ResidualConfig};
