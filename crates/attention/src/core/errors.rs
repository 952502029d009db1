//! Error types emitted by attention construction and forward passes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttentionError {
    /// The requested scoring mechanism is not one of the supported variants.
    #[error("unsupported attention mechanism '{name}' (expected general, multiplicative or additive)")]
    UnsupportedMechanism { name: String },
    /// `hidden_dim` cannot be split evenly across the heads.
    #[error("hidden_dim {hidden_dim} is not divisible by n_heads {n_heads}")]
    InvalidHeadSplit { hidden_dim: usize, n_heads: usize },
    /// The supplied tensor shapes do not align with the documented contract.
    #[error("invalid tensor shape: {context}")]
    InvalidShape { context: String },
    /// A tensor runtime failure propagated to the caller.
    #[error(transparent)]
    Backend(#[from] candle_core::Error),
}
