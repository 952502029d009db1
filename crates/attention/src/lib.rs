//! Multi-head attention with interchangeable scoring functions.
//!
//! Sequence tensors use the layout `[batch, len, hidden_dim]`. Inside a layer
//! they are split into `[batch, n_heads, len, head_dim]` slices and compared
//! with one of three scorers:
//!
//! * [`AttentionKind::General`]: plain dot product `Q · Kᵀ`;
//! * [`AttentionKind::Multiplicative`]: `(Q · W1) · Kᵀ`;
//! * [`AttentionKind::Additive`]: `V · tanh(W1·Q + W2·K)`.
//!
//! The scorer is chosen once, at construction, from [`Config::kind`]. Masks are
//! boolean `u8` tensors built by the helpers in [`masks`]; suppressed positions
//! receive an energy of [`masks::MASK_FILL`] before the softmax.
//!
//! Dropout on the attention probabilities is active only while the layer is in
//! training mode. The weights returned to callers are always the
//! pre-dropout probabilities.

pub mod core;
pub mod masks;
pub mod multihead;
pub mod scoring;

pub use core::{AttentionError, AttentionKind, Config};
pub use multihead::MultiheadAttention;
pub use scoring::{EnergyScore, Scorer};
