//! Core types shared across the attention crate.
//!
//! Per-head tensors use the layout `[batch, n_heads, seq_len, head_dim]`;
//! energies and attention weights use `[batch, n_heads, q_len, k_len]`.

pub mod config;
pub mod errors;

pub use config::{AttentionKind, Config};
pub use errors::AttentionError;
