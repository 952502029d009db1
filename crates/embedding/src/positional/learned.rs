//! Learned absolute position embeddings.
//!
//! Position `p` owns row `p` of a `(max_len, hidden_dim)` table. Sequences
//! longer than `max_len` are rejected rather than wrapped or clamped.

use candle_core::{bail, Device, Result, Tensor, Var};
use rand::rngs::StdRng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalEmbeddingConfig {
    /// Longest sequence the table covers.
    pub max_len: usize,
    pub hidden_dim: usize,
}

impl PositionalEmbeddingConfig {
    pub fn new(max_len: usize, hidden_dim: usize) -> Self {
        Self {
            max_len,
            hidden_dim,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LearnedPositionalEmbedding {
    config: PositionalEmbeddingConfig,
    weight: Var,
}

impl LearnedPositionalEmbedding {
    /// Samples the table from `N(0, 1)`.
    pub fn new(config: PositionalEmbeddingConfig, rng: &mut StdRng, device: &Device) -> Result<Self> {
        if config.max_len == 0 || config.hidden_dim == 0 {
            bail!(
                "positional embedding requires max_len > 0 and hidden_dim > 0, got {config:?}"
            );
        }
        let weight =
            layers::init::normal_var(rng, 0.0, 1.0, (config.max_len, config.hidden_dim), device)?;
        Ok(Self { config, weight })
    }

    pub fn config(&self) -> &PositionalEmbeddingConfig {
        &self.config
    }

    pub fn max_len(&self) -> usize {
        self.config.max_len
    }

    /// Embeddings for positions `0..seq_len`, shaped `(1, seq_len, hidden_dim)`
    /// so they broadcast over the batch.
    pub fn forward(&self, seq_len: usize) -> Result<Tensor> {
        if seq_len == 0 {
            bail!("positional embedding requires seq_len > 0");
        }
        if seq_len > self.config.max_len {
            bail!(
                "sequence length {seq_len} exceeds max_sequence_length {}",
                self.config.max_len
            );
        }
        self.weight.as_tensor().narrow(0, 0, seq_len)?.unsqueeze(0)
    }

    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        vec![(format!("{scope}.weight"), self.weight.clone())]
    }
}
