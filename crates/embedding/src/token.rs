//! Token embedding lookup table.

use candle_core::{bail, DType, Device, Error, Result, Tensor, Var};
use rand::rngs::StdRng;

/// Configuration for building a token embedding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEmbeddingConfig {
    /// Number of distinct token ids.
    pub vocab_size: usize,
    /// Width of each embedding vector.
    pub hidden_dim: usize,
}

impl TokenEmbeddingConfig {
    pub fn new(vocab_size: usize, hidden_dim: usize) -> Self {
        Self {
            vocab_size,
            hidden_dim,
        }
    }
}

/// Learnable `(vocab_size, hidden_dim)` table indexed by token id.
#[derive(Debug, Clone)]
pub struct TokenEmbedding {
    config: TokenEmbeddingConfig,
    weight: Var,
}

impl TokenEmbedding {
    /// Builds a new table with entries sampled from `N(0, 1)`.
    pub fn new(config: TokenEmbeddingConfig, rng: &mut StdRng, device: &Device) -> Result<Self> {
        if config.vocab_size == 0 {
            bail!("token embedding requires vocab_size > 0");
        }
        if config.hidden_dim == 0 {
            bail!("token embedding requires hidden_dim > 0");
        }
        let weight = layers::init::normal_var(
            rng,
            0.0,
            1.0,
            (config.vocab_size, config.hidden_dim),
            device,
        )?;
        Ok(Self { config, weight })
    }

    pub fn config(&self) -> &TokenEmbeddingConfig {
        &self.config
    }

    pub fn weight(&self) -> &Tensor {
        self.weight.as_tensor()
    }

    /// Looks up embeddings for `(batch, seq)` integer ids, returning
    /// `(batch, seq, hidden_dim)`.
    pub fn forward(&self, token_ids: &Tensor) -> Result<Tensor> {
        let (batch, seq) = self.validate_token_ids(token_ids)?;
        let flat = token_ids.to_dtype(DType::I64)?.flatten_all()?;
        self.ensure_id_range(&flat)?;
        self.weight
            .as_tensor()
            .index_select(&flat, 0)?
            .reshape((batch, seq, self.config.hidden_dim))
    }

    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let prefix = if scope.is_empty() { "embedding" } else { scope };
        vec![(format!("{prefix}.weight"), self.weight.clone())]
    }

    fn validate_token_ids(&self, token_ids: &Tensor) -> Result<(usize, usize)> {
        let (batch, seq) = match token_ids.dims() {
            [batch, seq] => (*batch, *seq),
            dims => {
                return Err(Error::Msg(format!(
                    "token_ids must be shaped [batch, seq], got {dims:?}"
                )))
            }
        };
        if batch == 0 || seq == 0 {
            bail!("token_ids must have non-zero batch and seq dimensions");
        }
        if !token_ids.dtype().is_int() {
            bail!(
                "token_ids expected integer dtype but received {:?}",
                token_ids.dtype()
            );
        }
        Ok((batch, seq))
    }

    fn ensure_id_range(&self, flat_ids: &Tensor) -> Result<()> {
        let min_id = flat_ids.min_all()?.to_scalar::<i64>()?;
        if min_id < 0 {
            bail!("encountered negative token id {min_id}");
        }
        let max_id = flat_ids.max_all()?.to_scalar::<i64>()?;
        let vocab = self.config.vocab_size as i64;
        if max_id >= vocab {
            bail!("token id {max_id} exceeds vocab size {vocab}");
        }
        Ok(())
    }
}
