//! Post-norm residual wiring: `norm(residual + dropout(branch))`.
//!
//! Both inputs are `(batch, seq, hidden)` tensors of identical shape. Each
//! sublayer in the encoder and decoder owns one [`Residual`], so its dropout
//! stream and normalisation parameters are never shared.

use candle_core::{Device, Result, Tensor, Var};

use crate::{
    checks,
    dropout::Dropout,
    norm::{LayerNorm, NormConfig},
};

/// Configuration describing a residual sublayer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualConfig {
    pub hidden_size: usize,
    /// Dropout probability applied to the transformed branch during training.
    pub dropout_p: f32,
    pub norm_epsilon: f64,
}

impl ResidualConfig {
    pub fn new(hidden_size: usize) -> Self {
        Self {
            hidden_size,
            dropout_p: 0.0,
            norm_epsilon: 1e-5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Residual {
    config: ResidualConfig,
    dropout: Dropout,
    norm: LayerNorm,
}

impl Residual {
    pub fn new(config: ResidualConfig, seed: u64, device: &Device) -> Result<Self> {
        let dropout = Dropout::new(config.dropout_p, seed)?;
        let mut norm_cfg = NormConfig::new(config.hidden_size);
        norm_cfg.epsilon = config.norm_epsilon;
        let norm = LayerNorm::new(norm_cfg, device)?;
        Ok(Self {
            config,
            dropout,
            norm,
        })
    }

    pub fn config(&self) -> &ResidualConfig {
        &self.config
    }

    pub fn set_training(&self, training: bool) {
        self.dropout.set_training(training);
    }

    /// Parameters of the normalisation, named `scope.weight` / `scope.bias`.
    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        self.norm.named_parameters(scope)
    }

    /// Applies dropout to `branch`, adds `residual`, then normalises.
    pub fn forward(&self, branch: &Tensor, residual: &Tensor) -> Result<Tensor> {
        checks::expect_batch_seq_hidden("residual.input", residual, self.config.hidden_size)?;
        checks::expect_shape("residual.branch", branch, residual.dims())?;
        let dropped = self.dropout.forward(branch)?;
        self.norm.forward(&residual.add(&dropped)?)
    }
}
