//! Layer normalisation over the trailing hidden axis.
//!
//! Inputs follow the `(batch, seq, hidden)` convention. Statistics are taken
//! along the last axis while preserving the original layout, then the learned
//! scale and shift are applied.

use candle_core::{DType, Device, Result, Tensor, Var, D};

use crate::checks;

/// Configuration for [`LayerNorm`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormConfig {
    /// Size of the hidden dimension being normalised.
    pub hidden_size: usize,
    /// Numeric stabiliser added to the variance.
    pub epsilon: f64,
}

impl NormConfig {
    pub fn new(hidden_size: usize) -> Self {
        Self {
            hidden_size,
            epsilon: 1e-5,
        }
    }
}

/// LayerNorm with learnable scale (initialised to one) and shift (zero).
#[derive(Debug, Clone)]
pub struct LayerNorm {
    config: NormConfig,
    weight: Var,
    bias: Var,
}

impl LayerNorm {
    pub fn new(config: NormConfig, device: &Device) -> Result<Self> {
        let weight = Var::ones(config.hidden_size, DType::F32, device)?;
        let bias = Var::zeros(config.hidden_size, DType::F32, device)?;
        Ok(Self {
            config,
            weight,
            bias,
        })
    }

    pub fn config(&self) -> &NormConfig {
        &self.config
    }

    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        vec![
            (format!("{scope}.weight"), self.weight.clone()),
            (format!("{scope}.bias"), self.bias.clone()),
        ]
    }

    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        checks::expect_batch_seq_hidden("norm.input", hidden, self.config.hidden_size)?;

        let hidden_size = self.config.hidden_size as f64;
        let mean = (hidden.sum_keepdim(D::Minus1)? / hidden_size)?;
        let centered = hidden.broadcast_sub(&mean)?;
        let variance = (centered.sqr()?.sum_keepdim(D::Minus1)? / hidden_size)?;
        let denom = (variance + self.config.epsilon)?.sqrt()?;

        centered
            .broadcast_div(&denom)?
            .broadcast_mul(self.weight.as_tensor())?
            .broadcast_add(self.bias.as_tensor())
    }
}
