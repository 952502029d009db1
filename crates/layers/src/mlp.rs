//! Position-wise feed-forward block.
//!
//! Operates on hidden states shaped `(batch, seq, hidden)` and returns the same
//! layout: `fc2(dropout(act(fc1(x))))` expands to `pf_dim` and contracts back.
//! Every position is transformed independently; nothing mixes across the
//! sequence axis.

use candle_core::{Device, Result, Tensor, Var};
use rand::rngs::StdRng;

use crate::{
    activations::ActivationKind,
    checks,
    dropout::Dropout,
    linear::{Linear, LinearConfig, LinearInit},
};

/// Configuration for [`PositionwiseFeedForward`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeedForwardConfig {
    /// Model hidden size.
    pub hidden_size: usize,
    /// Width of the inner activation space.
    pub pf_dim: usize,
    /// Activation applied between projections.
    pub activation: ActivationKind,
    /// Dropout probability applied after the activation.
    pub dropout_p: f32,
}

impl FeedForwardConfig {
    pub fn new(hidden_size: usize, pf_dim: usize) -> Self {
        Self {
            hidden_size,
            pf_dim,
            activation: ActivationKind::Relu,
            dropout_p: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionwiseFeedForward {
    config: FeedForwardConfig,
    fc1: Linear,
    fc2: Linear,
    dropout: Dropout,
}

impl PositionwiseFeedForward {
    pub fn new(
        config: FeedForwardConfig,
        init: &LinearInit,
        rng: &mut StdRng,
        dropout_seed: u64,
        device: &Device,
    ) -> Result<Self> {
        let fc1 = Linear::with_init(
            LinearConfig::new(config.hidden_size, config.pf_dim),
            init,
            rng,
            device,
        )?;
        let fc2 = Linear::with_init(
            LinearConfig::new(config.pf_dim, config.hidden_size),
            init,
            rng,
            device,
        )?;
        let dropout = Dropout::new(config.dropout_p, dropout_seed)?;
        Ok(Self {
            config,
            fc1,
            fc2,
            dropout,
        })
    }

    pub fn config(&self) -> &FeedForwardConfig {
        &self.config
    }

    pub fn set_training(&self, training: bool) {
        self.dropout.set_training(training);
    }

    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let mut params = self.fc1.named_parameters(&format!("{scope}.fc1"));
        params.extend(self.fc2.named_parameters(&format!("{scope}.fc2")));
        params
    }

    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        checks::expect_batch_seq_hidden("feedforward.input", hidden, self.config.hidden_size)?;
        let expanded = self.config.activation.forward(&self.fc1.forward(hidden)?)?;
        self.fc2.forward(&self.dropout.forward(&expanded)?)
    }
}
