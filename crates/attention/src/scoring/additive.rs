use candle_core::{Device, Tensor, Var, D};
use layers::linear::{Linear, LinearConfig, LinearInit};
use rand::rngs::StdRng;

use super::EnergyScore;
use crate::core::AttentionError;

/// Feed-forward scoring `V · tanh(W1·Q_i + W2·K_j)`.
///
/// Queries are broadcast over the key axis and keys over the query axis, so
/// the intermediate features are `[batch, heads, q_len, k_len, head_dim]`
/// before `V` collapses them to one scalar per query/key pair.
#[derive(Debug, Clone)]
pub struct Additive {
    w1: Linear,
    w2: Linear,
    v: Linear,
}

impl Additive {
    pub fn new(
        head_dim: usize,
        init: &LinearInit,
        rng: &mut StdRng,
        device: &Device,
    ) -> Result<Self, AttentionError> {
        let w1 = Linear::with_init(LinearConfig::new(head_dim, head_dim), init, rng, device)?;
        let w2 = Linear::with_init(LinearConfig::new(head_dim, head_dim), init, rng, device)?;
        let v = Linear::with_init(LinearConfig::new(head_dim, 1), init, rng, device)?;
        Ok(Self { w1, w2, v })
    }
}

impl EnergyScore for Additive {
    fn energy(&self, q: &Tensor, k: &Tensor) -> Result<Tensor, AttentionError> {
        let q_feat = self.w1.forward(q)?.unsqueeze(3)?;
        let k_feat = self.w2.forward(k)?.unsqueeze(2)?;
        let features = q_feat.broadcast_add(&k_feat)?.tanh()?;
        Ok(self.v.forward(&features)?.squeeze(D::Minus1)?)
    }

    fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let mut params = self.w1.named_parameters(&format!("{scope}.w1"));
        params.extend(self.w2.named_parameters(&format!("{scope}.w2")));
        params.extend(self.v.named_parameters(&format!("{scope}.v")));
        params
    }
}
