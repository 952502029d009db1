use candle_core::{Device, Tensor, Var};
use layers::linear::{Linear, LinearConfig, LinearInit};
use rand::rngs::StdRng;

use super::EnergyScore;
use crate::core::AttentionError;

/// Bilinear scoring: queries pass through a learned `head_dim × head_dim` map
/// before the dot product with the keys.
#[derive(Debug, Clone)]
pub struct Multiplicative {
    w1: Linear,
}

impl Multiplicative {
    pub fn new(
        head_dim: usize,
        init: &LinearInit,
        rng: &mut StdRng,
        device: &Device,
    ) -> Result<Self, AttentionError> {
        let w1 = Linear::with_init(LinearConfig::new(head_dim, head_dim), init, rng, device)?;
        Ok(Self { w1 })
    }
}

impl EnergyScore for Multiplicative {
    fn energy(&self, q: &Tensor, k: &Tensor) -> Result<Tensor, AttentionError> {
        let projected = self.w1.forward(q)?;
        let k_t = k.transpose(2, 3)?.contiguous()?;
        Ok(projected.matmul(&k_t)?)
    }

    fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        self.w1.named_parameters(&format!("{scope}.w1"))
    }
}
