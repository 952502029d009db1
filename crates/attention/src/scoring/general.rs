use candle_core::{Tensor, Var};

use super::EnergyScore;
use crate::core::AttentionError;

/// Plain dot-product scoring; carries no parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct General;

impl EnergyScore for General {
    fn energy(&self, q: &Tensor, k: &Tensor) -> Result<Tensor, AttentionError> {
        let k_t = k.transpose(2, 3)?.contiguous()?;
        Ok(q.contiguous()?.matmul(&k_t)?)
    }

    fn named_parameters(&self, _scope: &str) -> Vec<(String, Var)> {
        Vec::new()
    }
}
