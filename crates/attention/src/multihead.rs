//! Multi-head attention over `(batch, len, hidden_dim)` sequences.
//!
//! Queries, keys and values are projected, split into `n_heads` slices of
//! `head_dim` features, scored with the configured [`Scorer`], normalised with
//! a softmax over the key axis and recombined through an output projection.

use std::sync::OnceLock;

use candle_core::{Device, Tensor, Var};
use candle_nn::ops::softmax_last_dim;
use layers::{
    linear::{Linear, LinearConfig, LinearInit},
    Dropout,
};
use rand::rngs::StdRng;

use crate::core::{AttentionError, Config};
use crate::masks::masked_fill;
use crate::scoring::{EnergyScore, Scorer};

#[derive(Debug)]
pub struct MultiheadAttention {
    config: Config,
    head_dim: usize,
    fc_q: Linear,
    fc_k: Linear,
    fc_v: Linear,
    fc_o: Linear,
    scorer: Scorer,
    dropout: Dropout,
    first_call: OnceLock<()>,
}

impl MultiheadAttention {
    /// Builds the four projections and the scorer from `rng`.
    ///
    /// Fails with [`AttentionError::InvalidHeadSplit`] when `hidden_dim` is not
    /// a multiple of `n_heads`.
    pub fn new(
        config: &Config,
        init: &LinearInit,
        rng: &mut StdRng,
        dropout_seed: u64,
        device: &Device,
    ) -> Result<Self, AttentionError> {
        let head_dim = config.head_dim()?;
        let hidden = config.hidden_dim;
        let projection = || LinearConfig::new(hidden, hidden);
        let fc_q = Linear::with_init(projection(), init, rng, device)?;
        let fc_k = Linear::with_init(projection(), init, rng, device)?;
        let fc_v = Linear::with_init(projection(), init, rng, device)?;
        let fc_o = Linear::with_init(projection(), init, rng, device)?;
        let scorer = Scorer::new(config.kind, head_dim, init, rng, device)?;
        let dropout = Dropout::new(config.dropout_p, dropout_seed)?;
        Ok(Self {
            config: config.clone(),
            head_dim,
            fc_q,
            fc_k,
            fc_v,
            fc_o,
            scorer,
            dropout,
            first_call: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn head_dim(&self) -> usize {
        self.head_dim
    }

    pub fn set_training(&self, training: bool) {
        self.dropout.set_training(training);
    }

    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let mut params = Vec::new();
        for (name, layer) in [
            ("fc_q", &self.fc_q),
            ("fc_k", &self.fc_k),
            ("fc_v", &self.fc_v),
            ("fc_o", &self.fc_o),
        ] {
            params.extend(layer.named_parameters(&format!("{scope}.{name}")));
        }
        params.extend(self.scorer.named_parameters(&format!("{scope}.scorer")));
        params
    }

    /// Attends `query` over `key`/`value`.
    ///
    /// Returns the projected output `(batch, q_len, hidden_dim)` and the
    /// attention probabilities `(batch, heads, q_len, k_len)` taken before
    /// dropout. Mask entries equal to `0` suppress the matching key.
    pub fn forward(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
        mask: Option<&Tensor>,
    ) -> Result<(Tensor, Tensor), AttentionError> {
        if self.first_call.set(()).is_ok() {
            log::info!(
                "attention::multihead init kind={} hidden_dim={} n_heads={} head_dim={} dropout_p={}",
                self.config.kind,
                self.config.hidden_dim,
                self.config.n_heads,
                self.head_dim,
                self.config.dropout_p
            );
        }

        let (batch, q_len, k_len) = self.validate_inputs(query, key, value)?;

        let q = self.split_heads(&self.fc_q.forward(query)?, batch, q_len)?;
        let k = self.split_heads(&self.fc_k.forward(key)?, batch, k_len)?;
        let v = self.split_heads(&self.fc_v.forward(value)?, batch, k_len)?;

        let mut energy = self.scorer.energy(&q, &k)?;
        if let Some(mask) = mask {
            let expected = [batch, self.config.n_heads, q_len, k_len];
            if mask.rank() != 4 || mask.broadcast_as(&expected[..]).is_err() {
                return Err(AttentionError::InvalidShape {
                    context: format!(
                        "mask {:?} does not broadcast to energy {expected:?}",
                        mask.dims()
                    ),
                });
            }
            energy = masked_fill(&energy, mask)?;
        }

        let attention = softmax_last_dim(&energy.contiguous()?)?;
        let dropped = self.dropout.forward(&attention)?;
        let context = dropped.matmul(&v)?;

        let merged = context
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, q_len, self.config.hidden_dim))?;
        let output = self.fc_o.forward(&merged)?;
        Ok((output, attention))
    }

    fn validate_inputs(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
    ) -> Result<(usize, usize, usize), AttentionError> {
        let hidden = self.config.hidden_dim;
        let dims = |name: &str, t: &Tensor| {
            t.dims3().map_err(|_| AttentionError::InvalidShape {
                context: format!("{name} must be [batch, len, {hidden}], got {:?}", t.dims()),
            })
        };
        let (qb, q_len, qh) = dims("query", query)?;
        let (kb, k_len, kh) = dims("key", key)?;
        let (vb, v_len, vh) = dims("value", value)?;
        if qh != hidden || kh != hidden || vh != hidden {
            return Err(AttentionError::InvalidShape {
                context: format!(
                    "expected hidden size {hidden}, got query {qh}, key {kh}, value {vh}"
                ),
            });
        }
        if qb != kb || qb != vb {
            return Err(AttentionError::InvalidShape {
                context: format!("batch mismatch: query {qb}, key {kb}, value {vb}"),
            });
        }
        if k_len != v_len {
            return Err(AttentionError::InvalidShape {
                context: format!("key length {k_len} differs from value length {v_len}"),
            });
        }
        Ok((qb, q_len, k_len))
    }

    fn split_heads(&self, x: &Tensor, batch: usize, len: usize) -> Result<Tensor, AttentionError> {
        Ok(x
            .reshape((batch, len, self.config.n_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AttentionKind;
    use candle_core::DType;
    use layers::init::seeded_rng;

    fn layer(kind: AttentionKind, hidden: usize, heads: usize) -> Result<MultiheadAttention, AttentionError> {
        let mut rng = seeded_rng(Some(17));
        let config = Config::new(kind, hidden, heads);
        MultiheadAttention::new(&config, &LinearInit::default(), &mut rng, 17, &Device::Cpu)
    }

    #[test]
    fn rejects_uneven_head_split() {
        let err = layer(AttentionKind::General, 100, 7).unwrap_err();
        assert!(matches!(
            err,
            AttentionError::InvalidHeadSplit { hidden_dim: 100, n_heads: 7 }
        ));
    }

    #[test]
    fn cross_attention_shapes() -> Result<(), AttentionError> {
        let attn = layer(AttentionKind::Multiplicative, 16, 4)?;
        let q = Tensor::randn(0f32, 1.0, (2, 3, 16), &Device::Cpu)?;
        let kv = Tensor::randn(0f32, 1.0, (2, 6, 16), &Device::Cpu)?;
        let (out, weights) = attn.forward(&q, &kv, &kv, None)?;
        assert_eq!(out.dims(), &[2, 3, 16]);
        assert_eq!(weights.dims(), &[2, 4, 3, 6]);
        Ok(())
    }

    #[test]
    fn rejects_wrong_hidden_size() -> Result<(), AttentionError> {
        let attn = layer(AttentionKind::General, 16, 4)?;
        let x = Tensor::zeros((1, 3, 12), DType::F32, &Device::Cpu)?;
        assert!(matches!(
            attn.forward(&x, &x, &x, None),
            Err(AttentionError::InvalidShape { .. })
        ));
        Ok(())
    }

    #[test]
    fn rejects_non_broadcastable_mask() -> Result<(), AttentionError> {
        let attn = layer(AttentionKind::General, 8, 2)?;
        let x = Tensor::randn(0f32, 1.0, (1, 4, 8), &Device::Cpu)?;
        let mask = Tensor::ones((1, 1, 1, 5), DType::U8, &Device::Cpu)?;
        assert!(matches!(
            attn.forward(&x, &x, &x, Some(&mask)),
            Err(AttentionError::InvalidShape { .. })
        ));
        Ok(())
    }

    #[test]
    fn parameter_names_are_scoped() -> Result<(), AttentionError> {
        let names: Vec<String> = layer(AttentionKind::Multiplicative, 8, 2)?
            .named_parameters("enc.0.self_attn")
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "enc.0.self_attn.fc_q.weight");
        assert_eq!(names[9], "enc.0.self_attn.scorer.w1.bias");
        Ok(())
    }
}
