//! Energy functions comparing per-head queries against keys.
//!
//! Inputs are `[batch, heads, q_len, head_dim]` queries and
//! `[batch, heads, k_len, head_dim]` keys; every scorer returns raw, unscaled
//! energies shaped `[batch, heads, q_len, k_len]`.

mod additive;
mod general;
mod multiplicative;

use candle_core::{Device, Tensor, Var};
use layers::linear::LinearInit;
use rand::rngs::StdRng;

pub use additive::Additive;
pub use general::General;
pub use multiplicative::Multiplicative;

use crate::core::{AttentionError, AttentionKind};

/// One capability: compute `energy(Q, K)`.
pub trait EnergyScore {
    fn energy(&self, q: &Tensor, k: &Tensor) -> Result<Tensor, AttentionError>;

    /// Learned parameters of the scorer under `scope`.
    fn named_parameters(&self, scope: &str) -> Vec<(String, Var)>;
}

/// The scorer selected for an attention layer, fixed at construction.
#[derive(Debug, Clone)]
pub enum Scorer {
    General(General),
    Multiplicative(Multiplicative),
    Additive(Additive),
}

impl Scorer {
    pub fn new(
        kind: AttentionKind,
        head_dim: usize,
        init: &LinearInit,
        rng: &mut StdRng,
        device: &Device,
    ) -> Result<Self, AttentionError> {
        Ok(match kind {
            AttentionKind::General => Scorer::General(General),
            AttentionKind::Multiplicative => {
                Scorer::Multiplicative(Multiplicative::new(head_dim, init, rng, device)?)
            }
            AttentionKind::Additive => Scorer::Additive(Additive::new(head_dim, init, rng, device)?),
        })
    }

    pub fn kind(&self) -> AttentionKind {
        match self {
            Scorer::General(_) => AttentionKind::General,
            Scorer::Multiplicative(_) => AttentionKind::Multiplicative,
            Scorer::Additive(_) => AttentionKind::Additive,
        }
    }
}

fn validate_qk(q: &Tensor, k: &Tensor) -> Result<(), AttentionError> {
    let (qb, qh, _, qd) = q.dims4().map_err(|_| AttentionError::InvalidShape {
        context: format!("q must be [batch, heads, q_len, head_dim], got {:?}", q.dims()),
    })?;
    let (kb, kh, _, kd) = k.dims4().map_err(|_| AttentionError::InvalidShape {
        context: format!("k must be [batch, heads, k_len, head_dim], got {:?}", k.dims()),
    })?;
    if qb != kb || qh != kh || qd != kd {
        return Err(AttentionError::InvalidShape {
            context: format!("q {:?} and k {:?} disagree on batch, heads or head_dim", q.dims(), k.dims()),
        });
    }
    Ok(())
}

impl EnergyScore for Scorer {
    fn energy(&self, q: &Tensor, k: &Tensor) -> Result<Tensor, AttentionError> {
        validate_qk(q, k)?;
        match self {
            Scorer::General(inner) => inner.energy(q, k),
            Scorer::Multiplicative(inner) => inner.energy(q, k),
            Scorer::Additive(inner) => inner.energy(q, k),
        }
    }

    fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        match self {
            Scorer::General(inner) => inner.named_parameters(scope),
            Scorer::Multiplicative(inner) => inner.named_parameters(scope),
            Scorer::Additive(inner) => inner.named_parameters(scope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layers::init::seeded_rng;

    fn scorer(kind: AttentionKind, head_dim: usize) -> Result<Scorer, AttentionError> {
        let mut rng = seeded_rng(Some(9));
        Scorer::new(kind, head_dim, &LinearInit::default(), &mut rng, &Device::Cpu)
    }

    #[test]
    fn every_variant_produces_query_by_key_energy() -> Result<(), AttentionError> {
        let device = Device::Cpu;
        let q = Tensor::randn(0f32, 1.0, (2, 4, 6, 8), &device)?;
        let k = Tensor::randn(0f32, 1.0, (2, 4, 6, 8), &device)?;
        let k_long = Tensor::randn(0f32, 1.0, (2, 4, 9, 8), &device)?;
        for kind in AttentionKind::ALL {
            let scorer = scorer(kind, 8)?;
            assert_eq!(scorer.kind(), kind);
            assert_eq!(scorer.energy(&q, &k)?.dims(), &[2, 4, 6, 6], "{kind}");
            assert_eq!(scorer.energy(&q, &k_long)?.dims(), &[2, 4, 6, 9], "{kind}");
        }
        Ok(())
    }

    #[test]
    fn general_is_plain_dot_product() -> Result<(), AttentionError> {
        let device = Device::Cpu;
        let q = Tensor::new(&[[[[1f32, 2.0], [0.0, 1.0]]]], &device)?;
        let k = Tensor::new(&[[[[3f32, 1.0], [-1.0, 4.0], [0.5, 0.5]]]], &device)?;
        let energy = scorer(AttentionKind::General, 2)?.energy(&q, &k)?;
        assert_eq!(
            energy.flatten_all()?.to_vec1::<f32>()?,
            vec![5.0, 7.0, 1.5, 1.0, 4.0, 0.5]
        );
        Ok(())
    }

    #[test]
    fn multiplicative_matches_manual_projection() -> Result<(), AttentionError> {
        let device = Device::Cpu;
        let scorer = scorer(AttentionKind::Multiplicative, 4)?;
        let Scorer::Multiplicative(inner) = &scorer else {
            panic!("expected multiplicative scorer");
        };
        let q = Tensor::randn(0f32, 1.0, (1, 2, 3, 4), &device)?;
        let k = Tensor::randn(0f32, 1.0, (1, 2, 5, 4), &device)?;
        let params = inner.named_parameters("m");
        let (w1, b1) = (&params[0].1, &params[1].1);
        let manual = q
            .broadcast_matmul(&w1.as_tensor().t()?)?
            .broadcast_add(b1.as_tensor())?
            .matmul(&k.transpose(2, 3)?.contiguous()?)?;
        let diff = scorer.energy(&q, &k)?.sub(&manual)?.abs()?.max_all()?.to_vec0::<f32>()?;
        assert!(diff < 1e-5);
        Ok(())
    }

    #[test]
    fn additive_matches_manual_formula() -> Result<(), AttentionError> {
        let device = Device::Cpu;
        let (head_dim, q_len, k_len) = (3, 2, 4);
        let scorer = scorer(AttentionKind::Additive, head_dim)?;
        let q = Tensor::randn(0f32, 1.0, (1, 1, q_len, head_dim), &device)?;
        let k = Tensor::randn(0f32, 1.0, (1, 1, k_len, head_dim), &device)?;
        let energy = scorer.energy(&q, &k)?;
        assert_eq!(energy.dims(), &[1, 1, q_len, k_len]);
        let energy = energy.squeeze(0)?.squeeze(0)?.to_vec2::<f32>()?;

        let params = scorer.named_parameters("a");
        let matrix = |idx: usize| params[idx].1.as_tensor().to_vec2::<f32>();
        let vector = |idx: usize| params[idx].1.as_tensor().to_vec1::<f32>();
        let (w1, b1, w2, b2) = (matrix(0)?, vector(1)?, matrix(2)?, vector(3)?);
        let (v, vb) = (matrix(4)?, vector(5)?);
        let q = q.squeeze(0)?.squeeze(0)?.to_vec2::<f32>()?;
        let k = k.squeeze(0)?.squeeze(0)?.to_vec2::<f32>()?;

        let affine = |w: &[Vec<f32>], b: &[f32], x: &[f32], row: usize| {
            b[row] + w[row].iter().zip(x).map(|(a, b)| a * b).sum::<f32>()
        };
        for i in 0..q_len {
            for j in 0..k_len {
                let mut expected = vb[0];
                for d in 0..head_dim {
                    let feature = (affine(&w1, &b1, &q[i], d) + affine(&w2, &b2, &k[j], d)).tanh();
                    expected += v[0][d] * feature;
                }
                assert!((energy[i][j] - expected).abs() < 1e-5, "({i}, {j})");
            }
        }
        Ok(())
    }

    #[test]
    fn parameter_counts_follow_variant() -> Result<(), AttentionError> {
        assert!(scorer(AttentionKind::General, 8)?.named_parameters("s").is_empty());
        assert_eq!(scorer(AttentionKind::Multiplicative, 8)?.named_parameters("s").len(), 2);
        let additive: Vec<String> = scorer(AttentionKind::Additive, 8)?
            .named_parameters("s")
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            additive,
            vec!["s.w1.weight", "s.w1.bias", "s.w2.weight", "s.w2.bias", "s.v.weight", "s.v.bias"]
        );
        Ok(())
    }

    #[test]
    fn mismatched_heads_are_rejected() -> Result<(), AttentionError> {
        let device = Device::Cpu;
        let q = Tensor::zeros((1, 2, 3, 4), candle_core::DType::F32, &device)?;
        let k = Tensor::zeros((1, 3, 3, 4), candle_core::DType::F32, &device)?;
        let err = scorer(AttentionKind::General, 4)?.energy(&q, &k).unwrap_err();
        assert!(matches!(err, AttentionError::InvalidShape { .. }));
        Ok(())
    }
}
