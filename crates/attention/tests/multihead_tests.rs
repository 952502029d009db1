use anyhow::Result;
use attention::masks::{
    build_causal_mask, combine_padding_and_causal, padding_mask_from_ids, padding_mask_from_lengths,
};
use attention::{AttentionKind, Config, MultiheadAttention};
use candle_core::{Device, Tensor};
use layers::{init::seeded_rng, linear::LinearInit};

fn build(kind: AttentionKind, dropout_p: f32) -> Result<MultiheadAttention> {
    let mut rng = seeded_rng(Some(3));
    let mut config = Config::new(kind, 32, 4);
    config.dropout_p = dropout_p;
    Ok(MultiheadAttention::new(
        &config,
        &LinearInit::default(),
        &mut rng,
        3,
        &Device::Cpu,
    )?)
}

fn weights_4d(weights: &Tensor) -> Result<Vec<Vec<Vec<Vec<f32>>>>> {
    let (b, h, _, _) = weights.dims4()?;
    let mut out = Vec::with_capacity(b);
    for bi in 0..b {
        let mut heads = Vec::with_capacity(h);
        for hi in 0..h {
            heads.push(weights.get(bi)?.get(hi)?.to_vec2::<f32>()?);
        }
        out.push(heads);
    }
    Ok(out)
}

#[test]
fn weights_are_row_stochastic_for_every_kind() -> Result<()> {
    let x = Tensor::randn(0f32, 1.0, (2, 5, 32), &Device::Cpu)?;
    for kind in AttentionKind::ALL {
        let attn = build(kind, 0.0)?;
        let (out, weights) = attn.forward(&x, &x, &x, None)?;
        assert_eq!(out.dims(), &[2, 5, 32]);
        assert_eq!(weights.dims(), &[2, 4, 5, 5]);
        for heads in weights_4d(&weights)? {
            for rows in heads {
                for row in rows {
                    let sum: f32 = row.iter().sum();
                    assert!((sum - 1.0).abs() < 1e-5, "{kind}: row sums to {sum}");
                    assert!(row.iter().all(|w| *w >= 0.0));
                }
            }
        }
    }
    Ok(())
}

#[test]
fn padded_keys_receive_no_weight() -> Result<()> {
    let device = Device::Cpu;
    let x = Tensor::randn(0f32, 10.0, (2, 6, 32), &device)?;
    let mask = padding_mask_from_lengths(&device, &[4, 2], 6)?;
    for kind in AttentionKind::ALL {
        let (_, weights) = build(kind, 0.0)?.forward(&x, &x, &x, Some(&mask))?;
        for (b, heads) in weights_4d(&weights)?.into_iter().enumerate() {
            let valid = [4, 2][b];
            for rows in heads {
                for row in rows {
                    assert!(row[valid..].iter().all(|w| *w < 1e-6), "{kind}: {row:?}");
                }
            }
        }
    }
    Ok(())
}

#[test]
fn causal_mask_hides_future_positions() -> Result<()> {
    let device = Device::Cpu;
    let ids = Tensor::new(&[[3u32, 8, 2, 9]], &device)?;
    let mask = combine_padding_and_causal(
        &padding_mask_from_ids(&ids, 0)?,
        &build_causal_mask(&device, 4, 4)?,
    )?;
    let x = Tensor::randn(0f32, 1.0, (1, 4, 32), &device)?;
    let (_, weights) = build(AttentionKind::Additive, 0.0)?.forward(&x, &x, &x, Some(&mask))?;
    for rows in &weights_4d(&weights)?[0] {
        for (i, row) in rows.iter().enumerate() {
            assert!(row[i + 1..].iter().all(|w| *w < 1e-6));
        }
    }
    Ok(())
}

#[test]
fn returned_weights_ignore_dropout() -> Result<()> {
    let x = Tensor::randn(0f32, 1.0, (1, 4, 32), &Device::Cpu)?;
    let attn = build(AttentionKind::General, 0.5)?;
    let (_, weights) = attn.forward(&x, &x, &x, None)?;
    let sums = weights.sum(3)?.flatten_all()?.to_vec1::<f32>()?;
    assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-5));
    Ok(())
}

#[test]
fn evaluation_mode_is_deterministic() -> Result<()> {
    let x = Tensor::randn(0f32, 1.0, (2, 3, 32), &Device::Cpu)?;
    let attn = build(AttentionKind::Multiplicative, 0.3)?;
    attn.set_training(false);
    let (a, _) = attn.forward(&x, &x, &x, None)?;
    let (b, _) = attn.forward(&x, &x, &x, None)?;
    let diff = a.sub(&b)?.abs()?.max_all()?.to_vec0::<f32>()?;
    assert_eq!(diff, 0.0);
    Ok(())
}

#[test]
fn same_seed_builds_same_layer() -> Result<()> {
    let x = Tensor::randn(0f32, 1.0, (1, 3, 32), &Device::Cpu)?;
    let (a, _) = build(AttentionKind::Additive, 0.0)?.forward(&x, &x, &x, None)?;
    let (b, _) = build(AttentionKind::Additive, 0.0)?.forward(&x, &x, &x, None)?;
    assert_eq!(
        a.flatten_all()?.to_vec1::<f32>()?,
        b.flatten_all()?.to_vec1::<f32>()?
    );
    Ok(())
}
