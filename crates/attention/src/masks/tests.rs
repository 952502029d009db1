use super::*;
use candle_core::{Device, Result};

#[test]
fn causal_mask_is_lower_triangular() -> Result<()> {
    let mask = build_causal_mask(&Device::Cpu, 3, 3)?;
    assert_eq!(mask.dtype(), MASK_DTYPE);
    assert_eq!(
        mask.to_vec2::<u8>()?,
        vec![vec![1, 0, 0], vec![1, 1, 0], vec![1, 1, 1]]
    );
    Ok(())
}

#[test]
fn causal_mask_respects_offsets() -> Result<()> {
    // Queries align with the trailing keys.
    let mask = build_causal_mask(&Device::Cpu, 2, 4)?;
    assert_eq!(mask.to_vec2::<u8>()?, vec![vec![1, 1, 1, 0], vec![1, 1, 1, 1]]);

    let mask = build_causal_mask(&Device::Cpu, 4, 2)?;
    assert_eq!(mask.to_vec2::<u8>()?[0], vec![1, 0]);
    assert_eq!(mask.to_vec2::<u8>()?[3], vec![1, 1]);
    Ok(())
}

#[test]
fn padding_mask_from_ids_marks_pad_tokens() -> Result<()> {
    let ids = Tensor::new(&[[5u32, 7, 0, 0], [0, 3, 4, 0]], &Device::Cpu)?;
    let mask = padding_mask_from_ids(&ids, 0)?;
    assert_eq!(mask.dims(), &[2, 1, 1, 4]);
    assert_eq!(
        mask.flatten_all()?.to_vec1::<u8>()?,
        vec![1, 1, 0, 0, 0, 1, 1, 0]
    );
    Ok(())
}

#[test]
fn padding_mask_from_ids_rejects_rank_three() -> Result<()> {
    let ids = Tensor::zeros((1, 2, 3), DType::U32, &Device::Cpu)?;
    assert!(padding_mask_from_ids(&ids, 0).is_err());
    Ok(())
}

#[test]
fn padding_mask_from_lengths_clamps() -> Result<()> {
    let mask = padding_mask_from_lengths(&Device::Cpu, &[2, 9], 3)?;
    assert_eq!(mask.dims(), &[2, 1, 1, 3]);
    assert_eq!(mask.flatten_all()?.to_vec1::<u8>()?, vec![1, 1, 0, 1, 1, 1]);
    Ok(())
}

#[test]
fn combined_target_mask_requires_both() -> Result<()> {
    let device = Device::Cpu;
    let ids = Tensor::new(&[[4u32, 9, 1]], &device)?;
    let padding = padding_mask_from_ids(&ids, 1)?;
    let causal = build_causal_mask(&device, 3, 3)?;
    let combined = combine_padding_and_causal(&padding, &causal)?;
    assert_eq!(combined.dims(), &[1, 1, 3, 3]);
    assert_eq!(
        combined.flatten_all()?.to_vec1::<u8>()?,
        vec![1, 0, 0, 1, 1, 0, 1, 1, 0]
    );
    Ok(())
}

#[test]
fn masked_fill_overwrites_suppressed_energy() -> Result<()> {
    let device = Device::Cpu;
    let energy = Tensor::new(&[[[[1f32, 2.0, 3.0]]]], &device)?;
    let mask = Tensor::new(&[[[[1u8, 0, 1]]]], &device)?;
    let filled = masked_fill(&energy, &mask)?.flatten_all()?.to_vec1::<f32>()?;
    assert_eq!(filled, vec![1.0, MASK_FILL, 3.0]);
    Ok(())
}
