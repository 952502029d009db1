//! Builders for padding masks that drop filler key positions.
//!
//! Padding masks are shaped `[batch, 1, 1, k_len]` so they broadcast over
//! heads and queries.

use candle_core::{DType, Device, Error, Result, Tensor};

/// `1` where `token_ids[b, j] != pad_idx`, reshaped to `[batch, 1, 1, len]`.
pub fn padding_mask_from_ids(token_ids: &Tensor, pad_idx: u32) -> Result<Tensor> {
    let (batch, len) = token_ids.dims2().map_err(|_| {
        Error::Msg(format!(
            "padding mask expects token ids shaped [batch, len], got {:?}",
            token_ids.dims()
        ))
    })?;
    let ids = token_ids.to_dtype(DType::I64)?;
    let pad = Tensor::full(i64::from(pad_idx), (batch, len), ids.device())?;
    ids.ne(&pad)?.reshape((batch, 1, 1, len))
}

/// Masks every key at or beyond the per-batch valid length.
///
/// Lengths larger than `k_len` are clamped, leaving the whole row visible.
pub fn padding_mask_from_lengths(
    device: &Device,
    key_lengths: &[usize],
    k_len: usize,
) -> Result<Tensor> {
    let batch = key_lengths.len();
    let data: Vec<u8> = key_lengths
        .iter()
        .flat_map(|&valid| {
            let valid = valid.min(k_len);
            (0..k_len).map(move |k| u8::from(k < valid))
        })
        .collect();
    Tensor::from_vec(data, (batch, 1, 1, k_len), device)
}
