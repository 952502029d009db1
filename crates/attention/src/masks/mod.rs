//! Mask utilities shared by the attention layers.
//!
//! Masks are boolean `u8` tensors: `1` keeps a query/key pair, `0` suppresses
//! it. They only need to broadcast against the `[batch, heads, q_len, k_len]`
//! energy tensor, so padding masks are `[batch, 1, 1, k_len]` and target masks
//! `[batch, 1, t_len, t_len]`. Suppressed energies are overwritten with
//! [`MASK_FILL`] before the softmax.

pub mod causal;
pub mod padding;

use candle_core::{DType, Result, Tensor};

/// Dtype shared by all masks.
pub const MASK_DTYPE: DType = DType::U8;

/// Energy written into suppressed positions.
pub const MASK_FILL: f32 = -1e10;

pub use causal::build_causal_mask;
pub use padding::{padding_mask_from_ids, padding_mask_from_lengths};

/// Replaces every energy whose mask entry is `0` with [`MASK_FILL`].
pub fn masked_fill(energy: &Tensor, mask: &Tensor) -> Result<Tensor> {
    let mask = mask.to_dtype(MASK_DTYPE)?.broadcast_as(energy.dims())?;
    let fill = Tensor::full(MASK_FILL, energy.dims(), energy.device())?.to_dtype(energy.dtype())?;
    mask.where_cond(energy, &fill)
}

/// Logical AND of a `[batch, 1, 1, len]` padding mask and a `[len, len]`
/// causal mask, giving `[batch, 1, len, len]`.
pub fn combine_padding_and_causal(padding: &Tensor, causal: &Tensor) -> Result<Tensor> {
    let (batch, _, _, len) = padding.dims4()?;
    let causal = causal.to_dtype(MASK_DTYPE)?.reshape((1, 1, len, len))?;
    let padding = padding.to_dtype(MASK_DTYPE)?;
    padding
        .broadcast_as((batch, 1, len, len))?
        .mul(&causal.broadcast_as((batch, 1, len, len))?)
}

#[cfg(test)]
mod tests;
