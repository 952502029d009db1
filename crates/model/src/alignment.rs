//! Reading source/target alignments out of cross-attention weights.
//!
//! Both helpers take the `(batch, heads, trg_len, src_len)` weights returned by
//! [`Seq2SeqTransformer::forward`](crate::Seq2SeqTransformer::forward).

use candle_core::{DType, Tensor};

use crate::error::{ModelError, Result};

/// Mean over heads: `(batch, trg_len, src_len)`.
pub fn head_average(weights: &Tensor) -> Result<Tensor> {
    if weights.rank() != 4 {
        return Err(ModelError::InvalidShape {
            context: format!(
                "attention weights must be [batch, heads, trg_len, src_len], got {:?}",
                weights.dims()
            ),
        });
    }
    Ok(weights.mean(1)?)
}

/// For every batch item and target position, the source position with the
/// largest head-averaged weight.
pub fn hard_alignment(weights: &Tensor) -> Result<Vec<Vec<usize>>> {
    let best = head_average(weights)?.argmax(2)?.to_dtype(DType::U32)?;
    Ok(best
        .to_vec2::<u32>()?
        .into_iter()
        .map(|row| row.into_iter().map(|idx| idx as usize).collect())
        .collect())
}
