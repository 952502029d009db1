//! Lightweight validation helpers shared across layer components.
//!
//! These routines provide concise shape assertions that can be wired into
//! constructors or forward paths. They return `candle_core::Result<()>` so call
//! sites can propagate errors without panicking. The `context` argument names
//! the tensor being checked and is echoed in the error message.

use candle_core::{Error, Result, Tensor};

/// Ensures a tensor matches the expected dimensions exactly.
pub fn expect_shape(context: &str, tensor: &Tensor, expected: &[usize]) -> Result<()> {
    let actual = tensor.dims();
    if actual == expected {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{context}: expected shape {:?}, got {:?}",
            expected, actual
        )))
    }
}

/// Ensures a tensor has the requested number of dimensions.
pub fn expect_rank(context: &str, tensor: &Tensor, rank: usize) -> Result<()> {
    let dims = tensor.dims();
    if dims.len() == rank {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{context}: expected rank {rank}, got {:?}",
            dims
        )))
    }
}

/// Validates the `(batch, seq, hidden)` convention with a known hidden size.
pub fn expect_batch_seq_hidden(context: &str, tensor: &Tensor, hidden: usize) -> Result<()> {
    match tensor.dims() {
        [_, _, actual_hidden] if *actual_hidden == hidden => Ok(()),
        dims => Err(Error::Msg(format!(
            "{context}: expected (batch, seq, {hidden}) layout, got {:?}",
            dims
        ))),
    }
}

/// Checks that the trailing dimension equals `features`.
pub fn expect_last_dim(context: &str, tensor: &Tensor, features: usize) -> Result<()> {
    match tensor.dims().last() {
        Some(last) if *last == features => Ok(()),
        _ => Err(Error::Msg(format!(
            "{context}: expected trailing dim {features}, got {:?}",
            tensor.dims()
        ))),
    }
}

/// Validates a dropout probability lies in `[0, 1)`.
pub fn expect_probability(context: &str, p: f32) -> Result<()> {
    if (0.0..1.0).contains(&p) {
        Ok(())
    } else {
        Err(Error::Msg(format!(
            "{context}: dropout probability must be in [0, 1), got {p}"
        )))
    }
}
