//! Seeded inverted dropout with an explicit training switch.
//!
//! Masks are sampled on the host from a per-layer [`StdRng`] so that runs with
//! a fixed seed replay the same dropout pattern. Kept activations are scaled by
//! `1 / (1 - p)`; in evaluation mode, or when `p == 0`, the input is returned
//! untouched.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use candle_core::{Error, Result, Tensor};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::checks;

/// Dropout policy for a single layer.
#[derive(Debug)]
pub enum DropoutMode {
    /// Dropout is disabled (probability zero).
    Disabled,
    /// Dropout is active with the supplied probability and RNG stream.
    Enabled { probability: f32, rng: Mutex<StdRng> },
}

impl Clone for DropoutMode {
    fn clone(&self) -> Self {
        match self {
            DropoutMode::Disabled => DropoutMode::Disabled,
            DropoutMode::Enabled { probability, rng } => {
                let state = match rng.lock() {
                    Ok(guard) => guard.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                };
                DropoutMode::Enabled {
                    probability: *probability,
                    rng: Mutex::new(state),
                }
            }
        }
    }
}

impl DropoutMode {
    /// Builds a mode from a probability in `[0, 1)`; `0.0` disables dropout.
    pub fn from_probability(probability: f32, seed: u64) -> Result<Self> {
        checks::expect_probability("dropout", probability)?;
        if probability == 0.0 {
            Ok(DropoutMode::Disabled)
        } else {
            Ok(DropoutMode::Enabled {
                probability,
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
            })
        }
    }

    pub fn probability(&self) -> f32 {
        match self {
            DropoutMode::Disabled => 0.0,
            DropoutMode::Enabled { probability, .. } => *probability,
        }
    }
}

/// Dropout layer; starts in training mode.
pub struct Dropout {
    mode: DropoutMode,
    training: AtomicBool,
}

impl Clone for Dropout {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode.clone(),
            training: AtomicBool::new(self.is_training()),
        }
    }
}

impl fmt::Debug for Dropout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dropout")
            .field("p", &self.mode.probability())
            .field("training", &self.is_training())
            .finish()
    }
}

impl Dropout {
    pub fn new(probability: f32, seed: u64) -> Result<Self> {
        Ok(Self {
            mode: DropoutMode::from_probability(probability, seed)?,
            training: AtomicBool::new(true),
        })
    }

    pub fn probability(&self) -> f32 {
        self.mode.probability()
    }

    pub fn set_training(&self, training: bool) {
        self.training.store(training, Ordering::Relaxed);
    }

    pub fn is_training(&self) -> bool {
        self.training.load(Ordering::Relaxed)
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        if !self.is_training() {
            return Ok(input.clone());
        }
        match &self.mode {
            DropoutMode::Disabled => Ok(input.clone()),
            DropoutMode::Enabled { probability, rng } => {
                let keep_prob = 1.0 - probability;
                let scale = 1.0 / keep_prob;
                let mask_data: Vec<f32> = {
                    let mut rng = rng
                        .lock()
                        .map_err(|_| Error::Msg("dropout RNG mutex poisoned".into()))?;
                    (0..input.elem_count())
                        .map(|_| if rng.gen::<f32>() < keep_prob { scale } else { 0.0 })
                        .collect()
                };
                let mask = Tensor::from_vec(mask_data, input.dims().to_vec(), input.device())?
                    .to_dtype(input.dtype())?;
                input.mul(&mask)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn dropout_preserves_expectation() -> Result<()> {
        let dropout = Dropout::new(0.25, 123)?;
        let input = Tensor::ones((4, 8, 16), DType::F32, &Device::Cpu)?;
        let values = dropout.forward(&input)?.flatten_all()?.to_vec1::<f32>()?;
        let mean = values.iter().sum::<f32>() / values.len() as f32;
        assert!((mean - 1.0).abs() < 0.1);
        assert!(values.iter().any(|v| *v == 0.0));
        Ok(())
    }

    #[test]
    fn dropout_disabled_in_evaluation() -> Result<()> {
        let dropout = Dropout::new(0.5, 0)?;
        dropout.set_training(false);
        let input = Tensor::randn(0f32, 1.0, (2, 2, 4), &Device::Cpu)?;
        let out = dropout.forward(&input)?;
        let diff = input.sub(&out)?.abs()?.max_all()?.to_vec0::<f32>()?;
        assert_eq!(diff, 0.0);
        Ok(())
    }

    #[test]
    fn same_seed_same_mask() -> Result<()> {
        let input = Tensor::ones((3, 5, 7), DType::F32, &Device::Cpu)?;
        let a = Dropout::new(0.5, 42)?.forward(&input)?.flatten_all()?.to_vec1::<f32>()?;
        let b = Dropout::new(0.5, 42)?.forward(&input)?.flatten_all()?.to_vec1::<f32>()?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn rejects_probability_of_one() {
        assert!(Dropout::new(1.0, 0).is_err());
    }
}
