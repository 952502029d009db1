//! Parameter initialisation helpers.
//!
//! Every learnable tensor in the workspace is a [`Var`] sampled on the host
//! from a [`StdRng`] and then moved to the target device. Threading one RNG
//! through construction keeps model builds reproducible when a seed is given.

use candle_core::{Device, Error, Result, Shape, Tensor, Var};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};

/// Builds the parameter RNG, falling back to OS entropy when `seed` is `None`.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn sample<D: Distribution<f32>>(
    rng: &mut StdRng,
    dist: D,
    shape: Shape,
    device: &Device,
) -> Result<Var> {
    let data: Vec<f32> = (0..shape.elem_count()).map(|_| dist.sample(rng)).collect();
    let tensor = Tensor::from_vec(data, shape, device)?;
    Var::from_tensor(&tensor)
}

/// Samples `U(-bound, bound)`.
pub fn uniform_var<S: Into<Shape>>(
    rng: &mut StdRng,
    bound: f64,
    shape: S,
    device: &Device,
) -> Result<Var> {
    if !bound.is_finite() {
        return Err(Error::Msg(format!("uniform bound must be finite, got {bound}")));
    }
    let bound = bound.abs() as f32;
    sample(rng, Uniform::new_inclusive(-bound, bound), shape.into(), device)
}

/// Samples `N(mean, std^2)`.
pub fn normal_var<S: Into<Shape>>(
    rng: &mut StdRng,
    mean: f64,
    std: f64,
    shape: S,
    device: &Device,
) -> Result<Var> {
    let dist = Normal::new(mean as f32, std as f32)
        .map_err(|err| Error::Msg(format!("invalid normal distribution: {err}")))?;
    sample(rng, dist, shape.into(), device)
}
