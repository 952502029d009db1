//! Linear and affine projection helpers.
//!
//! Linear layers accept inputs of any rank whose trailing dimension equals
//! `input_dim` and return the same leading layout with `output_dim` features.
//! Leading axes are flattened for a single matmul, so the attention scorers can
//! project rank-5 broadcast tensors with the same layer type used for the
//! `(batch, seq, hidden)` projections.

use candle_core::{Device, Result, Tensor, Var};
use rand::rngs::StdRng;

use crate::{checks, init};

/// Configuration shared by dense projection layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConfig {
    /// Incoming feature dimension.
    pub input_dim: usize,
    /// Output feature dimension.
    pub output_dim: usize,
    /// Whether a learnable bias vector should be applied.
    pub bias: bool,
}

impl LinearConfig {
    /// Creates a configuration for a biased projection.
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        Self {
            input_dim,
            output_dim,
            bias: true,
        }
    }
}

/// Supported weight initialisation policies.
#[derive(Debug, Clone, PartialEq)]
pub enum LinearInit {
    /// Xavier/Glorot uniform initialisation.
    XavierUniform,
    /// Kaiming/He uniform initialisation with the given leaky slope.
    KaimingUniform { negative_slope: f64 },
}

impl LinearInit {
    /// Kaiming-uniform with slope `sqrt(5)`, i.e. `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`.
    pub fn torch_default() -> Self {
        LinearInit::KaimingUniform {
            negative_slope: 5f64.sqrt(),
        }
    }

    fn bound(&self, fan_in: usize, fan_out: usize) -> f64 {
        let (fan_in, fan_out) = (fan_in as f64, fan_out as f64);
        match self {
            LinearInit::XavierUniform => (6.0 / (fan_in + fan_out)).sqrt(),
            LinearInit::KaimingUniform { negative_slope } => {
                let gain = (2.0 / (1.0 + negative_slope.powi(2))).sqrt();
                3f64.sqrt() * gain / fan_in.sqrt()
            }
        }
    }

    fn sample(&self, rng: &mut StdRng, shape: (usize, usize), device: &Device) -> Result<Var> {
        let (out_dim, in_dim) = shape;
        init::uniform_var(rng, self.bound(in_dim, out_dim), shape, device)
    }
}

impl Default for LinearInit {
    fn default() -> Self {
        Self::torch_default()
    }
}

/// Dense affine projection with optional bias.
#[derive(Debug, Clone)]
pub struct Linear {
    config: LinearConfig,
    weight: Var,
    bias: Option<Var>,
}

impl Linear {
    /// Constructs a linear layer from pre-existing parameters.
    pub fn new(config: LinearConfig, weight: Tensor, bias: Option<Tensor>) -> Result<Self> {
        checks::expect_shape(
            "linear.weight",
            &weight,
            &[config.output_dim, config.input_dim],
        )?;
        let bias = match (config.bias, bias) {
            (true, Some(bias)) => {
                checks::expect_shape("linear.bias", &bias, &[config.output_dim])?;
                Some(Var::from_tensor(&bias)?)
            }
            (true, None) => candle_core::bail!("linear: config expects bias but none supplied"),
            (false, Some(_)) => candle_core::bail!("linear: bias provided but config disables bias"),
            (false, None) => None,
        };
        Ok(Self {
            weight: Var::from_tensor(&weight)?,
            bias,
            config,
        })
    }

    /// Builds a linear layer with weights sampled from `init` and a zero bias.
    pub fn with_init(
        config: LinearConfig,
        init: &LinearInit,
        rng: &mut StdRng,
        device: &Device,
    ) -> Result<Self> {
        if config.input_dim == 0 || config.output_dim == 0 {
            candle_core::bail!(
                "linear: input_dim and output_dim must be non-zero, got {}x{}",
                config.input_dim,
                config.output_dim
            );
        }
        let weight = init.sample(rng, (config.output_dim, config.input_dim), device)?;
        let bias = if config.bias {
            Some(Var::zeros(config.output_dim, candle_core::DType::F32, device)?)
        } else {
            None
        };
        Ok(Self {
            config,
            weight,
            bias,
        })
    }

    pub fn config(&self) -> &LinearConfig {
        &self.config
    }

    /// Returns the `(output_dim, input_dim)` weight tensor.
    pub fn weight(&self) -> &Tensor {
        self.weight.as_tensor()
    }

    pub fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref().map(Var::as_tensor)
    }

    /// Trainable parameters under `scope`, e.g. `scope.weight` and `scope.bias`.
    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let mut params = vec![(format!("{scope}.weight"), self.weight.clone())];
        if let Some(bias) = &self.bias {
            params.push((format!("{scope}.bias"), bias.clone()));
        }
        params
    }

    /// Applies `x · Wᵀ + b` over the trailing dimension.
    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        checks::expect_last_dim("linear.input", input, self.config.input_dim)?;
        let dims = input.dims();
        let rows: usize = dims[..dims.len() - 1].iter().product();

        let flat = input.reshape((rows, self.config.input_dim))?;
        let mut output = flat.matmul(&self.weight.as_tensor().t()?)?;
        if let Some(bias) = &self.bias {
            output = output.broadcast_add(bias.as_tensor())?;
        }

        let mut out_dims = dims.to_vec();
        if let Some(last) = out_dims.last_mut() {
            *last = self.config.output_dim;
        }
        output.reshape(out_dims)
    }
}
