//! Activations used between the feed-forward projections.
//!
//! * **ReLU** `max(0, x)`, the default for the position-wise feed-forward block.
//! * **GELU** uses the erf formulation `0.5 * x * (1 + erf(x / sqrt(2)))`.

use std::{fmt, str::FromStr};

use candle_core::{Error, Result, Tensor};

/// Identifies which non-linearity a feed-forward block applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivationKind {
    #[default]
    Relu,
    Gelu,
}

impl ActivationKind {
    pub fn forward(self, input: &Tensor) -> Result<Tensor> {
        match self {
            ActivationKind::Relu => input.relu(),
            ActivationKind::Gelu => input.gelu_erf(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivationKind::Relu => "relu",
            ActivationKind::Gelu => "gelu",
        }
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relu" => Ok(ActivationKind::Relu),
            "gelu" => Ok(ActivationKind::Gelu),
            other => Err(Error::Msg(format!("unsupported activation '{other}'"))),
        }
    }
}
