//! Construction-time options for multi-head attention.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::AttentionError;

/// Scoring mechanism used to compare queries with keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AttentionKind {
    /// `Q · Kᵀ`.
    General,
    /// `(Q · W1) · Kᵀ`.
    Multiplicative,
    /// `V · tanh(W1·Q + W2·K)`.
    Additive,
}

impl AttentionKind {
    pub const ALL: [AttentionKind; 3] = [
        AttentionKind::General,
        AttentionKind::Multiplicative,
        AttentionKind::Additive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttentionKind::General => "general",
            AttentionKind::Multiplicative => "multiplicative",
            AttentionKind::Additive => "additive",
        }
    }
}

impl fmt::Display for AttentionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttentionKind {
    type Err = AttentionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(AttentionKind::General),
            "multiplicative" => Ok(AttentionKind::Multiplicative),
            "additive" => Ok(AttentionKind::Additive),
            _ => Err(AttentionError::UnsupportedMechanism {
                name: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for AttentionKind {
    type Error = AttentionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttentionKind> for String {
    fn from(kind: AttentionKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Shape and regularisation settings for a [`MultiheadAttention`](crate::MultiheadAttention) layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub kind: AttentionKind,
    pub hidden_dim: usize,
    pub n_heads: usize,
    /// Probability for dropout applied to attention weights during training.
    pub dropout_p: f32,
}

impl Config {
    pub fn new(kind: AttentionKind, hidden_dim: usize, n_heads: usize) -> Self {
        Self {
            kind,
            hidden_dim,
            n_heads,
            dropout_p: 0.0,
        }
    }

    /// Checks the head split and returns `head_dim`.
    pub fn head_dim(&self) -> Result<usize, AttentionError> {
        if self.n_heads == 0 || self.hidden_dim == 0 || self.hidden_dim % self.n_heads != 0 {
            return Err(AttentionError::InvalidHeadSplit {
                hidden_dim: self.hidden_dim,
                n_heads: self.n_heads,
            });
        }
        Ok(self.hidden_dim / self.n_heads)
    }
}
