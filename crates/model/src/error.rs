//! Errors surfaced by model construction, configuration loading and forward passes.

use attention::AttentionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid model input: {context}")]
    InvalidShape { context: String },
    #[error(transparent)]
    Attention(#[from] AttentionError),
    #[error(transparent)]
    Candle(#[from] candle_core::Error),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
