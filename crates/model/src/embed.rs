//! Token plus learned-position input stage shared by the encoder and decoder.

use candle_core::{Device, Tensor, Var};
use embedding::{
    LearnedPositionalEmbedding, PositionalEmbeddingConfig, TokenEmbedding, TokenEmbeddingConfig,
};
use layers::Dropout;
use rand::{rngs::StdRng, Rng};

use crate::config::Seq2SeqConfig;
use crate::error::Result;

#[derive(Debug, Clone)]
pub(crate) struct ScaledEmbedding {
    tokens: TokenEmbedding,
    positions: LearnedPositionalEmbedding,
    scale: f64,
    dropout: Dropout,
}

impl ScaledEmbedding {
    pub(crate) fn new(
        config: &Seq2SeqConfig,
        vocab_size: usize,
        rng: &mut StdRng,
        device: &Device,
    ) -> Result<Self> {
        let tokens = TokenEmbedding::new(
            TokenEmbeddingConfig::new(vocab_size, config.hidden_dim),
            rng,
            device,
        )?;
        let positions = LearnedPositionalEmbedding::new(
            PositionalEmbeddingConfig::new(config.max_sequence_length, config.hidden_dim),
            rng,
            device,
        )?;
        let dropout = Dropout::new(config.dropout, rng.gen())?;
        Ok(Self {
            tokens,
            positions,
            scale: (config.hidden_dim as f64).sqrt(),
            dropout,
        })
    }

    pub(crate) fn set_training(&self, training: bool) {
        self.dropout.set_training(training);
    }

    pub(crate) fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let mut params = self.tokens.named_parameters(&format!("{scope}.tok_embedding"));
        params.extend(self.positions.named_parameters(&format!("{scope}.pos_embedding")));
        params
    }

    /// `dropout(tokens(ids) * sqrt(hidden_dim) + positions(0..len))`.
    pub(crate) fn forward(&self, ids: &Tensor) -> Result<Tensor> {
        let (_, len) = ids.dims2()?;
        let positions = self.positions.forward(len)?;
        let embedded = self
            .tokens
            .forward(ids)?
            .affine(self.scale, 0.0)?
            .broadcast_add(&positions)?;
        Ok(self.dropout.forward(&embedded)?)
    }
}
