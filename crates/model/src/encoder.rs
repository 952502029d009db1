use attention::MultiheadAttention;
use candle_core::{Device, Tensor, Var};
use layers::{
    FeedForwardConfig, LinearInit, PositionwiseFeedForward, Residual, ResidualConfig,
};
use rand::{rngs::StdRng, Rng};

use crate::config::Seq2SeqConfig;
use crate::embed::ScaledEmbedding;
use crate::error::{ModelError, Result};

pub(crate) fn residual_config(config: &Seq2SeqConfig) -> ResidualConfig {
    let mut residual = ResidualConfig::new(config.hidden_dim);
    residual.dropout_p = config.dropout;
    residual.norm_epsilon = config.layer_norm_eps;
    residual
}

pub(crate) fn feed_forward(
    config: &Seq2SeqConfig,
    rng: &mut StdRng,
    device: &Device,
) -> Result<PositionwiseFeedForward> {
    let mut ff = FeedForwardConfig::new(config.hidden_dim, config.pf_dim);
    ff.activation = config.activation;
    ff.dropout_p = config.dropout;
    let seed = rng.gen();
    Ok(PositionwiseFeedForward::new(ff, &LinearInit::default(), rng, seed, device)?)
}

/// Self-attention and feed-forward sublayers, each wrapped in a post-norm
/// residual.
#[derive(Debug)]
pub struct EncoderLayer {
    self_attention: MultiheadAttention,
    self_attention_residual: Residual,
    feed_forward: PositionwiseFeedForward,
    feed_forward_residual: Residual,
}

impl EncoderLayer {
    pub fn new(config: &Seq2SeqConfig, rng: &mut StdRng, device: &Device) -> Result<Self> {
        let attn_seed = rng.gen();
        let self_attention = MultiheadAttention::new(
            &config.attention_config(),
            &LinearInit::default(),
            rng,
            attn_seed,
            device,
        )?;
        let self_attention_residual = Residual::new(residual_config(config), rng.gen(), device)?;
        let feed_forward = feed_forward(config, rng, device)?;
        let feed_forward_residual = Residual::new(residual_config(config), rng.gen(), device)?;
        Ok(Self {
            self_attention,
            self_attention_residual,
            feed_forward,
            feed_forward_residual,
        })
    }

    pub fn set_training(&self, training: bool) {
        self.self_attention.set_training(training);
        self.self_attention_residual.set_training(training);
        self.feed_forward.set_training(training);
        self.feed_forward_residual.set_training(training);
    }

    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let mut params = self.self_attention.named_parameters(&format!("{scope}.self_attention"));
        params.extend(
            self.self_attention_residual
                .named_parameters(&format!("{scope}.self_attn_layer_norm")),
        );
        params.extend(self.feed_forward.named_parameters(&format!("{scope}.positionwise_feedforward")));
        params.extend(
            self.feed_forward_residual
                .named_parameters(&format!("{scope}.ff_layer_norm")),
        );
        params
    }

    /// `src`: `(batch, src_len, hidden)`; `src_mask`: `(batch, 1, 1, src_len)`.
    pub fn forward(&self, src: &Tensor, src_mask: Option<&Tensor>) -> Result<Tensor> {
        let (attended, _) = self.self_attention.forward(src, src, src, src_mask)?;
        let src = self.self_attention_residual.forward(&attended, src)?;
        let transformed = self.feed_forward.forward(&src)?;
        Ok(self.feed_forward_residual.forward(&transformed, &src)?)
    }
}

/// Embedding stage followed by a stack of [`EncoderLayer`]s.
#[derive(Debug)]
pub struct Encoder {
    embedding: ScaledEmbedding,
    layers: Vec<EncoderLayer>,
}

impl Encoder {
    pub fn new(config: &Seq2SeqConfig, rng: &mut StdRng, device: &Device) -> Result<Self> {
        if config.n_layers == 0 {
            return Err(ModelError::InvalidConfig(
                "encoder requires at least one layer".into(),
            ));
        }
        let embedding = ScaledEmbedding::new(config, config.input_vocab_size, rng, device)?;
        let layers = (0..config.n_layers)
            .map(|_| EncoderLayer::new(config, rng, device))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { embedding, layers })
    }

    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn set_training(&self, training: bool) {
        self.embedding.set_training(training);
        for layer in &self.layers {
            layer.set_training(training);
        }
    }

    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let mut params = self.embedding.named_parameters(scope);
        for (idx, layer) in self.layers.iter().enumerate() {
            params.extend(layer.named_parameters(&format!("{scope}.layers.{idx}")));
        }
        params
    }

    /// Encodes `(batch, src_len)` token ids into `(batch, src_len, hidden)`.
    pub fn forward(&self, src: &Tensor, src_mask: Option<&Tensor>) -> Result<Tensor> {
        let mut hidden = self.embedding.forward(src)?;
        for layer in &self.layers {
            hidden = layer.forward(&hidden, src_mask)?;
        }
        Ok(hidden)
    }
}
