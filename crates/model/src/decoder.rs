use attention::MultiheadAttention;
use candle_core::{Device, Tensor, Var};
use layers::{Linear, LinearConfig, LinearInit, PositionwiseFeedForward, Residual};
use rand::{rngs::StdRng, Rng};

use crate::config::Seq2SeqConfig;
use crate::embed::ScaledEmbedding;
use crate::encoder::{feed_forward, residual_config};
use crate::error::{ModelError, Result};

/// Masked self-attention, cross-attention over the encoder output and a
/// feed-forward block, each wrapped in a post-norm residual.
#[derive(Debug)]
pub struct DecoderLayer {
    self_attention: MultiheadAttention,
    self_attention_residual: Residual,
    encoder_attention: MultiheadAttention,
    encoder_attention_residual: Residual,
    feed_forward: PositionwiseFeedForward,
    feed_forward_residual: Residual,
}

impl DecoderLayer {
    pub fn new(config: &Seq2SeqConfig, rng: &mut StdRng, device: &Device) -> Result<Self> {
        let attention_config = config.attention_config();
        let init = LinearInit::default();

        let seed = rng.gen();
        let self_attention = MultiheadAttention::new(&attention_config, &init, rng, seed, device)?;
        let self_attention_residual = Residual::new(residual_config(config), rng.gen(), device)?;

        let seed = rng.gen();
        let encoder_attention =
            MultiheadAttention::new(&attention_config, &init, rng, seed, device)?;
        let encoder_attention_residual = Residual::new(residual_config(config), rng.gen(), device)?;

        let feed_forward = feed_forward(config, rng, device)?;
        let feed_forward_residual = Residual::new(residual_config(config), rng.gen(), device)?;

        Ok(Self {
            self_attention,
            self_attention_residual,
            encoder_attention,
            encoder_attention_residual,
            feed_forward,
            feed_forward_residual,
        })
    }

    pub fn set_training(&self, training: bool) {
        self.self_attention.set_training(training);
        self.self_attention_residual.set_training(training);
        self.encoder_attention.set_training(training);
        self.encoder_attention_residual.set_training(training);
        self.feed_forward.set_training(training);
        self.feed_forward_residual.set_training(training);
    }

    pub fn named_parameters(&self, scope: &str) -> Vec<(String, Var)> {
        let mut params = self.self_attention.named_parameters(&format!("{scope}.self_attention"));
        params.extend(
            self.self_attention_residual
                .named_parameters(&format!("{scope}.self_attn_layer_norm")),
        );
        params.extend(
            self.encoder_attention
                .named_parameters(&format!("{scope}.encoder_attention")),
        );
        params.extend(
            self.encoder_attention_residual
                .named_parameters(&format!("{scope}.enc_attn_layer_norm")),
        );
        params.extend(self.feed_forward.named_parameters(&format!("{scope}.positionwise_feedforward")));
        params.extend(
            self.feed_forward_residual
                .named_parameters(&format!("{scope}.ff_layer_norm")),
        );
        params
    }

    /// Returns the updated target states and the cross-attention weights
    /// `(batch, heads, trg_len, src_len)`.
    pub fn forward(
        &self,
        trg: &Tensor,
        enc_src: &Tensor,
        trg_mask: Option<&Tensor>,
        src_mask: Option<&Tensor>,
    ) -> Result<(Tensor, Tensor)> {
        let (attended, _) = self.self_attention.forward(trg, trg, trg, trg_mask)?;
        let trg = self.self_attention_residual.forward(&attended, trg)?;

        let (attended, attention) =
            self.encoder_attention
                .forward(&trg, enc_src, enc_src, src_mask)?;
        let trg = self.encoder_attention_residual.forward(&attended, &trg)?;

        let transformed = self.feed_forward.forward(&trg)?;
        let trg = self.feed_forward_residual.forward(&transformed, &trg)?;
        Ok((trg, attention))
    }
}

/// Embedding stage, a stack of [`DecoderLayer`]s and the vocabulary projection.
#[derive(Debug)]
pub struct Decoder {
    embedding: ScaledEmbedding,
    layers: Vec<DecoderLayer>,
    fc_out: Linear,
}

impl Decoder {
    pub fn new(config: &Seq2SeqConfig, rng: &mut StdRng, device: &Device) -> Result<Self> {
        if config.n_layers == 0 {
            return Err(ModelError::InvalidConfig(
                "decoder requires at least one layer".into(),
            ));
        }
        let embedding = ScaledEmbedding::new(config, config.output_vocab_size, rng, device)?;
        let layers = (0..config.n_layers)
            .map(|_| DecoderLayer::new(config, rng, device))
            .collect::<Result<Vec<_>>>()?;
        let fc_out = Linear::with_init(
            LinearConfig::new(config.hidden_dim, config.output_vocab_size),
            &LinearInit::default(),
            rng,
            device,
        )?;
        Ok(Self {
            embedding,
            layers,
            fc_out,
        })
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
        params.extend(self.fc_out.named_parameters(&format!("{scope}.fc_out")));
        params
    }

    /// Produces logits `(batch, trg_len, output_vocab_size)` and the last
    /// layer's cross-attention weights.
    pub fn forward(
        &self,
        trg: &Tensor,
        enc_src: &Tensor,
        trg_mask: Option<&Tensor>,
        src_mask: Option<&Tensor>,
    ) -> Result<(Tensor, Tensor)> {
        let mut hidden = self.embedding.forward(trg)?;
        let mut attention = None;
        for layer in &self.layers {
            let (next, weights) = layer.forward(&hidden, enc_src, trg_mask, src_mask)?;
            hidden = next;
            attention = Some(weights);
        }
        let attention = attention.ok_or_else(|| {
            ModelError::InvalidConfig("decoder requires at least one layer".into())
        })?;
        let logits = self.fc_out.forward(&hidden)?;
        Ok((logits, attention))
    }
}
