use attention::masks::{build_causal_mask, combine_padding_and_causal, padding_mask_from_ids};
use candle_core::{Device, Tensor, Var};
use layers::init::seeded_rng;

use crate::{
    config::Seq2SeqConfig,
    decoder::Decoder,
    encoder::Encoder,
    error::{ModelError, Result},
};

/// Encoder-decoder transformer mapping source token batches to target-vocabulary
/// logits.
#[derive(Debug)]
pub struct Seq2SeqTransformer {
    config: Seq2SeqConfig,
    device: Device,
    encoder: Encoder,
    decoder: Decoder,
}

impl Seq2SeqTransformer {
    /// Validates `config` and samples every parameter on `device`.
    pub fn new(config: &Seq2SeqConfig, device: &Device) -> Result<Self> {
        config.validate()?;
        let mut rng = seeded_rng(config.seed);
        let encoder = Encoder::new(config, &mut rng, device)?;
        let decoder = Decoder::new(config, &mut rng, device)?;
        let model = Self {
            config: config.clone(),
            device: device.clone(),
            encoder,
            decoder,
        };
        log::info!(
            "model::seq2seq init attention={} hidden_dim={} n_layers={} n_heads={} pf_dim={} activation={} dropout={} vocab={}->{} parameters={} device={:?}",
            config.attention,
            config.hidden_dim,
            config.n_layers,
            config.n_heads,
            config.pf_dim,
            config.activation,
            config.dropout,
            config.input_vocab_size,
            config.output_vocab_size,
            model.parameter_count(),
            device.location()
        );
        Ok(model)
    }

    pub fn config(&self) -> &Seq2SeqConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// `(src != src_pad_idx)` shaped `(batch, 1, 1, src_len)`.
    pub fn make_src_mask(&self, src: &Tensor) -> Result<Tensor> {
        let mask = padding_mask_from_ids(src, self.config.src_pad_idx)?;
        log::debug!("model::seq2seq src_mask dims={:?}", mask.dims());
        Ok(mask)
    }

    /// Target padding combined with a lower-triangular causal mask, shaped
    /// `(batch, 1, trg_len, trg_len)`.
    pub fn make_trg_mask(&self, trg: &Tensor) -> Result<Tensor> {
        let padding = padding_mask_from_ids(trg, self.config.trg_pad_idx)?;
        let (_, trg_len) = trg.dims2()?;
        let causal = build_causal_mask(trg.device(), trg_len, trg_len)?;
        let mask = combine_padding_and_causal(&padding, &causal)?;
        log::debug!("model::seq2seq trg_mask dims={:?}", mask.dims());
        Ok(mask)
    }

    /// Runs the encoder stack over `(batch, src_len)` ids.
    pub fn encode(&self, src: &Tensor, src_mask: &Tensor) -> Result<Tensor> {
        self.encoder.forward(src, Some(src_mask))
    }

    /// Runs the decoder stack against an already encoded source.
    pub fn decode(
        &self,
        trg: &Tensor,
        enc_src: &Tensor,
        trg_mask: &Tensor,
        src_mask: &Tensor,
    ) -> Result<(Tensor, Tensor)> {
        self.decoder
            .forward(trg, enc_src, Some(trg_mask), Some(src_mask))
    }

    /// Returns `(logits, attention)`: logits are
    /// `(batch, trg_len, output_vocab_size)`, attention is the final decoder
    /// layer's cross-attention `(batch, heads, trg_len, src_len)`.
    pub fn forward(&self, src: &Tensor, trg: &Tensor) -> Result<(Tensor, Tensor)> {
        let (src_batch, src_len) = src.dims2().map_err(|_| {
            ModelError::InvalidShape {
                context: format!("src must be [batch, src_len], got {:?}", src.dims()),
            }
        })?;
        let (trg_batch, trg_len) = trg.dims2().map_err(|_| {
            ModelError::InvalidShape {
                context: format!("trg must be [batch, trg_len], got {:?}", trg.dims()),
            }
        })?;
        if src_batch != trg_batch {
            return Err(ModelError::InvalidShape {
                context: format!("source batch {src_batch} differs from target batch {trg_batch}"),
            });
        }
        let max_len = self.config.max_sequence_length;
        if src_len > max_len || trg_len > max_len {
            return Err(ModelError::InvalidShape {
                context: format!(
                    "sequence lengths src={src_len} trg={trg_len} exceed max_sequence_length {max_len}"
                ),
            });
        }

        let src_mask = self.make_src_mask(src)?;
        let trg_mask = self.make_trg_mask(trg)?;
        let enc_src = self.encode(src, &src_mask)?;
        self.decode(trg, &enc_src, &trg_mask, &src_mask)
    }

    /// Switches every dropout in the model between training and evaluation.
    pub fn set_training(&self, training: bool) {
        self.encoder.set_training(training);
        self.decoder.set_training(training);
    }

    pub fn named_parameters(&self) -> Vec<(String, Var)> {
        let mut params = self.encoder.named_parameters("encoder");
        params.extend(self.decoder.named_parameters("decoder"));
        params
    }

    pub fn parameters(&self) -> Vec<Var> {
        self.named_parameters().into_iter().map(|(_, var)| var).collect()
    }

    /// Total number of learned scalars.
    pub fn parameter_count(&self) -> usize {
        self.named_parameters()
            .iter()
            .map(|(_, var)| var.elem_count())
            .sum()
    }
}
