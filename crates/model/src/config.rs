use std::path::Path;

use attention::AttentionKind;
use layers::ActivationKind;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Construction parameters for [`Seq2SeqTransformer`](crate::Seq2SeqTransformer).
///
/// Optional fields fall back to their defaults when absent from a
/// configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seq2SeqConfig {
    /// Scoring mechanism shared by every attention layer.
    pub attention: AttentionKind,
    pub input_vocab_size: usize,
    pub output_vocab_size: usize,
    pub hidden_dim: usize,
    pub n_layers: usize,
    pub n_heads: usize,
    /// Inner width of the position-wise feed-forward blocks.
    pub pf_dim: usize,
    #[serde(default)]
    pub dropout: f32,
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,
    pub src_pad_idx: u32,
    pub trg_pad_idx: u32,
    #[serde(default, with = "activation_name")]
    pub activation: ActivationKind,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    /// Seeds parameter initialisation and dropout streams.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_max_sequence_length() -> usize {
    100
}

fn default_layer_norm_eps() -> f64 {
    1e-5
}

impl Seq2SeqConfig {
    /// Configuration with the reference hyper-parameters (256 hidden, 3
    /// layers, 8 heads, 512 feed-forward, dropout 0.1, padding index 0).
    pub fn new(attention: AttentionKind, input_vocab_size: usize, output_vocab_size: usize) -> Self {
        Self {
            attention,
            input_vocab_size,
            output_vocab_size,
            hidden_dim: 256,
            n_layers: 3,
            n_heads: 8,
            pf_dim: 512,
            dropout: 0.1,
            max_sequence_length: default_max_sequence_length(),
            src_pad_idx: 0,
            trg_pad_idx: 0,
            activation: ActivationKind::default(),
            layer_norm_eps: default_layer_norm_eps(),
            seed: None,
        }
    }

    /// Loads a configuration from a `.toml` or `.json` file and validates it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let config: Self = match extension.as_deref() {
            Some("toml") => toml::from_str(&text)?,
            Some("json") => serde_json::from_str(&text)?,
            other => {
                return Err(ModelError::InvalidConfig(format!(
                    "unsupported configuration format {other:?} for {}",
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks structural invariants before any parameter is allocated.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("input_vocab_size", self.input_vocab_size),
            ("output_vocab_size", self.output_vocab_size),
            ("hidden_dim", self.hidden_dim),
            ("n_layers", self.n_layers),
            ("n_heads", self.n_heads),
            ("pf_dim", self.pf_dim),
            ("max_sequence_length", self.max_sequence_length),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ModelError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        self.attention_config().head_dim()?;
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::InvalidConfig(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.layer_norm_eps.is_nan() || self.layer_norm_eps <= 0.0 {
            return Err(ModelError::InvalidConfig(
                "layer_norm_eps must be positive".into(),
            ));
        }
        for (name, pad, vocab) in [
            ("src_pad_idx", self.src_pad_idx, self.input_vocab_size),
            ("trg_pad_idx", self.trg_pad_idx, self.output_vocab_size),
        ] {
            if pad as usize >= vocab {
                return Err(ModelError::InvalidConfig(format!(
                    "{name} {pad} is outside the vocabulary of size {vocab}"
                )));
            }
        }
        Ok(())
    }

    pub fn head_dim(&self) -> usize {
        self.hidden_dim / self.n_heads.max(1)
    }

    /// Settings shared by every attention layer in the model.
    pub fn attention_config(&self) -> attention::Config {
        let mut config = attention::Config::new(self.attention, self.hidden_dim, self.n_heads);
        config.dropout_p = self.dropout;
        config
    }
}

mod activation_name {
    use layers::ActivationKind;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(kind: &ActivationKind, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(kind.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ActivationKind, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attention::AttentionError;

    #[test]
    fn reference_configuration_is_valid() {
        let config = Seq2SeqConfig::new(AttentionKind::General, 1000, 1000);
        assert!(config.validate().is_ok());
        assert_eq!(config.head_dim(), 32);
    }

    #[test]
    fn uneven_head_split_is_rejected() {
        let mut config = Seq2SeqConfig::new(AttentionKind::Additive, 10, 10);
        config.hidden_dim = 100;
        config.n_heads = 7;
        assert!(matches!(
            config.validate(),
            Err(ModelError::Attention(AttentionError::InvalidHeadSplit { .. }))
        ));
    }

    #[test]
    fn zero_layers_are_rejected() {
        let mut config = Seq2SeqConfig::new(AttentionKind::General, 10, 10);
        config.n_layers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("n_layers"));
    }

    #[test]
    fn dropout_of_one_is_rejected() {
        let mut config = Seq2SeqConfig::new(AttentionKind::General, 10, 10);
        config.dropout = 1.0;
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn padding_index_must_be_in_vocab() {
        let mut config = Seq2SeqConfig::new(AttentionKind::General, 10, 10);
        config.trg_pad_idx = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_fill_optional_fields() -> Result<()> {
        let config: Seq2SeqConfig = toml::from_str(
            r#"
            attention = "Multiplicative"
            input_vocab_size = 50
            output_vocab_size = 60
            hidden_dim = 16
            n_layers = 1
            n_heads = 4
            pf_dim = 32
            src_pad_idx = 1
            trg_pad_idx = 1
            "#,
        )?;
        assert_eq!(config.attention, AttentionKind::Multiplicative);
        assert_eq!(config.max_sequence_length, 100);
        assert_eq!(config.activation, ActivationKind::Relu);
        assert_eq!(config.dropout, 0.0);
        assert_eq!(config.layer_norm_eps, 1e-5);
        assert_eq!(config.seed, None);
        Ok(())
    }

    #[test]
    fn unknown_mechanism_fails_to_deserialize() {
        let json = r#"{"attention":"cosine","input_vocab_size":5,"output_vocab_size":5,
            "hidden_dim":8,"n_layers":1,"n_heads":2,"pf_dim":8,"src_pad_idx":0,"trg_pad_idx":0}"#;
        let err = serde_json::from_str::<Seq2SeqConfig>(json).unwrap_err();
        assert!(err.to_string().contains("unsupported attention mechanism 'cosine'"));
    }

    #[test]
    fn activation_round_trips_by_name() -> Result<()> {
        let mut config = Seq2SeqConfig::new(AttentionKind::General, 10, 10);
        config.activation = ActivationKind::Gelu;
        let json = serde_json::to_string(&config)?;
        assert!(json.contains(r#""activation":"gelu""#));
        assert!(json.contains(r#""attention":"general""#));
        assert_eq!(serde_json::from_str::<Seq2SeqConfig>(&json)?, config);
        Ok(())
    }
}
