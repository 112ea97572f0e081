//! BERT encoder running locally on candle.
//!
//! Requires the `embeddings-candle` feature.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::sync::ApiBuilder;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

use crate::embedding::encoder::TextEncoder;
use crate::error::{Result, StrataError};

/// Longest input the model accepts, in tokens.
const MAX_SEQUENCE_LENGTH: usize = 512;

/// Encoder backed by a BERT checkpoint from the HuggingFace hub.
///
/// Vectors are the attention-masked mean of the last hidden state.
///
/// ```no_run
/// use strata::embedding::{CandleTextEncoder, TextEncoder};
///
/// # fn example() -> strata::error::Result<()> {
/// let encoder = CandleTextEncoder::new("bert-base-uncased")?;
/// let vector = encoder.encode("How do I join the course?")?;
/// assert_eq!(vector.len(), encoder.dimension());
/// # Ok(())
/// # }
/// ```
pub struct CandleTextEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    model_name: String,
}

impl CandleTextEncoder {
    /// Download (or reuse from the local hub cache) and load a model.
    pub fn new(model_name: &str) -> Result<Self> {
        let device = Device::cuda_if_available(0)
            .map_err(|e| StrataError::encoding(format!("device setup failed: {e}")))?;

        let cache_dir = std::env::var("HF_HOME")
            .or_else(|_| std::env::var("HOME").map(|home| format!("{home}/.cache/huggingface")))
            .unwrap_or_else(|_| "/tmp/huggingface".to_string());
        let api = ApiBuilder::new()
            .with_cache_dir(cache_dir.into())
            .build()
            .map_err(|e| StrataError::encoding(format!("hub initialization failed: {e}")))?;
        let repo = api.model(model_name.to_string());

        let config_path = repo
            .get("config.json")
            .map_err(|e| StrataError::encoding(format!("config download failed: {e}")))?;
        let config: Config = serde_json::from_str(&std::fs::read_to_string(config_path)?)?;

        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| StrataError::encoding(format!("weights download failed: {e}")))?;
        // SAFETY: the weights file is owned by the hub cache and not modified
        // while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(|e| StrataError::encoding(format!("weights load failed: {e}")))?
        };
        let model = BertModel::load(vb, &config)
            .map_err(|e| StrataError::encoding(format!("model load failed: {e}")))?;

        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| StrataError::encoding(format!("tokenizer download failed: {e}")))?;
        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| StrataError::encoding(format!("tokenizer load failed: {e}")))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| StrataError::encoding(format!("tokenizer setup failed: {e}")))?;

        info!(model = model_name, dimension = config.hidden_size, "Loaded text encoder");

        Ok(CandleTextEncoder {
            model,
            tokenizer,
            device,
            dimension: config.hidden_size,
            model_name: model_name.to_string(),
        })
    }

    fn forward(&self, text: &str) -> candle_core::Result<Tensor> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| candle_core::Error::Msg(format!("tokenization failed: {e}")))?;

        let ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let hidden = self.model.forward(&ids, &type_ids, Some(&mask))?;

        // masked mean over the sequence axis
        let mask = mask.unsqueeze(2)?.to_dtype(hidden.dtype())?.broadcast_as(hidden.shape())?;
        let summed = hidden.mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        summed.div(&counts)?.squeeze(0)
    }
}

impl TextEncoder for CandleTextEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.forward(text)
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| StrataError::encoding(format!("{}: {e}", self.model_name)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
