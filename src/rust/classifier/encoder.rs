use ndarray::Array2;
use std::path::Path;
use tokenizers::{
    PaddingParams, Tokenizer, TruncationDirection, TruncationParams, TruncationStrategy,
};

use super::error::{ModelLoadError, PredictionError};

/// Longest token sequence fed to the classifier. Longer inputs keep their head.
pub const MAX_SEQUENCE_LENGTH: usize = 512;

/// Fixed-width model inputs for a batch of one, each of shape `[1, seq_len]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedInput {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
    pub token_type_ids: Array2<i64>,
}

impl EncodedInput {
    /// Builds inputs from raw token ids, marking every position as attended.
    pub fn from_ids(ids: &[u32]) -> Self {
        let len = ids.len();
        Self {
            input_ids: Array2::from_shape_fn((1, len), |(_, i)| i64::from(ids[i])),
            attention_mask: Array2::ones((1, len)),
            token_type_ids: Array2::zeros((1, len)),
        }
    }

    pub fn seq_len(&self) -> usize {
        self.input_ids.ncols()
    }
}

/// Turns text into model inputs.
///
/// Implementations must be usable from several request handlers at once.
pub trait TextEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<EncodedInput, PredictionError>;
}

/// [`TextEncoder`] backed by a HuggingFace `tokenizer.json`.
///
/// The tokenizer is configured once at load time to truncate from the right
/// (keeping the head of the text) and to pad to the longest sequence in the
/// batch; after that it is only read.
#[derive(Debug)]
pub struct TokenizerEncoder {
    tokenizer: Tokenizer,
    max_length: usize,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<TokenizerEncoder>();
    }
};

impl TokenizerEncoder {
    pub fn from_file(path: &Path, max_length: usize) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::MissingFile(path.to_path_buf()));
        }
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            log::error!("Failed to load tokenizer from {:?}: {}", path, e);
            ModelLoadError::Tokenizer(e.to_string())
        })?;
        log::info!("Tokenizer loaded successfully");
        Self::new(tokenizer, max_length)
    }

    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self, ModelLoadError> {
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                strategy: TruncationStrategy::LongestFirst,
                direction: TruncationDirection::Right,
                stride: 0,
            }))
            .map_err(|e| ModelLoadError::Tokenizer(e.to_string()))?;

        // Keep the model's own padding token when tokenizer.json declares one.
        if tokenizer.get_padding().is_none() {
            tokenizer.with_padding(Some(PaddingParams::default()));
        }

        Ok(Self { tokenizer, max_length })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Counts the tokens the model would see for `text`, after truncation.
    pub fn count_tokens(&self, text: &str) -> Result<usize, PredictionError> {
        self.tokenizer
            .encode(text, true)
            .map(|encoding| encoding.get_ids().len())
            .map_err(|e| PredictionError::Tokenization(e.to_string()))
    }
}

impl TextEncoder for TokenizerEncoder {
    fn encode(&self, text: &str) -> Result<EncodedInput, PredictionError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| PredictionError::Tokenization(e.to_string()))?;

        let len = encoding.get_ids().len();
        let widen = |values: &[u32]| -> Result<Array2<i64>, PredictionError> {
            Array2::from_shape_vec((1, len), values.iter().map(|&v| i64::from(v)).collect())
                .map_err(|e| {
                    PredictionError::Tokenization(format!("Failed to shape encoding: {}", e))
                })
        };

        Ok(EncodedInput {
            input_ids: widen(encoding.get_ids())?,
            attention_mask: widen(encoding.get_attention_mask())?,
            token_type_ids: widen(encoding.get_type_ids())?,
        })
    }
}
