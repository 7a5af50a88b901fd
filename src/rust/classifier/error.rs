use ort::Error as OrtError;
use std::io;
use std::path::PathBuf;

use crate::runtime::Device;

/// Failures while bringing a [`ModelHost`](super::ModelHost) up. Always fatal
/// to startup: the service must not serve requests with a half-loaded model.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    /// A required model file is missing from the model directory
    #[error("Model file not found: {0}")]
    MissingFile(PathBuf),
    /// Reading a file from the model directory failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// The tokenizer could not be loaded or configured
    #[error("Failed to load tokenizer: {0}")]
    Tokenizer(String),
    /// ONNX Runtime refused the environment, session or model graph
    #[error("Runtime error: {0}")]
    Runtime(String),
    /// The model graph does not look like a sequence classifier
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    /// The category table is empty or contains unusable labels
    #[error("Invalid categories: {0}")]
    InvalidCategories(String),
    /// The category table does not line up with the classifier's output width
    #[error("Category table has {expected} entries but the model produces {actual} logits")]
    LabelMismatch { expected: usize, actual: usize },
    /// The requested compute device is not available on this machine
    #[error("Requested device '{0}' is not available")]
    DeviceUnavailable(Device),
}

impl From<OrtError> for ModelLoadError {
    fn from(err: OrtError) -> Self {
        ModelLoadError::Runtime(err.to_string())
    }
}

/// A failed prediction. The stage is kept for diagnostics only; callers of the
/// HTTP surface always see the same generic failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PredictionError {
    /// Error occurred while encoding the text into model inputs
    #[error("Tokenization failed: {0}")]
    Tokenization(String),
    /// Error occurred while running the forward pass
    #[error("Inference failed: {0}")]
    Inference(String),
    /// The forward pass produced something other than one logit per category
    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),
    /// A collaborator panicked while handling the request
    #[error("Internal fault during prediction: {0}")]
    Panicked(String),
}
