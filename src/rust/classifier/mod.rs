use std::path::PathBuf;

use crate::runtime::Device;

mod error;
mod encoder;
mod model;
mod categories;
mod host;
pub mod builder;
mod utils;

pub use error::{ModelLoadError, PredictionError};
pub use encoder::{EncodedInput, TextEncoder, TokenizerEncoder, MAX_SEQUENCE_LENGTH};
pub use model::{OnnxClassifier, SequenceClassifier};
pub use categories::CategoryTable;
pub use host::{ModelHost, Prediction, TOP_K};
pub use builder::ModelHostBuilder;

/// Information about the current state and configuration of a model host
#[derive(Debug, Clone)]
pub struct HostInfo {
    /// Directory the model was loaded from, if it came from disk
    pub model_dir: Option<PathBuf>,
    /// Device the forward pass runs on
    pub device: Device,
    /// Number of categories the classifier distinguishes
    pub num_categories: usize,
    /// Labels of the categories, in output order
    pub categories: Vec<String>,
}
