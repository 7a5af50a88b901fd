use std::path::{Path, PathBuf};

use super::categories::CategoryTable;
use super::encoder::{TokenizerEncoder, MAX_SEQUENCE_LENGTH};
use super::error::ModelLoadError;
use super::host::ModelHost;
use super::model::OnnxClassifier;
use crate::runtime::RuntimeConfig;

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const CONFIG_FILE: &str = "config.json";

/// A builder for constructing a [`ModelHost`] from a model directory.
///
/// The directory must contain `model.onnx` and `tokenizer.json`. When no
/// categories are given, they are read from the `id2label` map of the
/// directory's `config.json`.
#[derive(Default, Debug)]
pub struct ModelHostBuilder {
    model_dir: Option<PathBuf>,
    categories: Option<CategoryTable>,
    runtime_config: RuntimeConfig,
    max_sequence_length: Option<usize>,
}

impl ModelHostBuilder {
    /// Creates a new empty ModelHostBuilder instance with default configuration
    pub fn new() -> Self {
        Self {
            model_dir: None,
            categories: None,
            runtime_config: RuntimeConfig::default(),
            max_sequence_length: None,
        }
    }

    /// Sets the runtime configuration for ONNX model execution
    ///
    /// # Example
    /// ```
    /// use topiclass::{ModelHostBuilder, RuntimeConfig, DevicePreference};
    ///
    /// let config = RuntimeConfig {
    ///     device: DevicePreference::Cpu,
    ///     ..RuntimeConfig::default()
    /// };
    /// let builder = ModelHostBuilder::new()
    ///     .with_runtime_config(config);
    /// ```
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets the directory holding `model.onnx`, `tokenizer.json` and optionally `config.json`
    pub fn with_model_dir(mut self, model_dir: impl AsRef<Path>) -> Self {
        self.model_dir = Some(model_dir.as_ref().to_path_buf());
        self
    }

    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = Some(categories);
        self
    }

    /// Sets the category table from plain labels, in model output order
    ///
    /// # Example
    /// ```
    /// use topiclass::ModelHostBuilder;
    ///
    /// let builder = ModelHostBuilder::new()
    ///     .with_category_labels(vec!["World", "Sports", "Business", "Sci/Tech"]);
    /// assert!(builder.is_ok());
    /// ```
    pub fn with_category_labels(
        self,
        labels: Vec<impl Into<String>>,
    ) -> Result<Self, ModelLoadError> {
        Ok(self.with_categories(CategoryTable::new(labels)?))
    }

    /// Overrides the token limit; inputs longer than this keep their head.
    /// Defaults to 512.
    pub fn with_max_sequence_length(mut self, max_sequence_length: usize) -> Self {
        self.max_sequence_length = Some(max_sequence_length);
        self
    }

    /// Loads the tokenizer and model and checks them against the category table
    ///
    /// # Returns
    /// * `Result<ModelHost, ModelLoadError>` - The constructed host, or an error if:
    ///   - No model directory is set, or it does not exist
    ///   - The tokenizer or model file is missing or fails to load
    ///   - The model structure is invalid
    ///   - No category table is given and none can be read from `config.json`
    ///   - The category table length differs from the model's output width
    pub fn build(self) -> Result<ModelHost, ModelLoadError> {
        let model_dir = self
            .model_dir
            .ok_or_else(|| {
                ModelLoadError::InvalidModel("Model directory must be set".to_string())
            })?;
        if !model_dir.is_dir() {
            return Err(ModelLoadError::MissingFile(model_dir));
        }
        if self.max_sequence_length == Some(0) {
            return Err(ModelLoadError::InvalidModel(
                "Max sequence length must be positive".to_string(),
            ));
        }

        log::info!("Loading model from {:?}", model_dir);

        let categories = match self.categories {
            Some(categories) => categories,
            None => {
                log::info!("No category table given, reading labels from {}", CONFIG_FILE);
                CategoryTable::from_model_config(&model_dir.join(CONFIG_FILE))?
            }
        };

        let encoder = TokenizerEncoder::from_file(
            &model_dir.join(TOKENIZER_FILE),
            self.max_sequence_length.unwrap_or(MAX_SEQUENCE_LENGTH),
        )?;
        let classifier =
            OnnxClassifier::from_file(&model_dir.join(MODEL_FILE), &self.runtime_config)?;

        let host =
            ModelHost::from_parts(encoder, classifier, categories)?.with_model_dir(model_dir);
        log::info!(
            "Model host ready on {} with {} categories",
            host.device(),
            host.categories().len()
        );
        Ok(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_model_dir() {
        let result = ModelHostBuilder::new().build();
        assert!(matches!(result, Err(ModelLoadError::InvalidModel(_))));
    }

    #[test]
    fn test_build_rejects_missing_dir() {
        let result = ModelHostBuilder::new()
            .with_model_dir("/nonexistent/topiclass-model")
            .build();
        assert!(matches!(result, Err(ModelLoadError::MissingFile(_))));
    }

    #[test]
    fn test_build_rejects_dir_without_files() {
        let dir = std::env::temp_dir().join("topiclass-test-empty-model-dir");
        std::fs::create_dir_all(&dir).unwrap();

        let result = ModelHostBuilder::new()
            .with_model_dir(&dir)
            .with_category_labels(vec!["a", "b"])
            .unwrap()
            .build();
        match result {
            Err(ModelLoadError::MissingFile(path)) => assert!(path.ends_with(TOKENIZER_FILE)),
            other => panic!("expected a missing tokenizer, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_category_labels_rejected() {
        let result = ModelHostBuilder::new().with_category_labels(Vec::<String>::new());
        assert!(matches!(result, Err(ModelLoadError::InvalidCategories(_))));
    }
}
