use ndarray::{Array1, Ix2};
use ort::session::Session;
use ort::value::{Tensor, ValueType};
use std::collections::HashMap;
use std::path::Path;

use super::encoder::EncodedInput;
use super::error::{ModelLoadError, PredictionError};
use crate::runtime::{create_session_builder, Device, RuntimeConfig};

const INPUT_IDS: &str = "input_ids";
const ATTENTION_MASK: &str = "attention_mask";
const TOKEN_TYPE_IDS: &str = "token_type_ids";

/// Maps encoded text to one unnormalised score per category.
///
/// Implementations must tolerate concurrent read-only calls; an implementation
/// backed by a non-reentrant primitive has to serialise internally.
pub trait SequenceClassifier: Send + Sync {
    /// Logit width, if the model declares it statically.
    fn num_labels(&self) -> Option<usize>;

    /// Runs a single forward pass and returns the logits of the only batch row.
    fn infer(&self, input: &EncodedInput) -> Result<Array1<f32>, PredictionError>;

    fn device(&self) -> Device {
        Device::Cpu
    }
}

/// [`SequenceClassifier`] running an exported ONNX sequence-classification graph.
///
/// The model is expected to:
/// - accept `input_ids` and optionally `attention_mask` / `token_type_ids`,
///   all `i64` of shape `[batch_size, sequence_length]`
/// - produce logits of shape `[batch_size, num_labels]` as its first output
///
/// ONNX graphs carry no optimiser state, and training-only operators such as
/// dropout are inert at inference, so a loaded session is permanently in
/// inference mode.
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Session,
    input_names: Vec<String>,
    output_width: Option<usize>,
    device: Device,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<OnnxClassifier>();
    }
};

impl OnnxClassifier {
    pub fn from_file(model_path: &Path, config: &RuntimeConfig) -> Result<Self, ModelLoadError> {
        if !model_path.exists() {
            return Err(ModelLoadError::MissingFile(model_path.to_path_buf()));
        }

        let (builder, device) = create_session_builder(config)?;
        let session = builder.commit_from_file(model_path).map_err(|e| {
            log::error!("Failed to load model from {:?}: {}", model_path, e);
            ModelLoadError::from(e)
        })?;

        Self::validate_model(&session)?;
        log::info!("Model structure validated successfully");

        let input_names = session.inputs.iter().map(|input| input.name.clone()).collect();
        let output_width = Self::declared_width(&session);
        match output_width {
            Some(width) => log::info!("Model declares {} output labels", width),
            None => log::info!("Model output width is dynamic"),
        }

        Ok(Self {
            session,
            input_names,
            output_width,
            device,
        })
    }

    /// Validates that the model has the expected input/output structure
    fn validate_model(session: &Session) -> Result<(), ModelLoadError> {
        let inputs = &session.inputs;
        if !inputs.iter().any(|input| input.name == INPUT_IDS) {
            return Err(ModelLoadError::InvalidModel(format!(
                "Model must have an '{}' input, found {:?}",
                INPUT_IDS,
                inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>()
            )));
        }
        if let Some(unknown) = inputs
            .iter()
            .find(|input| {
                ![INPUT_IDS, ATTENTION_MASK, TOKEN_TYPE_IDS].contains(&input.name.as_str())
            })
        {
            return Err(ModelLoadError::InvalidModel(format!(
                "Unsupported model input '{}'",
                unknown.name
            )));
        }

        if session.outputs.is_empty() {
            return Err(ModelLoadError::InvalidModel(
                "Model must have at least 1 output for logits".to_string(),
            ));
        }

        Ok(())
    }

    /// Last dimension of the first output, when it is fixed in the graph.
    fn declared_width(session: &Session) -> Option<usize> {
        match &session.outputs.first()?.output_type {
            ValueType::Tensor { dimensions, .. } => dimensions
                .last()
                .and_then(|&dim| usize::try_from(dim).ok())
                .filter(|&dim| dim > 0),
            _ => None,
        }
    }
}

impl SequenceClassifier for OnnxClassifier {
    fn num_labels(&self) -> Option<usize> {
        self.output_width
    }

    fn device(&self) -> Device {
        self.device
    }

    fn infer(&self, input: &EncodedInput) -> Result<Array1<f32>, PredictionError> {
        let mut input_tensors = HashMap::new();
        for name in &self.input_names {
            let array = match name.as_str() {
                INPUT_IDS => &input.input_ids,
                ATTENTION_MASK => &input.attention_mask,
                TOKEN_TYPE_IDS => &input.token_type_ids,
                other => {
                    return Err(PredictionError::Inference(format!(
                        "Unsupported model input '{}'",
                        other
                    )))
                }
            };
            let tensor = Tensor::from_array(array.clone())
                .map_err(|e| {
                    PredictionError::Inference(format!("Failed to create {} tensor: {}", name, e))
                })?;
            input_tensors.insert(name.as_str(), tensor);
        }

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| PredictionError::Inference(format!("Failed to run model: {}", e)))?;
        let output_tensor = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                PredictionError::InvalidOutput(format!("Failed to extract output tensor: {}", e))
            })?;

        let logits = output_tensor
            .into_dimensionality::<Ix2>()
            .map_err(|e| {
                PredictionError::InvalidOutput(format!("Expected [batch, labels] logits: {}", e))
            })?;
        if logits.nrows() != 1 {
            return Err(PredictionError::InvalidOutput(format!(
                "Expected a single batch row, got {}",
                logits.nrows()
            )));
        }

        Ok(logits.row(0).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let path = Path::new("/nonexistent/model.onnx");
        let result = OnnxClassifier::from_file(path, &RuntimeConfig::default());
        assert!(matches!(result, Err(ModelLoadError::MissingFile(_))));
    }

    #[test]
    fn test_corrupt_model_file() {
        let dir = std::env::temp_dir().join("topiclass-test-corrupt-model");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("model.onnx");
        std::fs::write(&path, "corrupted data").unwrap();

        let config = RuntimeConfig {
            device: crate::runtime::DevicePreference::Cpu,
            ..RuntimeConfig::default()
        };
        let result = OnnxClassifier::from_file(&path, &config);
        assert!(matches!(result, Err(ModelLoadError::Runtime(_))));
    }
}
