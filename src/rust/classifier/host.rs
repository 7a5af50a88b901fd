use ndarray::Array1;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use super::categories::CategoryTable;
use super::encoder::TextEncoder;
use super::error::{ModelLoadError, PredictionError};
use super::model::SequenceClassifier;
use super::utils::{softmax, to_percent, top_k};
use crate::runtime::Device;

/// Number of ranked categories returned per prediction.
pub const TOP_K: usize = 3;

/// One ranked category with its probability as a percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub category: String,
    pub probability: f64,
}

/// Owns the loaded classifier and produces ranked category predictions.
///
/// A host is built once at startup and never mutated afterwards, so it is
/// shared between request handlers behind an `Arc`:
///
/// ```rust,no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use topiclass::ModelHost;
/// use std::sync::Arc;
///
/// let host = Arc::new(ModelHost::builder()
///     .with_model_dir("./model")
///     .with_category_labels(vec!["World", "Sports", "Business", "Sci/Tech"])?
///     .build()?);
///
/// for prediction in host.predict("NASA plans a new crewed mission to the Moon")? {
///     println!("{}: {:.2}%", prediction.category, prediction.probability);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ModelHost {
    encoder: Box<dyn TextEncoder>,
    classifier: Box<dyn SequenceClassifier>,
    categories: CategoryTable,
    model_dir: Option<PathBuf>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ModelHost>();
    }
};

impl fmt::Debug for ModelHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHost")
            .field("categories", &self.categories)
            .field("device", &self.device())
            .field("model_dir", &self.model_dir)
            .finish_non_exhaustive()
    }
}

impl ModelHost {
    /// Creates a new ModelHostBuilder for fluent construction
    pub fn builder() -> super::builder::ModelHostBuilder {
        super::builder::ModelHostBuilder::new()
    }

    /// Assembles a host from an encoder, a classifier and the labels of its
    /// outputs.
    ///
    /// Fails with [`ModelLoadError::LabelMismatch`] when the classifier's
    /// output width differs from the number of categories. A classifier that
    /// does not declare its width is measured with one forward pass.
    pub fn from_parts(
        encoder: impl TextEncoder + 'static,
        classifier: impl SequenceClassifier + 'static,
        categories: CategoryTable,
    ) -> Result<Self, ModelLoadError> {
        let host = Self {
            encoder: Box::new(encoder),
            classifier: Box::new(classifier),
            categories,
            model_dir: None,
        };

        let width = match host.classifier.num_labels() {
            Some(width) => width,
            None => host.measure_width()?,
        };
        if width != host.categories.len() {
            log::error!(
                "Category table has {} entries but the model produces {} logits",
                host.categories.len(),
                width
            );
            return Err(ModelLoadError::LabelMismatch {
                expected: host.categories.len(),
                actual: width,
            });
        }

        Ok(host)
    }

    pub(super) fn with_model_dir(mut self, model_dir: PathBuf) -> Self {
        self.model_dir = Some(model_dir);
        self
    }

    fn measure_width(&self) -> Result<usize, ModelLoadError> {
        let logits = self
            .raw_logits("Test input to infer the number of labels")
            .map_err(|e| {
                ModelLoadError::InvalidModel(format!("Width-measuring forward pass failed: {}", e))
            })?;
        log::info!("Inferred output width from model: {}", logits.len());
        Ok(logits.len())
    }

    /// Returns information about the host's current state
    pub fn info(&self) -> super::HostInfo {
        super::HostInfo {
            model_dir: self.model_dir.clone(),
            device: self.device(),
            num_categories: self.categories.len(),
            categories: self.categories.labels().to_vec(),
        }
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    pub fn device(&self) -> Device {
        self.classifier.device()
    }

    /// Predicts the [`TOP_K`] most probable categories for `text`.
    ///
    /// Any string is accepted, including the empty one. Results are ordered
    /// by descending probability, ties by category index, with probabilities
    /// as percentages rounded to two decimals.
    pub fn predict(&self, text: &str) -> Result<Vec<Prediction>, PredictionError> {
        let probabilities = self.distribution(text)?;

        top_k(&probabilities, TOP_K)
            .into_iter()
            .map(|index| {
                let category = self.categories.get(index).ok_or_else(|| {
                    PredictionError::InvalidOutput(format!("No category at index {}", index))
                })?;
                Ok(Prediction {
                    category: category.to_string(),
                    probability: to_percent(probabilities[index]),
                })
            })
            .collect()
    }

    /// Full probability distribution over the category table, in table order.
    pub fn distribution(&self, text: &str) -> Result<Array1<f32>, PredictionError> {
        let logits = self.raw_logits(text)?;

        if logits.len() != self.categories.len() {
            return Err(PredictionError::InvalidOutput(format!(
                "Expected {} logits, got {}",
                self.categories.len(),
                logits.len()
            )));
        }
        if !logits.iter().all(|l| l.is_finite()) {
            return Err(PredictionError::InvalidOutput("Model produced non-finite logits".into()));
        }

        Ok(softmax(&logits))
    }

    /// Encodes and runs the classifier, turning a panic in either collaborator
    /// into a [`PredictionError`].
    fn raw_logits(&self, text: &str) -> Result<Array1<f32>, PredictionError> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            let input = self.encoder.encode(text)?;
            self.classifier.infer(&input)
        }))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            log::warn!("Prediction pipeline panicked: {}", message);
            Err(PredictionError::Panicked(message))
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
