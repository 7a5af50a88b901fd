use serde::{Deserialize, Serialize};

use crate::classifier::Prediction;

/// Body of a successful `/predict` call.
#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub predictions: Vec<Prediction>,
}

/// Body of every failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
