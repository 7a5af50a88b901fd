use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{Method, Uri};
use axum::Json;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use super::error::{ApiError, ValidationError};
use super::types::PredictResponse;
use crate::classifier::ModelHost;

pub const LIVENESS_MESSAGE: &str = "Topic classification service is running";

/// `GET /`: static liveness string, no model access.
pub async fn root() -> &'static str {
    LIVENESS_MESSAGE
}

/// `POST /predict`: validates `{"text": ...}` and returns the ranked categories.
pub async fn predict(
    State(host): State<Arc<ModelHost>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    contain(classify(host, body)).await
}

/// Fallback for paths with no route.
pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("{} {}", method, uri.path()))
}

/// Fallback for known paths hit with the wrong method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed(format!("{} {}", method, uri.path()))
}

/// Runs a handler body as its own task, so a panic in it still produces a
/// 500 with a JSON body instead of a dropped connection.
pub(crate) async fn contain<T, F>(handler: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    tokio::spawn(handler)
        .await
        .map_err(|e| ApiError::Unhandled(format!("handler task did not complete: {}", e)))?
}

async fn classify(
    host: Arc<ModelHost>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let body = body.map_err(|e| ApiError::Unhandled(format!("unreadable request body: {}", e)))?;
    let text = extract_text(&body)?;
    log::debug!("Classifying {} bytes of text", text.len());

    // The forward pass is CPU/GPU bound; keep it off the async workers. It is
    // not cancelled if the client goes away.
    let predictions = tokio::task::spawn_blocking(move || host.predict(&text))
        .await
        .map_err(|e| ApiError::Unhandled(format!("prediction task did not complete: {}", e)))??;

    Ok(Json(PredictResponse { predictions }))
}

/// Pulls a non-empty, trimmed `text` string out of a JSON body.
///
/// A body that is not JSON at all is not a validation failure but an
/// unhandled error, reported as a generic 500.
pub(crate) fn extract_text(body: &[u8]) -> Result<String, ApiError> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::Unhandled(format!("malformed request body: {}", e)))?;

    let text = match payload.get("text") {
        None | Some(Value::Null) => return Err(ValidationError::MissingText.into()),
        Some(Value::String(text)) => text.trim(),
        Some(_) => return Err(ValidationError::NotAString.into()),
    };
    if text.is_empty() {
        return Err(ValidationError::EmptyText.into());
    }

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(body: &str) -> Option<ValidationError> {
        match extract_text(body.as_bytes()) {
            Err(ApiError::Validation(reason)) => Some(reason),
            _ => None,
        }
    }

    #[test]
    fn test_extracts_trimmed_text() {
        assert_eq!(
            extract_text(br#"{"text": "  rockets and moons  "}"#).unwrap(),
            "rockets and moons"
        );
    }

    #[test]
    fn test_validation_rejections() {
        assert_eq!(rejection(r#"{}"#), Some(ValidationError::MissingText));
        assert_eq!(rejection(r#"{"text": null}"#), Some(ValidationError::MissingText));
        assert_eq!(rejection(r#"["text"]"#), Some(ValidationError::MissingText));
        assert_eq!(rejection(r#"{"text": 42}"#), Some(ValidationError::NotAString));
        assert_eq!(rejection(r#"{"text": ""}"#), Some(ValidationError::EmptyText));
        assert_eq!(rejection(r#"{"text": " \n\t "}"#), Some(ValidationError::EmptyText));
    }

    #[test]
    fn test_malformed_body_is_unhandled() {
        assert!(matches!(extract_text(b"{not json"), Err(ApiError::Unhandled(_))));
        assert!(matches!(extract_text(b""), Err(ApiError::Unhandled(_))));
    }

    #[tokio::test]
    async fn test_contain_passes_results_through() {
        assert_eq!(contain(async { Ok::<_, ApiError>(7) }).await.unwrap(), 7);
        let rejected = contain(async { Err::<(), _>(ApiError::from(ValidationError::EmptyText)) });
        assert!(matches!(rejected.await, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_contain_turns_handler_panic_into_server_error() {
        let result = contain(async {
            if LIVENESS_MESSAGE.is_empty() {
                return Ok(());
            }
            panic!("handler bug");
        })
        .await;

        let error = result.unwrap_err();
        assert_eq!(error.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.public_message(), "server error");
    }
}
