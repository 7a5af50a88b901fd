//! HTTP surface of the service.
//!
//! ## Endpoints
//!
//! - `GET /` - Liveness string
//! - `POST /predict` - Top categories for `{"text": "..."}`
//!
//! Unknown paths and wrong methods get the same `{"error": ...}` body as
//! every other failure.

use axum::routing::{get, post};
use axum::Router;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::classifier::ModelHost;

mod error;
mod handlers;
mod types;

pub use error::{ApiError, ValidationError};
pub use handlers::LIVENESS_MESSAGE;
pub use types::{ErrorResponse, PredictResponse};

/// Builds the router. The host is injected here rather than looked up
/// globally, so tests can serve a host assembled from fakes.
pub fn router(host: Arc<ModelHost>) -> Router {
    Router::new()
        .route("/", get(handlers::root).fallback(handlers::method_not_allowed))
        .route("/predict", post(handlers::predict).fallback(handlers::method_not_allowed))
        .fallback(handlers::not_found)
        .with_state(host)
}

/// Serves until ctrl-c.
pub async fn serve(listener: TcpListener, host: Arc<ModelHost>) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("Listening on http://{}", addr);
    }
    axum::serve(listener, router(host))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received, stopping server");
}
