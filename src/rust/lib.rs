//! A topic classification service: an ONNX sequence-classification model
//! behind a small synchronous HTTP API.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use topiclass::ModelHost;
//!
//! let host = ModelHost::builder()
//!     .with_model_dir("./model")
//!     .with_category_labels(vec!["World", "Sports", "Business", "Sci/Tech"])?
//!     .build()?;
//!
//! for prediction in host.predict("This is a test sentence about space exploration")? {
//!     println!("{}: {:.2}%", prediction.category, prediction.probability);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Serving
//!
//! The host is built once and shared read-only by every request:
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use topiclass::{server, ModelHost};
//!
//! let host = Arc::new(ModelHost::builder().with_model_dir("./model").build()?);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! server::serve(listener, host).await?;
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod model_manager;
mod runtime;
pub mod server;

pub use classifier::{
    CategoryTable, EncodedInput, HostInfo, ModelHost, ModelHostBuilder, ModelLoadError, Prediction,
    PredictionError, SequenceClassifier, TextEncoder, TOP_K,
};
pub use config::ServiceConfig;
pub use model_manager::{ModelError, ModelManager, ModelSource, RemoteModel};
pub use runtime::{create_session_builder, select_device, Device, DevicePreference, RuntimeConfig};

pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
