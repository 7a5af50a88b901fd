use anyhow::Context;
use log::info;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

use topiclass::{server, CategoryTable, ModelHost, ModelManager, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    topiclass::init_logger();
    let config = ServiceConfig::load();

    info!("=== Starting Topic Classification Service ===");
    config.log_exposure();

    let manager = ModelManager::new(&config.models_dir).context("Failed to create model cache")?;
    let model_dir = manager
        .resolve(&config.model_source, config.fresh_download)
        .await
        .context("Failed to resolve model")?;

    let start_time = Instant::now();
    info!("Loading model host...");

    let mut builder = ModelHost::builder()
        .with_model_dir(&model_dir)
        .with_runtime_config(config.runtime.clone());
    if let Some(path) = &config.categories_file {
        builder = builder.with_categories(
            CategoryTable::from_file(path)
                .with_context(|| format!("Failed to read categories from {:?}", path))?,
        );
    }

    // Loading is blocking and may take a while; a failure here stops startup.
    let host = tokio::task::spawn_blocking(move || builder.build())
        .await
        .context("Model loading task failed")?
        .context("Failed to load model")?;

    info!("=== Model Loaded (took {:.2?}) ===", start_time.elapsed());
    info!("{:?}", host.info());

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    server::serve(listener, Arc::new(host)).await.context("Server error")?;

    info!("=== Service Stopped ===");
    Ok(())
}
