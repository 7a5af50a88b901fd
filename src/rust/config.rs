//! Startup configuration, read once from the command line and environment.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::model_manager::{ModelManager, ModelSource};
use crate::runtime::{DevicePreference, RuntimeConfig};

pub const DEFAULT_PORT: u16 = 5000;
pub const TUNNEL_TOKEN_ENV: &str = "NGROK_AUTHTOKEN";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Local model directory or HuggingFace repository id (`owner/name`)
    #[arg(short, long, env = "TOPICLASS_MODEL", default_value = "./model")]
    pub model: String,

    /// Repository revision used when the model is fetched from the hub
    #[arg(long, default_value = "main")]
    pub revision: String,

    /// Path of the ONNX export inside the repository
    #[arg(long, default_value = "model.onnx")]
    pub onnx_file: String,

    /// Expected SHA-256 of the downloaded model file
    #[arg(long)]
    pub model_sha256: Option<String>,

    /// Expected SHA-256 of the downloaded tokenizer file
    #[arg(long)]
    pub tokenizer_sha256: Option<String>,

    /// Category labels file (JSON array or one label per line); defaults to
    /// the id2label map of the model's config.json
    #[arg(short, long, env = "TOPICLASS_CATEGORIES")]
    pub categories: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "TOPICLASS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Compute device for inference
    #[arg(long, value_enum, default_value_t = DevicePreference::Auto)]
    pub device: DevicePreference,

    /// Threads used within a single operator (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    pub intra_threads: usize,

    /// Threads used across operators (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    pub inter_threads: usize,

    /// Root of the download cache; models are kept under `<root>/models`
    #[arg(long, env = "TOPICLASS_CACHE")]
    pub cache_dir: Option<PathBuf>,

    /// Force a fresh download of the model files
    #[arg(short, long)]
    pub fresh: bool,
}

/// Immutable process configuration, built once at boot and handed to the
/// constructors that need it.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub model_source: ModelSource,
    pub models_dir: PathBuf,
    pub categories_file: Option<PathBuf>,
    pub listen_addr: SocketAddr,
    pub runtime: RuntimeConfig,
    pub fresh_download: bool,
    pub tunnel_token: Option<String>,
}

impl ServiceConfig {
    /// Parses the command line and reads the environment.
    pub fn load() -> Self {
        let tunnel_token = std::env::var(TUNNEL_TOKEN_ENV).ok();
        Self::from_args(Args::parse(), tunnel_token)
    }

    pub fn from_args(args: Args, tunnel_token: Option<String>) -> Self {
        let mut model_source = ModelSource::parse(&args.model, &args.revision);
        if let ModelSource::Remote(remote) = &mut model_source {
            remote.model_file = args.onnx_file;
            remote.model_hash = args.model_sha256;
            remote.tokenizer_hash = args.tokenizer_sha256;
        }

        Self {
            model_source,
            models_dir: args
                .cache_dir
                .map(|root| ModelManager::models_dir_in(&root))
                .unwrap_or_else(ModelManager::get_default_models_dir),
            categories_file: args.categories,
            listen_addr: SocketAddr::new(args.host, args.port),
            runtime: RuntimeConfig {
                inter_threads: args.inter_threads,
                intra_threads: args.intra_threads,
                device: args.device,
                ..RuntimeConfig::default()
            },
            fresh_download: args.fresh,
            tunnel_token: tunnel_token.filter(|token| !token.trim().is_empty()),
        }
    }

    /// Reports whether external exposure is possible. A missing token is not
    /// an error: the service still runs locally.
    pub fn log_exposure(&self) {
        match &self.tunnel_token {
            Some(_) => log::info!(
                "Tunnel token found; the service can be exposed publicly on port {}",
                self.listen_addr.port()
            ),
            None => log::warn!(
                "{} is not set; serving locally only on {}",
                TUNNEL_TOKEN_ENV,
                self.listen_addr
            ),
        }
    }
}
