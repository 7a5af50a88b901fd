use std::path::{Path, PathBuf};
use std::fs;
use std::io;
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use reqwest::StatusCode;
use sha2::{Sha256, Digest};

use crate::classifier::builder::{CONFIG_FILE, MODEL_FILE, TOKENIZER_FILE};

const HUB_URL: &str = "https://huggingface.co";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model directory not found: {0}")]
    NotFound(PathBuf),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// A model published in a HuggingFace repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteModel {
    /// Repository id, e.g. `owner/name`
    pub repo: String,
    pub revision: String,
    /// Path of the ONNX export inside the repository
    pub model_file: String,
    pub model_hash: Option<String>,
    pub tokenizer_hash: Option<String>,
}

impl RemoteModel {
    pub fn new(repo: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            revision: revision.into(),
            model_file: MODEL_FILE.to_string(),
            model_hash: None,
            tokenizer_hash: None,
        }
    }

    fn url(&self, file: &str) -> String {
        format!("{}/{}/resolve/{}/{}", HUB_URL, self.repo, self.revision, file)
    }
}

/// Where the model comes from: a local directory or a hub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Local(PathBuf),
    Remote(RemoteModel),
}

impl ModelSource {
    /// Interprets `spec` the way a pretrained-model loader does: an existing
    /// path is a local directory, an `owner/name` id is a hub repository,
    /// anything else is treated as a (missing) local path.
    pub fn parse(spec: &str, revision: &str) -> Self {
        let path = Path::new(spec);
        if path.exists() {
            return Self::Local(path.to_path_buf());
        }
        let looks_like_repo = spec.split('/').count() == 2
            && spec.split('/').all(|part| !part.is_empty() && !part.starts_with('.'))
            && !spec.contains('\\');
        if looks_like_repo {
            Self::Remote(RemoteModel::new(spec, revision))
        } else {
            Self::Local(path.to_path_buf())
        }
    }
}

#[derive(Clone, Debug)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    /// Returns the models directory under an explicit cache root
    pub fn models_dir_in(cache_root: &Path) -> PathBuf {
        cache_root.join("models")
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return Self::models_dir_in(&cache_dir.join("topiclass"));
        }

        // 2. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return Self::models_dir_in(&home_dir.join(".cache").join("topiclass"));
        }

        // 3. If all else fails, use system temp directory (platform agnostic)
        Self::models_dir_in(&env::temp_dir().join("topiclass"))
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Local directory a remote model is cached in.
    pub fn get_model_dir(&self, model: &RemoteModel) -> PathBuf {
        self.models_dir
            .join(model.repo.replace('/', "--"))
            .join(&model.revision)
    }

    pub fn get_model_path(&self, model: &RemoteModel) -> PathBuf {
        self.get_model_dir(model).join(MODEL_FILE)
    }

    pub fn get_tokenizer_path(&self, model: &RemoteModel) -> PathBuf {
        self.get_model_dir(model).join(TOKENIZER_FILE)
    }

    pub fn is_model_downloaded(&self, model: &RemoteModel) -> bool {
        let model_path = self.get_model_path(model);
        let tokenizer_path = self.get_tokenizer_path(model);
        log::debug!("Checking if model is downloaded:");
        log::debug!("  Model path: {:?} (exists: {})", model_path, model_path.exists());
        log::debug!("  Tokenizer path: {:?} (exists: {})", tokenizer_path, tokenizer_path.exists());
        model_path.exists() && tokenizer_path.exists()
    }

    /// Resolves a model source to a directory ready for loading, downloading
    /// it first when it is remote. `fresh` discards any cached copy.
    pub async fn resolve(&self, source: &ModelSource, fresh: bool) -> Result<PathBuf, ModelError> {
        match source {
            ModelSource::Local(dir) => {
                if !dir.is_dir() {
                    return Err(ModelError::NotFound(dir.clone()));
                }
                log::info!("Using local model directory {:?}", dir);
                Ok(dir.clone())
            }
            ModelSource::Remote(model) => {
                if fresh {
                    log::info!("Fresh download requested - removing any existing model files...");
                    self.remove_download(model)?;
                }
                self.ensure_model_downloaded(model).await?;
                Ok(self.get_model_dir(model))
            }
        }
    }

    pub async fn download_model(&self, model: &RemoteModel) -> Result<(), ModelError> {
        let _lock = self.download_lock.lock().await;

        let model_dir = self.get_model_dir(model);
        log::info!("Creating model directory at {:?}", model_dir);
        fs::create_dir_all(&model_dir)?;

        let model_result = self
            .fetch_if_invalid(
                &model.url(&model.model_file),
                &self.get_model_path(model),
                model.model_hash.as_deref(),
                "model",
            )
            .await;
        let tokenizer_result = match &model_result {
            Ok(()) => {
                self.fetch_if_invalid(
                    &model.url(TOKENIZER_FILE),
                    &self.get_tokenizer_path(model),
                    model.tokenizer_hash.as_deref(),
                    "tokenizer",
                )
                .await
            }
            Err(_) => Ok(()),
        };
        let config_result = match (&model_result, &tokenizer_result) {
            (Ok(()), Ok(())) => {
                self.fetch_optional(&model.url(CONFIG_FILE), &model_dir.join(CONFIG_FILE))
                    .await
            }
            _ => Ok(()),
        };

        match (model_result, tokenizer_result, config_result) {
            (Ok(()), Ok(()), Ok(())) => {
                log::info!("Model and tokenizer ready to use");
                Ok(())
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                log::error!("Failed to set up model files: {}", e);
                // Cleanup on failure
                let _ = self.remove_download(model);
                Err(e)
            }
        }
    }

    async fn fetch_if_invalid(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ModelError> {
        if path.exists() {
            log::info!("{} file exists at {:?}, verifying...", file_type, path);
            if self.verify_file(path, expected_hash)? {
                log::info!("Existing {} file verified successfully", file_type);
                return Ok(());
            }
            log::warn!("{} file verification failed, redownloading", file_type);
        }
        self.download_and_verify_file(url, path, expected_hash, file_type).await
    }

    fn verify_file(&self, path: &Path, expected_hash: Option<&str>) -> Result<bool, ModelError> {
        let Some(expected_hash) = expected_hash else {
            return Ok(path.exists());
        };
        log::info!("Verifying file: {:?}", path);
        let hash = sha256_hex(&fs::read(path)?);
        log::debug!("Calculated hash: {}", hash);
        log::debug!("Expected hash:   {}", expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Checks cached files against their pinned hashes. Files without a pin
    /// only have to exist.
    pub fn verify_model(&self, model: &RemoteModel) -> Result<bool, ModelError> {
        let model_path = self.get_model_path(model);
        let tokenizer_path = self.get_tokenizer_path(model);

        if !model_path.exists() || !tokenizer_path.exists() {
            log::info!("One or both files do not exist");
            return Ok(false);
        }

        let model_ok = self.verify_file(&model_path, model.model_hash.as_deref())?;
        let tokenizer_ok = self.verify_file(&tokenizer_path, model.tokenizer_hash.as_deref())?;

        log::info!("Verification results:");
        log::info!("  Model hash verification: {}", model_ok);
        log::info!("  Tokenizer hash verification: {}", tokenizer_ok);

        Ok(model_ok && tokenizer_ok)
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ModelError> {
        log::info!("Downloading {} file from {} to {:?}", file_type, url, path);
        let response = reqwest::get(url).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        if let Some(expected_hash) = expected_hash {
            let hash = sha256_hex(&bytes);
            if !hash.eq_ignore_ascii_case(expected_hash) {
                log::error!(
                    "{} hash mismatch: expected {}, got {}",
                    file_type,
                    expected_hash,
                    hash
                );
                return Err(ModelError::HashMismatch {
                    file_type: file_type.to_string(),
                    expected: expected_hash.to_string(),
                    actual: hash,
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;

        if !self.verify_file(path, expected_hash)? {
            return Err(ModelError::VerificationFailed);
        }

        log::info!("{} file downloaded and verified successfully", file_type);
        Ok(())
    }

    /// Downloads a file the repository may legitimately lack.
    async fn fetch_optional(&self, url: &str, path: &Path) -> Result<(), ModelError> {
        if path.exists() {
            return Ok(());
        }
        let response = reqwest::get(url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            log::info!("No {} published at {}", CONFIG_FILE, url);
            return Ok(());
        }
        let bytes = response.error_for_status()?.bytes().await?;
        fs::write(path, &bytes)?;
        Ok(())
    }

    pub fn remove_download(&self, model: &RemoteModel) -> Result<(), ModelError> {
        let model_dir = self.get_model_dir(model);
        for file in [MODEL_FILE, TOKENIZER_FILE, CONFIG_FILE] {
            let path = model_dir.join(file);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Ensures that a model is downloaded and verified.
    /// If the model doesn't exist, it will be downloaded.
    /// If verification fails, it will be re-downloaded.
    pub async fn ensure_model_downloaded(&self, model: &RemoteModel) -> Result<(), ModelError> {
        log::info!("Checking if model {} is downloaded...", model.repo);
        if !self.is_model_downloaded(model) {
            log::info!("Model not found, downloading...");
            self.download_model(model).await?;
        } else if !self.verify_model(model)? {
            log::info!("Model verification failed, re-downloading...");
            self.remove_download(model)?;
            self.download_model(model).await?;
        } else {
            log::info!("Model verification successful");
        }
        Ok(())
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
