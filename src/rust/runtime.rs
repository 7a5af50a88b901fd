use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use std::fmt;
use std::sync::OnceLock;

use crate::classifier::ModelLoadError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// The compute device a session actually runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
        }
    }
}

/// Which device the caller asks for. `Auto` prefers the accelerator and
/// falls back to the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DevicePreference {
    #[default]
    Auto,
    Cpu,
    Cuda,
}

#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
    pub device: DevicePreference,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
            device: DevicePreference::Auto,
        }
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
            device: self.device,
        }
    }
}

fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

fn init_onnx_environment() -> ort::Result<()> {
    ort::init()
        .with_name("topiclass")
        .commit()?;
    Ok(())
}

/// Commits the process-wide ONNX Runtime environment. Safe to call repeatedly;
/// only the first call does any work and its outcome is remembered.
pub fn ensure_initialized() -> Result<(), ModelLoadError> {
    INIT.get_or_init(|| init_onnx_environment().map_err(|e| e.to_string()))
        .clone()
        .map_err(ModelLoadError::Runtime)
}

fn cuda_available() -> bool {
    match CUDAExecutionProvider::default().is_available() {
        Ok(available) => available,
        Err(e) => {
            log::debug!("Could not query CUDA execution provider: {}", e);
            false
        }
    }
}

/// Resolves a device preference against what this machine offers.
pub fn select_device(preference: DevicePreference) -> Result<Device, ModelLoadError> {
    match preference {
        DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Cuda if cuda_available() => Ok(Device::Cuda),
        DevicePreference::Cuda => Err(ModelLoadError::DeviceUnavailable(Device::Cuda)),
        DevicePreference::Auto if cuda_available() => Ok(Device::Cuda),
        DevicePreference::Auto => {
            log::info!("No accelerator available, falling back to CPU");
            Ok(Device::Cpu)
        }
    }
}

/// Builds a session builder configured for the selected device.
pub fn create_session_builder(
    config: &RuntimeConfig,
) -> Result<(SessionBuilder, Device), ModelLoadError> {
    ensure_initialized()?;
    let device = select_device(config.device)?;
    let mut builder = Session::builder()?;

    // Configure threading
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }

    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    builder = match device {
        Device::Cuda => builder.with_execution_providers([
            CUDAExecutionProvider::default().build().error_on_failure(),
        ])?,
        Device::Cpu => builder.with_execution_providers([CPUExecutionProvider::default().build()])?,
    };

    log::info!("Inference session configured for device: {}", device);
    Ok((builder, device))
}
