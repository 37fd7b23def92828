use std::path::PathBuf;
use std::time::Duration;

use crate::hardware::{DevicePreference, HardwareProfile};

/// Inference configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Directory generated audio is written to.
    pub output_dir: PathBuf,
    /// Requested device (default: auto).
    pub device: DevicePreference,
    /// Capabilities reported by hardware detection.
    pub hardware: HardwareProfile,
    /// Pause between generation stages. Each stage boundary is a
    /// cancellation checkpoint.
    pub step_delay: Duration,
}

impl InferenceConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default          |
    /// |---------------------------|------------------|
    /// | `OUTPUT_DIR`              | `Build/outputs`  |
    /// | `INFERENCE_DEVICE`        | `auto`           |
    /// | `GPU_AVAILABLE`           | `false`          |
    /// | `FP16_SUPPORTED`          | `false`          |
    /// | `INFERENCE_STEP_DELAY_MS` | `500`            |
    pub fn from_env() -> Self {
        let output_dir = std::env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("Build/outputs"));

        let device: DevicePreference = std::env::var("INFERENCE_DEVICE")
            .unwrap_or_else(|_| "auto".into())
            .parse()
            .unwrap_or_else(|e| panic!("INFERENCE_DEVICE: {e}"));

        let hardware = HardwareProfile {
            gpu_available: env_flag("GPU_AVAILABLE"),
            fp16_supported: env_flag("FP16_SUPPORTED"),
        };

        let step_delay_ms: u64 = std::env::var("INFERENCE_STEP_DELAY_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("INFERENCE_STEP_DELAY_MS must be a valid u64");

        Self {
            output_dir,
            device,
            hardware,
            step_delay: Duration::from_millis(step_delay_ms),
        }
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
