//! Device and precision selection.
//!
//! Hardware detection itself happens outside this service; the detected
//! capabilities arrive as a [`HardwareProfile`].

use std::fmt;
use std::str::FromStr;

use diffrhythm_core::generation::Precision;
use diffrhythm_core::inference::InferenceError;

/// Capabilities of the machine the model runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardwareProfile {
    pub gpu_available: bool,
    /// GPU compute capability supports half precision (7.0 and newer).
    pub fp16_supported: bool,
}

/// Where the operator asked the model to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    #[default]
    Auto,
    Cuda,
    Cpu,
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid device '{0}'. Must be one of: auto, cuda, cpu")]
pub struct InvalidDevice(pub String);

impl FromStr for DevicePreference {
    type Err = InvalidDevice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            "cpu" => Ok(DevicePreference::Cpu),
            _ => Err(InvalidDevice(s.to_string())),
        }
    }
}

/// Device the model is actually loaded on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => f.write_str("cuda"),
            Device::Cpu => f.write_str("cpu"),
        }
    }
}

/// Pick the device for a preference. Asking for CUDA without a GPU is an
/// error rather than a silent CPU fallback.
pub fn resolve_device(
    preference: DevicePreference,
    hardware: HardwareProfile,
) -> Result<Device, InferenceError> {
    match preference {
        DevicePreference::Auto if hardware.gpu_available => Ok(Device::Cuda),
        DevicePreference::Auto | DevicePreference::Cpu => Ok(Device::Cpu),
        DevicePreference::Cuda if hardware.gpu_available => Ok(Device::Cuda),
        DevicePreference::Cuda => Err(InferenceError::ModelLoad(
            "CUDA requested but no GPU is available".into(),
        )),
    }
}

/// Adjust the requested precision to what the device can run.
///
/// CPU always runs fp32. fp16 on a GPU without half-precision support
/// falls back to fp32.
pub fn resolve_precision(device: Device, requested: Precision, hardware: HardwareProfile) -> Precision {
    match (device, requested) {
        (Device::Cpu, _) => Precision::Fp32,
        (Device::Cuda, Precision::Fp16) if !hardware.fp16_supported => {
            tracing::warn!("FP16 not supported on this GPU, falling back to FP32");
            Precision::Fp32
        }
        (Device::Cuda, p) => p,
    }
}
