//! Hardware-aware model loading and staged music generation.
//!
//! [`InferenceService`] implements the
//! [`InferenceBackend`](diffrhythm_core::inference::InferenceBackend)
//! contract consumed by the task executor.

pub mod config;
pub mod hardware;
pub mod service;

pub use config::InferenceConfig;
pub use hardware::{Device, DevicePreference, HardwareProfile};
pub use service::InferenceService;
