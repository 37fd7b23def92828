//! Staged generation service.
//!
//! The diffusion sampler and vocoder are not part of this service; it owns
//! model preparation (device and precision selection, output directory)
//! and drives generation through fixed stages. Every stage boundary
//! reports progress, which doubles as the cancellation checkpoint.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use diffrhythm_core::generation::{GenerationParams, Precision};
use diffrhythm_core::inference::{
    GenerationOutput, InferenceBackend, InferenceError, ProgressSink,
};
use rand::Rng;
use tokio::sync::Mutex;

use crate::config::InferenceConfig;
use crate::hardware::{resolve_device, resolve_precision, Device};

/// Model state kept resident between generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedModel {
    pub device: Device,
    pub precision: Precision,
}

/// Hardware-aware model loading and staged generation.
pub struct InferenceService {
    config: InferenceConfig,
    model: Mutex<Option<LoadedModel>>,
}

impl InferenceService {
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            config,
            model: Mutex::new(None),
        }
    }

    /// Load the model for `requested` precision, reusing the resident one
    /// when the resolved device and precision match.
    pub async fn prepare_model(&self, requested: Precision) -> Result<LoadedModel, InferenceError> {
        let device = resolve_device(self.config.device, self.config.hardware)?;
        let precision = resolve_precision(device, requested, self.config.hardware);
        let wanted = LoadedModel { device, precision };

        let mut slot = self.model.lock().await;
        if *slot == Some(wanted) {
            return Ok(wanted);
        }

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| {
                InferenceError::ModelLoad(format!(
                    "cannot create output directory {}: {e}",
                    self.config.output_dir.display()
                ))
            })?;

        if slot.is_some() {
            tracing::info!(%device, %precision, "Reloading model with new settings");
        }
        tracing::info!(%device, %precision, "Model prepared");
        *slot = Some(wanted);
        Ok(wanted)
    }

    /// Release the resident model, returning what was loaded.
    pub async fn unload_model(&self) -> Option<LoadedModel> {
        let released = self.model.lock().await.take();
        if let Some(model) = released {
            tracing::info!(device = %model.device, precision = %model.precision, "Model unloaded");
        }
        released
    }

    /// Wait one step, then report `fraction`.
    async fn stage(
        &self,
        progress: &dyn ProgressSink,
        fraction: f64,
        message: &str,
    ) -> Result<(), InferenceError> {
        progress.checkpoint()?;
        if self.config.step_delay > Duration::ZERO {
            tokio::time::sleep(self.config.step_delay).await;
        }
        progress.report(fraction, message)?;
        Ok(())
    }

    fn output_path(&self, song_name: &str) -> PathBuf {
        let safe_name: String = song_name
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        let suffix: u32 = rand::rng().random_range(1000..10000);
        self.config
            .output_dir
            .join(format!("{safe_name}_{suffix}.mp3"))
    }
}

#[async_trait::async_trait]
impl InferenceBackend for InferenceService {
    async fn generate(
        &self,
        params: GenerationParams,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<GenerationOutput, InferenceError> {
        progress.report(0.1, "Preparing model...")?;
        let model = self.prepare_model(params.precision).await?;
        progress.report(0.2, "Model prepared, optimizing parameters...")?;

        if params.lyrics.trim().is_empty() {
            return Err(InferenceError::InvalidParams("Lyrics is required".into()));
        }
        if !params.has_style() {
            return Err(InferenceError::InvalidParams(
                "Style prompt or audio is required".into(),
            ));
        }

        tracing::debug!(
            song_name = %params.song_name,
            device = %model.device,
            precision = %model.precision,
            batch_size = params.batch_size,
            max_duration = params.max_duration,
            "Starting generation",
        );

        self.stage(progress.as_ref(), 0.3, "Processing lyrics...").await?;
        self.stage(progress.as_ref(), 0.5, "Generating music...").await?;
        self.stage(progress.as_ref(), 0.9, "Finalizing output...").await?;

        let output_path = self.output_path(&params.song_name);
        self.stage(progress.as_ref(), 1.0, "Generation completed").await?;

        tracing::info!(output_path = %output_path.display(), "Inference completed");

        Ok(GenerationOutput {
            output_path,
            song_name: params.song_name,
            message: "Music generated successfully".into(),
        })
    }
}
