//! Music generation request parameters and their validation.
//!
//! [`GenerateRequest`] is the HTTP-facing input; it is validated eagerly so
//! that bad input never reaches the task registry. [`GenerationParams`] is
//! the normalized form stored in a task's parameter map and handed to the
//! inference collaborator.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::TaskParams;

// ---------------------------------------------------------------------------
// Limits and defaults
// ---------------------------------------------------------------------------

/// Song name used when a task's parameters omit one.
pub const DEFAULT_SONG_NAME: &str = "generated";
/// Default number of samples generated per request.
pub const DEFAULT_BATCH_SIZE: u32 = 1;
/// Default cap on generated audio length in seconds.
pub const DEFAULT_MAX_DURATION_SECS: u32 = 300;

/// Audio container formats accepted as a style reference.
pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg"];

// ---------------------------------------------------------------------------
// Precision
// ---------------------------------------------------------------------------

/// Numeric precision the model runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Fp32,
    #[default]
    Fp16,
    Int8,
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Fp32 => "fp32",
            Precision::Fp16 => "fp16",
            Precision::Int8 => "int8",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fp32" => Ok(Precision::Fp32),
            "fp16" => Ok(Precision::Fp16),
            "int8" => Ok(Precision::Int8),
            other => Err(CoreError::Validation(format!(
                "Invalid precision '{other}'. Must be one of: fp32, fp16, int8"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateRequest {
    #[validate(length(min = 1, max = 200))]
    pub song_name: String,
    #[validate(length(min = 1, max = 10000))]
    pub lyrics: String,
    #[validate(length(max = 500))]
    pub style_prompt: Option<String>,
    pub style_audio_path: Option<String>,
    #[serde(default = "default_precision")]
    pub precision: String,
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, max = 8))]
    pub batch_size: u32,
    #[serde(default = "default_max_duration")]
    #[validate(range(min = 1))]
    pub max_duration: u32,
}

fn default_precision() -> String {
    Precision::default().as_str().to_string()
}

fn default_batch_size() -> u32 {
    DEFAULT_BATCH_SIZE
}

fn default_max_duration() -> u32 {
    DEFAULT_MAX_DURATION_SECS
}

impl GenerateRequest {
    /// Validate every field and normalize into [`GenerationParams`].
    ///
    /// Lyrics are trimmed. An empty style prompt counts as absent; at least
    /// one of the prompt or the reference audio must remain.
    pub fn into_params(self) -> Result<GenerationParams, CoreError> {
        self.validate()?;

        let lyrics = self.lyrics.trim();
        if lyrics.is_empty() {
            return Err(CoreError::Validation("Lyrics cannot be empty".into()));
        }

        let precision: Precision = self.precision.parse()?;

        let style_audio_path = match self.style_audio_path.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                let path = PathBuf::from(raw);
                validate_style_audio_path(&path)?;
                Some(path)
            }
            _ => None,
        };

        let style_prompt = self.style_prompt.filter(|p| !p.trim().is_empty());

        if style_prompt.is_none() && style_audio_path.is_none() {
            return Err(CoreError::Validation(
                "Either style_prompt or style_audio_path is required".into(),
            ));
        }

        Ok(GenerationParams {
            song_name: self.song_name,
            lyrics: lyrics.to_string(),
            style_prompt,
            style_audio_path,
            precision,
            batch_size: self.batch_size,
            max_duration: self.max_duration,
        })
    }
}

/// Check that a style reference file exists and has a supported extension.
pub fn validate_style_audio_path(path: &Path) -> Result<(), CoreError> {
    if !path.exists() {
        return Err(CoreError::Validation(format!(
            "Audio file not found: {}",
            path.display()
        )));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if SUPPORTED_AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unsupported audio format '.{ext}'. Must be one of: {}",
            SUPPORTED_AUDIO_EXTENSIONS.join(", ")
        )))
    }
}

// ---------------------------------------------------------------------------
// Normalized parameters
// ---------------------------------------------------------------------------

/// Parameters handed to the inference collaborator.
///
/// Missing keys in a task's parameter map fall back to the defaults below,
/// so `{"lyrics": "hello"}` is a valid (if style-less) parameter set. Field
/// limits match [`GenerateRequest`]; whether lyrics and a style source are
/// present is left to the inference collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GenerationParams {
    #[validate(length(min = 1, max = 200))]
    pub song_name: String,
    #[validate(length(max = 10000))]
    pub lyrics: String,
    #[validate(length(max = 500))]
    pub style_prompt: Option<String>,
    pub style_audio_path: Option<PathBuf>,
    pub precision: Precision,
    #[validate(range(min = 1, max = 8))]
    pub batch_size: u32,
    #[validate(range(min = 1))]
    pub max_duration: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            song_name: DEFAULT_SONG_NAME.to_string(),
            lyrics: String::new(),
            style_prompt: None,
            style_audio_path: None,
            precision: Precision::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_duration: DEFAULT_MAX_DURATION_SECS,
        }
    }
}

impl GenerationParams {
    /// Decode from a task's parameter map and check the field limits.
    pub fn from_task_params(params: &TaskParams) -> Result<Self, CoreError> {
        let decoded: Self = serde_json::from_value(serde_json::Value::Object(params.clone()))
            .map_err(|e| CoreError::Validation(format!("Invalid generation parameters: {e}")))?;

        decoded.validate()?;
        if let Some(path) = &decoded.style_audio_path {
            validate_style_audio_path(path)?;
        }
        Ok(decoded)
    }

    /// Encode into a task parameter map.
    pub fn to_task_params(&self) -> Result<TaskParams, CoreError> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(CoreError::Internal(
                "Generation parameters did not serialize to an object".into(),
            )),
            Err(e) => Err(CoreError::Internal(e.to_string())),
        }
    }

    /// Whether a style prompt or a style reference audio is present.
    pub fn has_style(&self) -> bool {
        self.style_prompt
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
            || self.style_audio_path.is_some()
    }
}
