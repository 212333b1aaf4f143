//! TOML configuration file loading
//!
//! Supports `~/.config/voice-batcher/config.toml` (or `--config <PATH>`) as a
//! persistent config source. All fields are optional; the file is a partial
//! overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{ClearPolicy, StitchOrder};
use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct BatcherConfigFile {
    /// Folder watching and batching
    #[serde(default)]
    pub monitor: MonitorFileConfig,

    /// Target format for the stitched artifact
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Voice model API
    #[serde(default)]
    pub upload: UploadFileConfig,
}

/// Monitor loop configuration
#[derive(Debug, Default, Deserialize)]
pub struct MonitorFileConfig {
    /// Folder the game mod drops clips into
    pub monitor_dir: Option<String>,

    /// Scratch folder for stitched artifacts
    pub work_dir: Option<String>,

    /// Cumulative clip duration that triggers a batch
    pub threshold_secs: Option<f64>,

    /// Pause between cycles
    pub poll_interval_secs: Option<f64>,

    pub stitch_order: Option<StitchOrder>,

    pub clear_policy: Option<ClearPolicy>,
}

/// Target audio format
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// Voice model API configuration
#[derive(Debug, Default, Deserialize)]
pub struct UploadFileConfig {
    /// Set to false to keep artifacts locally instead of uploading
    pub enabled: Option<bool>,

    /// API base URL (e.g. "https://api.fish.audio")
    pub api_url: Option<String>,

    /// API token; `FISH_AUDIO_API_KEY` takes precedence
    pub api_key: Option<String>,

    pub visibility: Option<String>,
    pub model_type: Option<String>,
    pub train_mode: Option<String>,
    pub enhance_audio_quality: Option<bool>,

    /// Prefix for generated model titles (e.g. "Batch")
    pub title_prefix: Option<String>,
}

/// Load the TOML config file
///
/// Uses `path` when given, otherwise the standard location. Returns
/// `BatcherConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> BatcherConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return BatcherConfigFile::default();
    };

    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return BatcherConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_config(&path, &content),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            BatcherConfigFile::default()
        }
    }
}

/// Read a config file the user named explicitly
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML
pub fn read_config_file(path: &Path) -> Result<BatcherConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

fn parse_config(path: &Path, content: &str) -> BatcherConfigFile {
    match toml::from_str(content) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse config file, using defaults"
            );
            BatcherConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voice-batcher/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-batcher").join("config.toml"))
}
