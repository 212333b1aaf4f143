//! Configuration management for voice-batcher
//!
//! Values are layered: CLI overrides > environment > TOML file > defaults.

pub mod file;

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::audio::AudioFormat;
use crate::{Error, Result};

/// Environment variable holding the voice model API token
pub const API_KEY_ENV: &str = "FISH_AUDIO_API_KEY";

/// Default voice model API base URL
pub const DEFAULT_API_URL: &str = "https://api.fish.audio";

/// Order in which a batch's clips are concatenated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StitchOrder {
    /// Sort by file name
    #[default]
    Lexical,
    /// Order in which files were first tracked
    Discovery,
}

/// Which files the end-of-cycle clear deletes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ClearPolicy {
    /// Every regular file in the monitored folder
    #[default]
    All,
    /// Everything except files still waiting in the tracked set
    RetainPending,
}

/// Voice-batcher configuration
#[derive(Debug)]
pub struct Config {
    /// Monitor loop configuration
    pub monitor: MonitorConfig,

    /// Voice model API configuration
    pub upload: UploadConfig,
}

/// Monitor loop configuration
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Folder watched for new `.wav` clips
    pub monitor_dir: PathBuf,

    /// Scratch folder for stitched artifacts, recreated on startup
    pub work_dir: PathBuf,

    /// Cumulative tracked duration that triggers a batch
    pub threshold: Duration,

    /// Pause between cycles
    pub poll_interval: Duration,

    /// Format the stitched artifact is normalized to
    pub target: AudioFormat,

    pub stitch_order: StitchOrder,

    pub clear_policy: ClearPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitor_dir: PathBuf::from("../Dissonance_Diagnostics"),
            work_dir: PathBuf::from("temp_stitch_processing"),
            threshold: Duration::from_secs(50),
            poll_interval: Duration::from_secs(5),
            target: AudioFormat::default(),
            stitch_order: StitchOrder::default(),
            clear_policy: ClearPolicy::default(),
        }
    }
}

/// Voice model API configuration
#[derive(Debug)]
pub struct UploadConfig {
    /// When false, artifacts are kept in the work dir instead of uploaded
    pub enabled: bool,

    /// API base URL
    pub api_url: String,

    /// Bearer token
    pub api_key: SecretString,

    /// Model visibility form field
    pub visibility: String,

    /// Model type form field
    pub model_type: String,

    /// Training mode form field
    pub train_mode: String,

    /// Ask the API to enhance the uploaded audio
    pub enhance_audio_quality: bool,

    /// Prefix of generated model titles
    pub title_prefix: String,
}

/// Values supplied on the command line
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub monitor_dir: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub threshold_secs: Option<f64>,
    pub poll_interval_secs: Option<f64>,
    pub disable_upload: bool,
    pub stitch_order: Option<StitchOrder>,
    pub clear_policy: Option<ClearPolicy>,
}

impl Config {
    /// Load configuration from the TOML file and process environment
    ///
    /// An explicitly given `config_path` must exist and parse; the default
    /// location is optional.
    ///
    /// # Errors
    ///
    /// Returns error if the API token is missing, a value is invalid or the
    /// explicit config file is unusable
    pub fn load(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let fc = match config_path {
            Some(path) => file::read_config_file(path)?,
            None => file::load_config_file(None),
        };
        let config = Self::from_sources(fc, |key| std::env::var(key).ok())?;
        config.with_overrides(overrides)
    }

    /// Merge a parsed config file with an environment lookup (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if the API token is missing or a value is invalid
    pub fn from_sources<F>(fc: file::BatcherConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = MonitorConfig::default();

        let api_key = env(API_KEY_ENV)
            .filter(|k| !k.trim().is_empty())
            .or(fc.upload.api_key)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{API_KEY_ENV} is not set")))?;

        let threshold_secs = parse_env::<f64, _>(&env, "VOICE_BATCHER_THRESHOLD_SECS")?
            .or(fc.monitor.threshold_secs);
        let poll_interval_secs = parse_env::<f64, _>(&env, "VOICE_BATCHER_POLL_INTERVAL_SECS")?
            .or(fc.monitor.poll_interval_secs);

        let stitch_order = match env("VOICE_BATCHER_STITCH_ORDER") {
            Some(v) => Some(parse_choice::<StitchOrder>("VOICE_BATCHER_STITCH_ORDER", &v)?),
            None => fc.monitor.stitch_order,
        };
        let clear_policy = match env("VOICE_BATCHER_CLEAR_POLICY") {
            Some(v) => Some(parse_choice::<ClearPolicy>("VOICE_BATCHER_CLEAR_POLICY", &v)?),
            None => fc.monitor.clear_policy,
        };

        let target = AudioFormat {
            sample_rate: fc.audio.sample_rate.unwrap_or(defaults.target.sample_rate),
            channels: fc.audio.channels.unwrap_or(defaults.target.channels),
        };
        if target.sample_rate == 0 || target.channels == 0 {
            return Err(Error::Config(format!(
                "target format must be non-zero, got {target}"
            )));
        }

        let monitor = MonitorConfig {
            monitor_dir: env("VOICE_BATCHER_MONITOR_DIR")
                .or(fc.monitor.monitor_dir)
                .map_or(defaults.monitor_dir, PathBuf::from),
            work_dir: env("VOICE_BATCHER_WORK_DIR")
                .or(fc.monitor.work_dir)
                .map_or(defaults.work_dir, PathBuf::from),
            threshold: threshold_secs
                .map(|s| seconds("threshold", s))
                .transpose()?
                .unwrap_or(defaults.threshold),
            poll_interval: poll_interval_secs
                .map(|s| seconds("poll interval", s))
                .transpose()?
                .unwrap_or(defaults.poll_interval),
            target,
            stitch_order: stitch_order.unwrap_or_default(),
            clear_policy: clear_policy.unwrap_or_default(),
        };

        let upload = UploadConfig {
            enabled: env("VOICE_BATCHER_UPLOAD_ENABLED")
                .map(|v| parse_flag(&v))
                .or(fc.upload.enabled)
                .unwrap_or(true),
            api_url: env("FISH_AUDIO_API_URL")
                .or(fc.upload.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: SecretString::from(api_key),
            visibility: fc.upload.visibility.unwrap_or_else(|| "private".to_string()),
            model_type: fc.upload.model_type.unwrap_or_else(|| "tts".to_string()),
            train_mode: fc.upload.train_mode.unwrap_or_else(|| "fast".to_string()),
            enhance_audio_quality: fc.upload.enhance_audio_quality.unwrap_or(true),
            title_prefix: fc.upload.title_prefix.unwrap_or_else(|| "Batch".to_string()),
        };

        Ok(Self { monitor, upload })
    }

    /// Apply command-line overrides on top of the loaded values
    ///
    /// # Errors
    ///
    /// Returns error if an overriding duration is invalid
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(dir) = &overrides.monitor_dir {
            self.monitor.monitor_dir.clone_from(dir);
        }
        if let Some(dir) = &overrides.work_dir {
            self.monitor.work_dir.clone_from(dir);
        }
        if let Some(secs) = overrides.threshold_secs {
            self.monitor.threshold = seconds("threshold", secs)?;
        }
        if let Some(secs) = overrides.poll_interval_secs {
            self.monitor.poll_interval = seconds("poll interval", secs)?;
        }
        if overrides.disable_upload {
            self.upload.enabled = false;
        }
        if let Some(order) = overrides.stitch_order {
            self.monitor.stitch_order = order;
        }
        if let Some(policy) = overrides.clear_policy {
            self.monitor.clear_policy = policy;
        }
        Ok(self)
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn parse_env<T, F>(env: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("invalid {key} '{v}': {e}")))
        })
        .transpose()
}

fn parse_choice<T: clap::ValueEnum>(key: &str, value: &str) -> Result<T> {
    <T as clap::ValueEnum>::from_str(value.trim(), true)
        .map_err(|e| Error::Config(format!("invalid {key}: {e}")))
}

fn seconds(what: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| Error::Config(format!("invalid {what} of {secs} seconds: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::file::BatcherConfigFile;
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_with_token() {
        let config =
            Config::from_sources(BatcherConfigFile::default(), env_from(&[(API_KEY_ENV, "tok")]))
                .unwrap();

        assert_eq!(config.monitor, MonitorConfig::default());
        assert_eq!(config.monitor.threshold, Duration::from_secs(50));
        assert_eq!(config.monitor.target, AudioFormat::new(16_000, 1));
        assert!(config.upload.enabled);
        assert_eq!(config.upload.api_url, DEFAULT_API_URL);
        assert_eq!(config.upload.api_key.expose_secret(), "tok");
        assert_eq!(config.upload.visibility, "private");
        assert_eq!(config.upload.model_type, "tts");
        assert_eq!(config.upload.train_mode, "fast");
        assert!(config.upload.enhance_audio_quality);
    }

    #[test]
    fn missing_token_is_fatal() {
        let err = Config::from_sources(BatcherConfigFile::default(), env_from(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains(API_KEY_ENV)));

        let err = Config::from_sources(BatcherConfigFile::default(), env_from(&[(API_KEY_ENV, "  ")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_file() {
        let mut fc = BatcherConfigFile::default();
        fc.monitor.threshold_secs = Some(30.0);
        fc.monitor.monitor_dir = Some("from-file".to_string());
        fc.monitor.clear_policy = Some(ClearPolicy::RetainPending);
        fc.upload.api_key = Some("file-token".to_string());

        let config = Config::from_sources(
            fc,
            env_from(&[
                (API_KEY_ENV, "env-token"),
                ("VOICE_BATCHER_THRESHOLD_SECS", "12.5"),
                ("VOICE_BATCHER_STITCH_ORDER", "Discovery"),
                ("VOICE_BATCHER_UPLOAD_ENABLED", "false"),
            ]),
        )
        .unwrap();

        assert_eq!(config.monitor.threshold, Duration::from_millis(12_500));
        assert_eq!(config.monitor.monitor_dir, PathBuf::from("from-file"));
        assert_eq!(config.monitor.stitch_order, StitchOrder::Discovery);
        assert_eq!(config.monitor.clear_policy, ClearPolicy::RetainPending);
        assert!(!config.upload.enabled);
        assert_eq!(config.upload.api_key.expose_secret(), "env-token");
    }

    #[test]
    fn token_may_come_from_file() {
        let mut fc = BatcherConfigFile::default();
        fc.upload.api_key = Some("file-token".to_string());

        let config = Config::from_sources(fc, env_from(&[])).unwrap();
        assert_eq!(config.upload.api_key.expose_secret(), "file-token");
    }

    #[test]
    fn rejects_invalid_values() {
        let err = Config::from_sources(
            BatcherConfigFile::default(),
            env_from(&[(API_KEY_ENV, "tok"), ("VOICE_BATCHER_THRESHOLD_SECS", "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_sources(
            BatcherConfigFile::default(),
            env_from(&[(API_KEY_ENV, "tok"), ("VOICE_BATCHER_POLL_INTERVAL_SECS", "-1")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_sources(
            BatcherConfigFile::default(),
            env_from(&[(API_KEY_ENV, "tok"), ("VOICE_BATCHER_CLEAR_POLICY", "some")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let mut fc = BatcherConfigFile::default();
        fc.audio.channels = Some(0);
        let err = Config::from_sources(fc, env_from(&[(API_KEY_ENV, "tok")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn cli_overrides_win() {
        let config = Config::from_sources(
            BatcherConfigFile::default(),
            env_from(&[(API_KEY_ENV, "tok"), ("VOICE_BATCHER_MONITOR_DIR", "env-dir")]),
        )
        .unwrap()
        .with_overrides(&ConfigOverrides {
            monitor_dir: Some(PathBuf::from("cli-dir")),
            poll_interval_secs: Some(0.25),
            disable_upload: true,
            clear_policy: Some(ClearPolicy::RetainPending),
            ..ConfigOverrides::default()
        })
        .unwrap();

        assert_eq!(config.monitor.monitor_dir, PathBuf::from("cli-dir"));
        assert_eq!(config.monitor.poll_interval, Duration::from_millis(250));
        assert_eq!(config.monitor.clear_policy, ClearPolicy::RetainPending);
        assert!(!config.upload.enabled);
    }
}
