//! Error types for voice-batcher

use thiserror::Error;

/// Result type alias for voice-batcher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while batching and uploading voice clips
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio decoding, conversion or export error
    #[error("audio error: {0}")]
    Audio(String),

    /// Voice model API error
    #[error("upload error: {0}")]
    Upload(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
