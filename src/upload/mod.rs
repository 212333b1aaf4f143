//! Submission of stitched artifacts to the voice model API
//!
//! The monitor loop only sees the [`Uploader`] trait; the real client and
//! the disabled stand-in both implement it.

mod fish;

pub use fish::{FishAudioClient, ModelForm, VoiceModel};

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::Result;

/// Successful result of an upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The API created a model and returned its identifier
    Created { id: String },
    /// The API accepted the request but returned no identifier
    SubmittedWithoutId,
    /// Uploading is switched off; the artifact stays on disk
    Disabled,
}

impl UploadOutcome {
    /// Whether the artifact must be kept for inspection
    #[must_use]
    pub const fn keeps_artifact(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created { id } => write!(f, "created model {id}"),
            Self::SubmittedWithoutId => write!(f, "submitted without id"),
            Self::Disabled => write!(f, "upload disabled"),
        }
    }
}

/// Destination for stitched artifacts
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Submit the artifact at `artifact` as a new voice model named `title`
    ///
    /// # Errors
    ///
    /// Returns error on network failure or a non-success API response
    async fn upload(&self, artifact: &Path, title: &str) -> Result<UploadOutcome>;

    /// Uploader name for logging
    fn name(&self) -> &'static str;
}

/// Uploader used when uploads are switched off for local testing
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledUploader;

#[async_trait]
impl Uploader for DisabledUploader {
    async fn upload(&self, artifact: &Path, title: &str) -> Result<UploadOutcome> {
        tracing::warn!(
            title,
            artifact = %artifact.display(),
            "upload disabled, keeping artifact for inspection"
        );
        Ok(UploadOutcome::Disabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
