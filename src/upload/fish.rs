//! Fish Audio voice model client

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{UploadOutcome, Uploader};
use crate::config::UploadConfig;
use crate::{Error, Result};

/// Form fields sent alongside the audio when creating a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelForm {
    pub visibility: String,
    pub model_type: String,
    pub train_mode: String,
    pub enhance_audio_quality: bool,
}

impl Default for ModelForm {
    fn default() -> Self {
        Self {
            visibility: "private".to_string(),
            model_type: "tts".to_string(),
            train_mode: "fast".to_string(),
            enhance_audio_quality: true,
        }
    }
}

/// A voice model owned by the account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoiceModel {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize)]
struct CreateModelResponse {
    #[serde(rename = "_id")]
    id: Option<String>,
}

#[derive(Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    items: Vec<VoiceModel>,
}

/// Creates and lists voice models through the Fish Audio API
pub struct FishAudioClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    form: ModelForm,
}

impl FishAudioClient {
    /// Create a client for `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(base_url: impl Into<String>, api_key: SecretString, form: ModelForm) -> Result<Self> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(Error::Config("Fish Audio API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            form,
        })
    }

    /// Create a client from the upload section of the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn from_config(config: &UploadConfig) -> Result<Self> {
        Self::new(
            config.api_url.clone(),
            SecretString::from(config.api_key.expose_secret().to_string()),
            ModelForm {
                visibility: config.visibility.clone(),
                model_type: config.model_type.clone(),
                train_mode: config.train_mode.clone(),
                enhance_audio_quality: config.enhance_audio_quality,
            },
        )
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key.expose_secret())
    }

    /// Upload a WAV file as a new voice model
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, the request fails, the API
    /// answers with a non-success status or the body is not JSON
    pub async fn create_model(&self, artifact: &Path, title: &str) -> Result<UploadOutcome> {
        let audio = tokio::fs::read(artifact).await?;
        tracing::debug!(
            audio_bytes = audio.len(),
            title,
            "uploading voice model sample"
        );

        let part = Part::bytes(audio)
            .file_name(format!("{title}.wav"))
            .mime_str("audio/wav")
            .map_err(|e| Error::Upload(e.to_string()))?;

        let form = Form::new()
            .part("voices", part)
            .text("visibility", self.form.visibility.clone())
            .text("type", self.form.model_type.clone())
            .text("title", title.to_string())
            .text("train_mode", self.form.train_mode.clone())
            .text(
                "enhance_audio_quality",
                self.form.enhance_audio_quality.to_string(),
            );

        let response = self
            .client
            .post(format!("{}/model", self.base_url))
            .header("Authorization", self.auth_header())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, title, "voice model request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, title, "voice model API error");
            return Err(Error::Upload(format!("API error {status}: {body}")));
        }

        let body = response.text().await?;
        let result: CreateModelResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body = %body, "failed to parse voice model response");
            e
        })?;

        match result.id.filter(|id| !id.is_empty()) {
            Some(id) => {
                tracing::info!(title, model_id = %id, "voice model created");
                Ok(UploadOutcome::Created { id })
            }
            None => {
                tracing::warn!(title, "voice model submitted but response carried no id");
                Ok(UploadOutcome::SubmittedWithoutId)
            }
        }
    }

    /// List the account's own voice models (first page only)
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response is malformed
    pub async fn list_models(&self, page_size: u32) -> Result<Vec<VoiceModel>> {
        let response = self
            .client
            .get(format!("{}/model", self.base_url))
            .header("Authorization", self.auth_header())
            .query(&[
                ("self_only", "true".to_string()),
                ("page_size", page_size.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upload(format!("API error {status}: {body}")));
        }

        let page: ListModelsResponse = serde_json::from_str(&response.text().await?)?;
        tracing::debug!(
            total = page.total,
            returned = page.items.len(),
            "listed voice models"
        );
        Ok(page.items)
    }
}

#[async_trait]
impl Uploader for FishAudioClient {
    async fn upload(&self, artifact: &Path, title: &str) -> Result<UploadOutcome> {
        self.create_model(artifact, title).await
    }

    fn name(&self) -> &'static str {
        "fish-audio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key() {
        let err = FishAudioClient::new(
            "https://api.fish.audio",
            SecretString::from(String::new()),
            ModelForm::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn trims_trailing_slash() {
        let client = FishAudioClient::new(
            "https://api.fish.audio/",
            SecretString::from("tok".to_string()),
            ModelForm::default(),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://api.fish.audio");
        assert_eq!(client.auth_header(), "Bearer tok");
    }

    #[test]
    fn parses_model_page() {
        let page: ListModelsResponse = serde_json::from_str(
            r#"{"total":2,"items":[{"_id":"a1","title":"Andy"},{"_id":"b2","title":"Matt","visibility":"private"}]}"#,
        )
        .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[1].title, "Matt");
    }

    #[test]
    fn create_response_id_is_optional() {
        let with_id: CreateModelResponse = serde_json::from_str(r#"{"_id":"m1"}"#).unwrap();
        assert_eq!(with_id.id.as_deref(), Some("m1"));

        let without: CreateModelResponse = serde_json::from_str(r#"{"state":"training"}"#).unwrap();
        assert!(without.id.is_none());
    }
}
