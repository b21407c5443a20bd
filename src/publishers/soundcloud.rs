//! SoundCloud audio publisher: one multipart POST per track.

use super::{content_type_for, file_name, http_client, AudioPublisher};
use crate::api_contracts::{track_fields, TrackResponse};
use crate::auth::Authenticator;
use crate::config::SoundCloudConfig;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct SoundCloudPublisher {
    base_url: String,
    client: reqwest::Client,
    authenticator: Arc<dyn Authenticator>,
    sharing: String,
}

impl SoundCloudPublisher {
    /// Publisher with private sharing (used by tests)
    pub fn new(base_url: String, authenticator: Arc<dyn Authenticator>) -> Self {
        let config = SoundCloudConfig {
            api_base_url: base_url,
            ..SoundCloudConfig::default()
        };
        Self::from_config(&config, authenticator, Duration::from_secs(60))
    }

    pub fn from_config(
        config: &SoundCloudConfig,
        authenticator: Arc<dyn Authenticator>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout),
            authenticator,
            sharing: config.sharing.clone(),
        }
    }

    fn tracks_url(&self) -> String {
        format!("{}/tracks", self.base_url)
    }
}

#[async_trait]
impl AudioPublisher for SoundCloudPublisher {
    async fn publish(&self, file_path: &Path, title: &str) -> Result<String, String> {
        tracing::info!("Uploading {} to SoundCloud...", title);

        let token = self.authenticator.access_token().await?;

        let file_contents = tokio::fs::read(file_path)
            .await
            .map_err(|e| format!("Failed to read file: {}", e))?;

        let part = reqwest::multipart::Part::bytes(file_contents)
            .file_name(file_name(file_path)?)
            .mime_str(content_type_for(file_path))
            .map_err(|e| format!("Invalid content type: {}", e))?;

        let form = reqwest::multipart::Form::new()
            .part(track_fields::ASSET_DATA, part)
            .text(track_fields::TITLE, title.to_string())
            .text(track_fields::SHARING, self.sharing.clone());

        let response = self.client
            .post(self.tracks_url())
            .header(AUTHORIZATION, format!("OAuth {}", token))
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        // Anything but 201 Created is a failure, even other 2xx codes
        if response.status() != StatusCode::CREATED {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("SoundCloud error {}: {}", status, error_text));
        }

        let track: TrackResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))?;

        tracing::info!("SoundCloud upload complete! Track URL: {}", track.permalink_url);
        Ok(track.permalink_url)
    }
}
