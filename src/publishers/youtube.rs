//! YouTube video publisher
//!
//! Uses the resumable upload protocol of the Data API v3:
//! 1. POST the video metadata to open an upload session (`Location` header)
//! 2. PUT the file in chunks with `Content-Range`, 308 meaning "send more"
//! 3. The final chunk returns the created video resource

use super::{content_type_for, http_client, VideoPublisher};
use crate::api_contracts::{GoogleErrorResponse, VideoInsertResponse, VideoResource, VideoSnippet, VideoStatus};
use crate::auth::Authenticator;
use crate::config::YouTubeConfig;
use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE, LOCATION, RANGE};
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Chunk sizes must be a multiple of this (256 KiB), except the last chunk
pub const CHUNK_GRANULARITY: usize = 256 * 1024;

/// Bytes committed by the server so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        ((self.bytes_sent.min(self.total_bytes) * 100) / self.total_bytes) as u8
    }
}

pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Round a requested chunk size down to the protocol granularity
pub fn effective_chunk_size(requested: usize) -> usize {
    (requested / CHUNK_GRANULARITY * CHUNK_GRANULARITY).max(CHUNK_GRANULARITY)
}

/// Parse a `Range: bytes=0-N` header into the number of committed bytes
fn committed_bytes(range: &str) -> Option<u64> {
    let (_, last) = range.trim().strip_prefix("bytes=")?.split_once('-')?;
    last.trim().parse::<u64>().ok().map(|n| n + 1)
}

/// Message of a Google error envelope, or the raw body when it is not one
fn error_message(body: String) -> String {
    match serde_json::from_str::<GoogleErrorResponse>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body,
    }
}

pub struct YouTubePublisher {
    base_url: String,
    client: reqwest::Client,
    authenticator: Arc<dyn Authenticator>,
    tags: Vec<String>,
    category_id: String,
    privacy_status: String,
    chunk_size: usize,
    on_progress: Option<ProgressCallback>,
}

impl YouTubePublisher {
    /// Publisher with the default metadata settings (used by tests)
    pub fn new(base_url: String, authenticator: Arc<dyn Authenticator>) -> Self {
        let config = YouTubeConfig {
            api_base_url: base_url,
            ..YouTubeConfig::default()
        };
        Self::from_config(&config, authenticator, Duration::from_secs(60))
    }

    pub fn from_config(
        config: &YouTubeConfig,
        authenticator: Arc<dyn Authenticator>,
        timeout: Duration,
    ) -> Self {
        Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client: http_client(timeout),
            authenticator,
            tags: config.tags.clone(),
            category_id: config.category_id.clone(),
            privacy_status: config.privacy_status.clone(),
            chunk_size: effective_chunk_size(config.chunk_size_bytes),
            on_progress: None,
        }
    }

    /// Observe upload progress instead of logging it
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/youtube/v3/videos", self.base_url)
    }

    fn report_progress(&self, progress: UploadProgress) {
        match &self.on_progress {
            Some(callback) => callback(progress),
            None => tracing::info!("Uploaded {}%", progress.percent()),
        }
    }

    /// Open a resumable session and return its URI
    async fn start_session(
        &self,
        token: &str,
        resource: &VideoResource,
        total: u64,
        content_type: &str,
    ) -> Result<String, String> {
        let mut url = reqwest::Url::parse(&self.upload_url())
            .map_err(|e| format!("Invalid base URL: {}", e))?;
        url.query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("part", VideoResource::PARTS);

        let response = self.client
            .post(url)
            .bearer_auth(token)
            .header("X-Upload-Content-Length", total.to_string())
            .header("X-Upload-Content-Type", content_type)
            .json(resource)
            .send()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = error_message(response.text().await.unwrap_or_default());
            return Err(format!("Failed to start upload session {}: {}", status, error_text));
        }

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| "Upload session response has no Location header".to_string())
    }

    /// Send the file in chunks until the server returns the video resource
    async fn upload_chunks(
        &self,
        session_uri: &str,
        token: &str,
        file_path: &Path,
        total: u64,
        content_type: &str,
    ) -> Result<VideoInsertResponse, String> {
        let mut file = tokio::fs::File::open(file_path)
            .await
            .map_err(|e| format!("Failed to open {}: {}", file_path.display(), e))?;

        let mut offset: u64 = 0;
        while offset < total {
            let len = (self.chunk_size as u64).min(total - offset) as usize;
            let mut chunk = vec![0u8; len];
            file.seek(SeekFrom::Start(offset))
                .await
                .map_err(|e| format!("Failed to seek {}: {}", file_path.display(), e))?;
            file.read_exact(&mut chunk)
                .await
                .map_err(|e| format!("Failed to read {}: {}", file_path.display(), e))?;

            let end = offset + len as u64 - 1;
            let response = self.client
                .put(session_uri)
                .bearer_auth(token)
                .header(CONTENT_TYPE, content_type)
                .header(CONTENT_RANGE, format!("bytes {}-{}/{}", offset, end, total))
                .body(chunk)
                .send()
                .await
                .map_err(|e| format!("Network error: {}", e))?;

            let status = response.status();
            if status.is_success() {
                self.report_progress(UploadProgress { bytes_sent: total, total_bytes: total });
                return response
                    .json::<VideoInsertResponse>()
                    .await
                    .map_err(|e| format!("Failed to parse response: {}", e));
            }

            if status.as_u16() != 308 {
                let error_text = error_message(response.text().await.unwrap_or_default());
                return Err(format!("Upload failed {}: {}", status, error_text));
            }

            // No Range header means nothing has been committed yet
            let committed = response
                .headers()
                .get(RANGE)
                .and_then(|v| v.to_str().ok())
                .and_then(committed_bytes)
                .unwrap_or(0);

            if committed <= offset {
                return Err(format!(
                    "Upload made no progress at byte {} of {}",
                    offset, total
                ));
            }

            offset = committed;
            self.report_progress(UploadProgress { bytes_sent: offset, total_bytes: total });
        }

        Err("Server accepted every byte but never returned a video".to_string())
    }
}

#[async_trait]
impl VideoPublisher for YouTubePublisher {
    async fn publish(&self, file_path: &Path, title: &str, description: &str) -> Result<String, String> {
        tracing::info!("Uploading {} to YouTube...", title);

        let token = self.authenticator.access_token().await?;

        let total = tokio::fs::metadata(file_path)
            .await
            .map_err(|e| format!("Failed to stat {}: {}", file_path.display(), e))?
            .len();
        if total == 0 {
            return Err(format!("Refusing to upload empty file {}", file_path.display()));
        }

        let content_type = content_type_for(file_path);
        let resource = VideoResource {
            snippet: VideoSnippet {
                title: title.to_string(),
                description: description.to_string(),
                tags: self.tags.clone(),
                category_id: self.category_id.clone(),
            },
            status: VideoStatus {
                privacy_status: self.privacy_status.clone(),
            },
        };

        let session_uri = self.start_session(&token, &resource, total, content_type).await?;
        let video = self
            .upload_chunks(&session_uri, &token, file_path, total, content_type)
            .await?;

        tracing::info!("YouTube upload complete! Video ID: {}", video.id);
        Ok(video.id)
    }
}
