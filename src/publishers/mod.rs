//! Publishing services that accept a local file and return a durable
//! remote reference.
//!
//! The dispatch loop only sees the two traits; `youtube` and `soundcloud`
//! hold the HTTP implementations.

pub mod soundcloud;
pub mod youtube;

pub use soundcloud::SoundCloudPublisher;
pub use youtube::{UploadProgress, YouTubePublisher};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Uploads a video and returns the remote video id
#[async_trait]
pub trait VideoPublisher: Send + Sync {
    async fn publish(&self, file_path: &Path, title: &str, description: &str) -> Result<String, String>;
}

/// Uploads an audio file and returns the remote track URL
#[async_trait]
pub trait AudioPublisher: Send + Sync {
    async fn publish(&self, file_path: &Path, title: &str) -> Result<String, String>;
}

/// HTTP client shared by the publishers.
///
/// Redirects are disabled: the resumable upload protocol uses 308 as
/// "resume incomplete", which must reach the caller untouched.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    let version = env!("CARGO_PKG_VERSION");
    let user_agent = format!("ReviewRelay/{}", version);

    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(&user_agent)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// MIME type sent along with a media file, based on its extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

/// File name part of a path, for multipart uploads and log lines
pub(crate) fn file_name(path: &Path) -> Result<String, String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or_else(|| format!("Invalid filename: {}", path.display()))
}
