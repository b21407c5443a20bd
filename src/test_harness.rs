//! Test doubles for the relay
//!
//! - `TestHarness`: mockito server with the YouTube and SoundCloud endpoints
//! - `MemoryStore`: in-memory bucket that records every call
//! - `FakeVideoPublisher` / `FakeAudioPublisher`: scripted publishers

use crate::object_store::ObjectStore;
use crate::publishers::{AudioPublisher, VideoPublisher};
use crate::types::StoreObject;
use async_trait::async_trait;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Write a media file for a publisher test
pub fn write_media_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

// =============================================================================
// Mock HTTP APIs
// =============================================================================

pub struct TestHarness {
    pub server: ServerGuard,
}

impl TestHarness {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        Self { server }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Mock the resumable session request; `Location` points back at this server
    pub fn mock_youtube_session(&mut self, session_id: &str) -> Mock {
        let location = format!("{}/upload/session/{}", self.url(), session_id);
        self.server.mock("POST", "/upload/youtube/v3/videos")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".to_string(), "resumable".to_string()),
                Matcher::UrlEncoded("part".to_string(), "snippet,status".to_string()),
            ]))
            .match_header("authorization", Matcher::Regex(r"Bearer .+".to_string()))
            .match_header("x-upload-content-length", Matcher::Regex(r"^\d+$".to_string()))
            .match_body(Matcher::PartialJson(json!({
                "snippet": { "categoryId": "22", "tags": ["Review", "Testimonial"] },
                "status": { "privacyStatus": "unlisted" }
            })))
            .with_status(200)
            .with_header("location", &location)
            .create()
    }

    /// Mock a rejected session request
    pub fn mock_youtube_session_failure(&mut self, status: usize, message: &str) -> Mock {
        self.server.mock("POST", "/upload/youtube/v3/videos")
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({
                "error": { "code": status, "message": message }
            }).to_string())
            .create()
    }

    /// Mock the chunk that completes the upload
    pub fn mock_youtube_chunk(&mut self, session_id: &str, content_range: &str, video_id: &str) -> Mock {
        self.server.mock("PUT", format!("/upload/session/{}", session_id).as_str())
            .match_header("content-range", content_range)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({
                "kind": "youtube#video",
                "id": video_id
            }).to_string())
            .create()
    }

    /// Mock a "308 Resume Incomplete" chunk response
    pub fn mock_youtube_incomplete(
        &mut self,
        session_id: &str,
        content_range: &str,
        committed_range: Option<&str>,
    ) -> Mock {
        let mock = self.server.mock("PUT", format!("/upload/session/{}", session_id).as_str())
            .match_header("content-range", content_range)
            .with_status(308);
        match committed_range {
            Some(range) => mock.with_header("range", range).create(),
            None => mock.create(),
        }
    }

    /// Mock POST /tracks returning 201 Created
    pub fn mock_soundcloud_created(&mut self, permalink_url: &str) -> Mock {
        self.server.mock("POST", "/tracks")
            .match_header("authorization", Matcher::Regex(r"OAuth .+".to_string()))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(json!({
                "id": 42,
                "kind": "track",
                "permalink_url": permalink_url
            }).to_string())
            .create()
    }

    /// Mock POST /tracks with any other status and a raw body
    pub fn mock_soundcloud_failure(&mut self, status: usize, body: &str) -> Mock {
        self.server.mock("POST", "/tracks")
            .with_status(status)
            .with_body(body)
            .create()
    }
}

// =============================================================================
// In-memory object store
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
    fail_list: bool,
    fail_download: HashSet<String>,
    fail_delete: bool,
}

impl MemoryStore {
    pub fn with_objects(objects: &[(&str, &str)]) -> Self {
        let store = Self::default();
        for (key, contents) in objects {
            store.insert(key, contents.as_bytes());
        }
        store
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn fail_download_of(mut self, key: &str) -> Self {
        self.fail_download.insert(key.to_string());
        self
    }

    pub fn fail_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn insert(&self, key: &str, contents: &[u8]) {
        self.objects.lock().unwrap().insert(key.to_string(), contents.to_vec());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Every mutating or reading call, in order ("download k", "copy a -> b", ...)
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("download ").map(String::from))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self) -> Result<Vec<StoreObject>, String> {
        if self.fail_list {
            return Err("Failed to list bucket reviews: connection refused".to_string());
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(key, data)| StoreObject::new(key.clone(), data.len() as u64))
            .collect())
    }

    async fn download_object(&self, key: &str, local_path: &Path) -> Result<u64, String> {
        self.record(format!("download {}", key));
        if self.fail_download.contains(key) {
            return Err(format!("Failed to fetch {}: timed out", key));
        }
        let data = self.get(key).ok_or_else(|| format!("Failed to fetch {}: NoSuchKey", key))?;
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        fs::write(local_path, &data).map_err(|e| e.to_string())?;
        Ok(data.len() as u64)
    }

    async fn copy_object(&self, source_key: &str, dest_key: &str) -> Result<(), String> {
        self.record(format!("copy {} -> {}", source_key, dest_key));
        let data = self
            .get(source_key)
            .ok_or_else(|| format!("Failed to copy {}: NoSuchKey", source_key))?;
        self.insert(dest_key, &data);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), String> {
        self.record(format!("delete {}", key));
        if self.fail_delete {
            return Err(format!("Failed to delete {}: access denied", key));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// =============================================================================
// Scripted publishers
// =============================================================================

/// One publisher invocation, with the staged file contents at call time
#[derive(Debug, Clone, PartialEq)]
pub struct PublishCall {
    pub path: PathBuf,
    pub title: String,
    pub description: Option<String>,
    pub contents: Vec<u8>,
}

pub struct FakeVideoPublisher {
    result: Result<String, String>,
    calls: Mutex<Vec<PublishCall>>,
}

impl FakeVideoPublisher {
    pub fn succeeding(video_id: &str) -> Self {
        Self { result: Ok(video_id.to_string()), calls: Mutex::new(Vec::new()) }
    }

    pub fn failing(error: &str) -> Self {
        Self { result: Err(error.to_string()), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<PublishCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoPublisher for FakeVideoPublisher {
    async fn publish(&self, file_path: &Path, title: &str, description: &str) -> Result<String, String> {
        self.calls.lock().unwrap().push(PublishCall {
            path: file_path.to_path_buf(),
            title: title.to_string(),
            description: Some(description.to_string()),
            contents: fs::read(file_path).unwrap_or_default(),
        });
        self.result.clone()
    }
}

pub struct FakeAudioPublisher {
    result: Result<String, String>,
    calls: Mutex<Vec<PublishCall>>,
}

impl FakeAudioPublisher {
    pub fn succeeding(url: &str) -> Self {
        Self { result: Ok(url.to_string()), calls: Mutex::new(Vec::new()) }
    }

    pub fn failing(error: &str) -> Self {
        Self { result: Err(error.to_string()), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<PublishCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioPublisher for FakeAudioPublisher {
    async fn publish(&self, file_path: &Path, title: &str) -> Result<String, String> {
        self.calls.lock().unwrap().push(PublishCall {
            path: file_path.to_path_buf(),
            title: title.to_string(),
            description: None,
            contents: fs::read(file_path).unwrap_or_default(),
        });
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_lists_sorted_keys() {
        let store = MemoryStore::with_objects(&[("b.mp3", "bb"), ("a.mp4", "a")]);
        let objects = store.list_objects().await.unwrap();

        let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a.mp4", "b.mp3"]);
        assert_eq!(objects[1].size, 2);
    }

    #[tokio::test]
    async fn test_memory_store_download_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = MemoryStore::with_objects(&[("nested/a.mp4", "payload")]);
        let target = temp_dir.path().join("nested").join("a.mp4");

        let written = store.download_object("nested/a.mp4", &target).await.unwrap();

        assert_eq!(written, 7);
        assert_eq!(fs::read(&target).unwrap(), b"payload");
        assert_eq!(store.downloads(), vec!["nested/a.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_fake_publishers_record_calls() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_media_file(temp_dir.path(), "clip.mp4", b"abc");

        let video = FakeVideoPublisher::failing("boom");
        assert_eq!(video.publish(&path, "t", "d").await, Err("boom".to_string()));
        assert_eq!(video.calls()[0].contents, b"abc");

        let audio = FakeAudioPublisher::succeeding("https://soundcloud.com/x");
        assert!(audio.publish(&path, "t").await.is_ok());
        assert_eq!(audio.calls()[0].description, None);
    }
}
