//! Core types shared by the store, the publishers and the dispatch loop.
//!
//! Nothing here is persisted by the relay itself; the object store is the
//! only state store (see `classifier::is_processed`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An object as reported by a bucket listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl StoreObject {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
        }
    }
}

/// Which publisher a key is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Unrecognized,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Unrecognized => "unrecognized",
        }
    }
}

/// Durable reference returned by a publisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PublishedMedia {
    /// YouTube video id
    VideoId(String),
    /// SoundCloud track permalink
    TrackUrl(String),
}

impl std::fmt::Display for PublishedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishedMedia::VideoId(id) => write!(f, "video {}", id),
            PublishedMedia::TrackUrl(url) => write!(f, "track {}", url),
        }
    }
}

/// Step of the per-object pipeline that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Download,
    Publish,
    Mark,
}

/// Why an object was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyProcessed,
    UnrecognizedExtension,
}

/// What happened to a single object during one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ObjectOutcome {
    Published { key: String, remote: PublishedMedia },
    Skipped { key: String, reason: SkipReason },
    Failed { key: String, stage: FailureStage, error: String },
}

impl ObjectOutcome {
    pub fn key(&self) -> &str {
        match self {
            ObjectOutcome::Published { key, .. }
            | ObjectOutcome::Skipped { key, .. }
            | ObjectOutcome::Failed { key, .. } => key,
        }
    }
}
