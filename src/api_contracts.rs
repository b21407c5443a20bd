/**
 * API Contract Types for the publishing services
 *
 * These types define the exact structure of requests/responses exchanged
 * with YouTube Data API v3 (videos.insert) and the SoundCloud tracks API.
 *
 * Principles:
 * - Only the fields the relay reads or writes are modelled
 * - Unknown response fields are ignored
 * - Use serde attributes to match the vendor JSON format exactly
 */

use serde::{Deserialize, Serialize};

// =============================================================================
// YouTube: videos.insert
// =============================================================================

/// Metadata part of a video resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

/// Visibility part of a video resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub privacy_status: String, // "private" | "unlisted" | "public"
}

/// Body of the resumable session request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoResource {
    pub snippet: VideoSnippet,
    pub status: VideoStatus,
}

impl VideoResource {
    /// Value for the `part` query parameter, matching the populated parts
    pub const PARTS: &'static str = "snippet,status";
}

/// Final response once all bytes are committed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoInsertResponse {
    pub id: String,
}

/// Standard Google API error envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleErrorResponse {
    pub error: GoogleError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleError {
    pub code: u16,
    pub message: String,
}

// =============================================================================
// SoundCloud: POST /tracks
// =============================================================================

/// Multipart field names for a track upload
pub mod track_fields {
    pub const ASSET_DATA: &str = "track[asset_data]";
    pub const TITLE: &str = "track[title]";
    pub const SHARING: &str = "track[sharing]";
}

/// Created track (only the fields the relay uses)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackResponse {
    #[serde(default)]
    pub id: Option<u64>,
    pub permalink_url: String,
}
