//! Key conventions used as the bucket protocol.
//!
//! The object store is the only state store: a key is handled once it carries
//! the `.processed` suffix, and the extension decides which publisher gets it.

use crate::types::MediaKind;
use std::path::{Path, PathBuf};

/// Literal suffix appended to a key once it has been published
pub const PROCESSED_SUFFIX: &str = ".processed";

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg"];

/// Check whether a key was already handled by a previous run
#[inline]
pub fn is_processed(key: &str) -> bool {
    key.ends_with(PROCESSED_SUFFIX)
}

/// Key an object is renamed to once handled
pub fn processed_key(key: &str) -> String {
    format!("{}{}", key, PROCESSED_SUFFIX)
}

/// Classify a key by its extension (case-insensitive)
pub fn classify(key: &str) -> MediaKind {
    let ext = match Path::new(key).extension().and_then(|e| e.to_str()) {
        Some(ext) => ext,
        None => return MediaKind::Unrecognized,
    };

    if VIDEO_EXTENSIONS.iter().any(|v| ext.eq_ignore_ascii_case(v)) {
        MediaKind::Video
    } else if AUDIO_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)) {
        MediaKind::Audio
    } else {
        MediaKind::Unrecognized
    }
}

/// Title used for both publishers, e.g. "Review - clip.mp4".
/// Not unique: two buckets with the same key produce the same title.
pub fn review_title(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

/// Local staging path for a key inside the scratch directory.
///
/// Keys are split on `/` so that "2024/clip.mp4" lands in a subfolder. Keys
/// that could escape the scratch directory are rejected.
pub fn scratch_path(scratch_dir: &Path, key: &str) -> Result<PathBuf, String> {
    if key.is_empty() {
        return Err("Empty object key".to_string());
    }

    let mut path = scratch_dir.to_path_buf();
    for segment in key.split('/') {
        match segment {
            "" | "." | ".." => {
                return Err(format!("Refusing to stage unsafe key: {}", key));
            }
            s if s.contains('\\') => {
                return Err(format!("Refusing to stage unsafe key: {}", key));
            }
            s => path.push(s),
        }
    }

    Ok(path)
}
