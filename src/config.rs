//! Relay configuration
//!
//! Resolution order, lowest to highest priority:
//! 1. Built-in defaults
//! 2. `config.json` in the app config directory (if present)
//! 3. Variables compiled in at build time (`REVIEW_RELAY_* cargo build`)
//! 4. Variables set at runtime (`REVIEW_RELAY_* ./review-relay`)

use crate::config_utils;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_DOWNLOAD_DIR: &str = "downloaded_reviews";
pub const DEFAULT_TOKEN_FILE: &str = "token.json";
pub const YOUTUBE_UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";

/// Cloudflare R2 bucket access
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct R2Config {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Overrides `https://<account_id>.r2.cloudflarestorage.com`
    pub endpoint_url: Option<String>,
}

impl R2Config {
    pub fn endpoint(&self) -> String {
        match &self.endpoint_url {
            Some(url) => url.clone(),
            None => format!("https://{}.r2.cloudflarestorage.com", self.account_id),
        }
    }
}

/// Video publishing (YouTube Data API v3)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// Authorized-user token file produced by a prior OAuth consent flow
    pub token_file: PathBuf,
    pub scopes: Vec<String>,
    pub api_base_url: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy_status: String,
    pub chunk_size_bytes: usize,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            scopes: vec![YOUTUBE_UPLOAD_SCOPE.to_string()],
            api_base_url: "https://www.googleapis.com".to_string(),
            tags: vec!["Review".to_string(), "Testimonial".to_string()],
            category_id: "22".to_string(), // People & Blogs
            privacy_status: "unlisted".to_string(),
            chunk_size_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Audio publishing (SoundCloud)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundCloudConfig {
    pub access_token: String,
    pub api_base_url: String,
    pub sharing: String,
}

impl Default for SoundCloudConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            api_base_url: "https://api.soundcloud.com".to_string(),
            sharing: "private".to_string(),
        }
    }
}

/// Everything the dispatch loop and its collaborators need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub r2: R2Config,
    pub youtube: YouTubeConfig,
    pub soundcloud: SoundCloudConfig,
    /// Scratch directory for downloaded objects (never cleaned up)
    pub download_dir: PathBuf,
    pub title_prefix: String,
    pub description: String,
    /// Repeat the run every N seconds; a single run when unset
    pub poll_interval_secs: Option<u64>,
    pub http_timeout_secs: u64,
    /// Write a JSON run report to the logs directory after every run
    pub save_run_reports: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            r2: R2Config::default(),
            youtube: YouTubeConfig::default(),
            soundcloud: SoundCloudConfig::default(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            title_prefix: "Review - ".to_string(),
            description: "User submitted review".to_string(),
            poll_interval_secs: None,
            http_timeout_secs: 300,
            save_run_reports: true,
        }
    }
}

/// Value baked into the binary at build time, if any
fn compiled_in(name: &str) -> Option<&'static str> {
    match name {
        "REVIEW_RELAY_R2_ACCOUNT_ID" => option_env!("REVIEW_RELAY_R2_ACCOUNT_ID"),
        "REVIEW_RELAY_R2_ACCESS_KEY_ID" => option_env!("REVIEW_RELAY_R2_ACCESS_KEY_ID"),
        "REVIEW_RELAY_R2_SECRET_ACCESS_KEY" => option_env!("REVIEW_RELAY_R2_SECRET_ACCESS_KEY"),
        "REVIEW_RELAY_BUCKET" => option_env!("REVIEW_RELAY_BUCKET"),
        "REVIEW_RELAY_SOUNDCLOUD_ACCESS_TOKEN" => option_env!("REVIEW_RELAY_SOUNDCLOUD_ACCESS_TOKEN"),
        _ => None,
    }
}

impl RelayConfig {
    /// Load configuration from defaults, config file, and environment
    pub fn load() -> Result<Self, String> {
        let mut config: RelayConfig = config_utils::load_config_file(config_utils::CONFIG_FILE_NAME)?
            .unwrap_or_default();

        config.apply_overrides(|name| {
            env::var(name)
                .ok()
                .or_else(|| compiled_in(name).map(String::from))
        })?;

        Ok(config)
    }

    /// Apply `REVIEW_RELAY_*` overrides from the given lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_fields: [(&str, &mut String); 5] = [
            ("REVIEW_RELAY_R2_ACCOUNT_ID", &mut self.r2.account_id),
            ("REVIEW_RELAY_R2_ACCESS_KEY_ID", &mut self.r2.access_key_id),
            ("REVIEW_RELAY_R2_SECRET_ACCESS_KEY", &mut self.r2.secret_access_key),
            ("REVIEW_RELAY_BUCKET", &mut self.r2.bucket_name),
            ("REVIEW_RELAY_SOUNDCLOUD_ACCESS_TOKEN", &mut self.soundcloud.access_token),
        ];
        for (name, field) in string_fields {
            if let Some(value) = lookup(name) {
                *field = value;
            }
        }

        if let Some(url) = lookup("REVIEW_RELAY_R2_ENDPOINT") {
            self.r2.endpoint_url = Some(url);
        }
        if let Some(path) = lookup("REVIEW_RELAY_YOUTUBE_TOKEN_FILE") {
            self.youtube.token_file = PathBuf::from(path);
        }
        if let Some(dir) = lookup("REVIEW_RELAY_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("REVIEW_RELAY_POLL_INTERVAL_SECS") {
            let secs: u64 = secs.trim().parse()
                .map_err(|e| format!("Invalid REVIEW_RELAY_POLL_INTERVAL_SECS '{}': {}", secs, e))?;
            // 0 means "run once"
            self.poll_interval_secs = if secs == 0 { None } else { Some(secs) };
        }

        Ok(())
    }

    /// Check that the store can be reached with this configuration.
    ///
    /// Publisher credentials are deliberately not checked here: a missing
    /// token only fails the objects that need it.
    pub fn validate(&self) -> Result<(), String> {
        if self.r2.bucket_name.trim().is_empty() {
            return Err("Bucket name is not configured".to_string());
        }
        if self.r2.endpoint_url.is_none() && self.r2.account_id.trim().is_empty() {
            return Err("R2 account id is not configured".to_string());
        }
        if self.r2.access_key_id.is_empty() || self.r2.secret_access_key.is_empty() {
            return Err("R2 access key pair is not configured".to_string());
        }
        if self.download_dir.as_os_str().is_empty() {
            return Err("Download directory is not configured".to_string());
        }
        if self.youtube.chunk_size_bytes == 0 {
            return Err("YouTube chunk size must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.r2.account_id = "acct".to_string();
        config.r2.access_key_id = "key".to_string();
        config.r2.secret_access_key = "secret".to_string();
        config.r2.bucket_name = "reviews".to_string();
        config
    }

    #[test]
    fn test_defaults_match_script_conventions() {
        let config = RelayConfig::default();
        assert_eq!(config.download_dir, PathBuf::from("downloaded_reviews"));
        assert_eq!(config.title_prefix, "Review - ");
        assert_eq!(config.description, "User submitted review");
        assert_eq!(config.youtube.token_file, PathBuf::from("token.json"));
        assert_eq!(config.youtube.scopes, vec![YOUTUBE_UPLOAD_SCOPE.to_string()]);
        assert_eq!(config.youtube.privacy_status, "unlisted");
        assert_eq!(config.soundcloud.sharing, "private");
        assert_eq!(config.poll_interval_secs, None);
    }

    #[test]
    fn test_r2_endpoint_from_account_id() {
        let config = valid_config();
        assert_eq!(config.r2.endpoint(), "https://acct.r2.cloudflarestorage.com");
    }

    #[test]
    fn test_r2_endpoint_override() {
        let mut config = valid_config();
        config.r2.endpoint_url = Some("http://localhost:9000".to_string());
        assert_eq!(config.r2.endpoint(), "http://localhost:9000");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"r2": {"bucket_name": "payal-reviews"}, "poll_interval_secs": 60}"#;
        let config: RelayConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.r2.bucket_name, "payal-reviews");
        assert_eq!(config.poll_interval_secs, Some(60));
        assert_eq!(config.youtube.category_id, "22");
        assert_eq!(config.download_dir, PathBuf::from(DEFAULT_DOWNLOAD_DIR));
    }

    #[test]
    fn test_apply_overrides() {
        let vars: HashMap<&str, &str> = [
            ("REVIEW_RELAY_R2_ACCOUNT_ID", "env-acct"),
            ("REVIEW_RELAY_BUCKET", "env-bucket"),
            ("REVIEW_RELAY_DOWNLOAD_DIR", "/tmp/relay"),
            ("REVIEW_RELAY_POLL_INTERVAL_SECS", "120"),
        ]
        .into_iter()
        .collect();

        let mut config = valid_config();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.r2.account_id, "env-acct");
        assert_eq!(config.r2.bucket_name, "env-bucket");
        assert_eq!(config.r2.access_key_id, "key"); // untouched
        assert_eq!(config.download_dir, PathBuf::from("/tmp/relay"));
        assert_eq!(config.poll_interval_secs, Some(120));
    }

    #[test]
    fn test_apply_overrides_zero_interval_means_once() {
        let mut config = valid_config();
        config.poll_interval_secs = Some(30);
        config
            .apply_overrides(|name| (name == "REVIEW_RELAY_POLL_INTERVAL_SECS").then(|| "0".to_string()))
            .unwrap();
        assert_eq!(config.poll_interval_secs, None);
    }

    #[test]
    fn test_apply_overrides_rejects_bad_interval() {
        let mut config = valid_config();
        let result = config
            .apply_overrides(|name| (name == "REVIEW_RELAY_POLL_INTERVAL_SECS").then(|| "soon".to_string()));
        assert!(result.unwrap_err().contains("REVIEW_RELAY_POLL_INTERVAL_SECS"));
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_bucket() {
        let mut config = valid_config();
        config.r2.bucket_name = "  ".to_string();
        assert!(config.validate().unwrap_err().contains("Bucket"));
    }

    #[test]
    fn test_validate_missing_keys() {
        let mut config = valid_config();
        config.r2.secret_access_key.clear();
        assert!(config.validate().unwrap_err().contains("access key"));
    }

    #[test]
    fn test_validate_account_optional_with_endpoint() {
        let mut config = valid_config();
        config.r2.account_id.clear();
        assert!(config.validate().is_err());

        config.r2.endpoint_url = Some("http://localhost:9000".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_ignores_publisher_tokens() {
        let config = valid_config();
        assert!(config.soundcloud.access_token.is_empty());
        assert!(config.validate().is_ok());
    }
}
