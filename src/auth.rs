//! Credential providers for the publishers.
//!
//! The relay never runs an OAuth consent flow and never refreshes tokens. It
//! only reads credentials that were obtained beforehand. A missing or expired
//! credential is reported to the caller as an error for that one publish
//! attempt.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Supplies a bearer/OAuth access token for a publisher
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn access_token(&self) -> Result<String, String>;
}

/// Authorized-user token file, as written by Google's OAuth client libraries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUserToken {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<String>,
}

impl AuthorizedUserToken {
    /// Parse the `expiry` field; accepts RFC 3339 and the naive UTC form
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.expiry.as_deref()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expiry) => expiry <= now,
            None => false,
        }
    }
}

/// Reads the video credential from a token file on every call
pub struct TokenFileAuthenticator {
    path: PathBuf,
    required_scopes: Vec<String>,
}

impl TokenFileAuthenticator {
    pub fn new(path: PathBuf, required_scopes: Vec<String>) -> Self {
        Self {
            path,
            required_scopes,
        }
    }

    fn check(&self, token: AuthorizedUserToken, now: DateTime<Utc>) -> Result<String, String> {
        let access_token = token
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| format!("No access token in {}", self.path.display()))?;

        // Files without a scope list are accepted as-is
        if !token.scopes.is_empty() {
            if let Some(missing) = self
                .required_scopes
                .iter()
                .find(|s| !token.scopes.contains(s))
            {
                return Err(format!(
                    "Token in {} lacks scope {}",
                    self.path.display(),
                    missing
                ));
            }
        }

        if token.is_expired(now) {
            return Err(format!(
                "Token in {} expired at {}. Please run the OAuth flow again.",
                self.path.display(),
                token.expiry.as_deref().unwrap_or_default()
            ));
        }

        Ok(access_token)
    }
}

#[async_trait]
impl Authenticator for TokenFileAuthenticator {
    async fn access_token(&self) -> Result<String, String> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(format!(
                    "Valid '{}' not found. Please run the OAuth flow first.",
                    self.path.display()
                ));
            }
            Err(e) => return Err(format!("Failed to read {}: {}", self.path.display(), e)),
        };

        let token: AuthorizedUserToken = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse {}: {}", self.path.display(), e))?;

        self.check(token, Utc::now())
    }
}

/// A fixed token, e.g. the SoundCloud access token from configuration
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl Authenticator for StaticToken {
    async fn access_token(&self) -> Result<String, String> {
        if self.token.trim().is_empty() {
            return Err("No access token configured".to_string());
        }
        Ok(self.token.clone())
    }
}
