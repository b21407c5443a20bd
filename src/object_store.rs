//! Object store access
//!
//! `ObjectStore` is the seam between the dispatch loop and the bucket. The
//! production implementation talks to Cloudflare R2 through the S3 API.

use crate::classifier;
use crate::config::R2Config;
use crate::types::StoreObject;
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Snapshot of every object currently in the bucket
    async fn list_objects(&self) -> Result<Vec<StoreObject>, String>;

    /// Write an object to a local file, returning the number of bytes written
    async fn download_object(&self, key: &str, local_path: &Path) -> Result<u64, String>;

    async fn copy_object(&self, source_key: &str, dest_key: &str) -> Result<(), String>;

    async fn delete_object(&self, key: &str) -> Result<(), String>;

    /// Rename `key` to its processed form and return the new key.
    ///
    /// Copy then delete; not atomic. Stores with a native move should
    /// override this.
    async fn mark_processed(&self, key: &str) -> Result<String, String> {
        let dest = classifier::processed_key(key);
        self.copy_object(key, &dest).await?;
        self.delete_object(key).await.map_err(|e| {
            format!("Copied {} to {} but failed to delete the original: {}", key, dest, e)
        })?;
        Ok(dest)
    }
}

/// Cloudflare R2 bucket accessed through the S3 API
pub struct R2Store {
    client: Client,
    bucket: String,
}

impl R2Store {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Build an S3 client for the configured R2 account
    pub async fn connect(config: &R2Config) -> Self {
        let endpoint_url = config.endpoint();
        tracing::info!("R2 storage: {} (bucket: {})", endpoint_url, config.bucket_name);

        let aws_config = aws_config::from_env()
            .endpoint_url(&endpoint_url)
            .region(Region::new("auto"))
            .credentials_provider(Credentials::new(
                config.access_key_id.clone(),
                config.secret_access_key.clone(),
                None,
                None,
                "static",
            ))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(true)
            .build();

        Self::new(Client::from_conf(s3_config), config.bucket_name.clone())
    }
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[async_trait]
impl ObjectStore for R2Store {
    async fn list_objects(&self) -> Result<Vec<StoreObject>, String> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(|e| {
                    format!("Failed to list bucket {}: {}", self.bucket, DisplayErrorContext(&e))
                })?;

            for object in res.contents() {
                if let Some(key) = object.key() {
                    objects.push(StoreObject {
                        key: key.to_string(),
                        size: object.size().unwrap_or(0).max(0) as u64,
                        last_modified: object.last_modified().and_then(to_chrono),
                    });
                }
            }

            match res.next_continuation_token() {
                Some(token) if res.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn download_object(&self, key: &str, local_path: &Path) -> Result<u64, String> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch {}: {}", key, DisplayErrorContext(&e)))?;

        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }

        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| format!("Failed to create {}: {}", local_path.display(), e))?;

        let mut body = res.body;
        let mut written: u64 = 0;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| format!("Failed to read body of {}: {}", key, e))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("Failed to write {}: {}", local_path.display(), e))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| format!("Failed to flush {}: {}", local_path.display(), e))?;

        Ok(written)
    }

    async fn copy_object(&self, source_key: &str, dest_key: &str) -> Result<(), String> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, source_key))
            .key(dest_key)
            .send()
            .await
            .map_err(|e| {
                format!("Failed to copy {} to {}: {}", source_key, dest_key, DisplayErrorContext(&e))
            })?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), String> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| format!("Failed to delete {}: {}", key, DisplayErrorContext(&e)))?;
        Ok(())
    }
}
