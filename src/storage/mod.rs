//! Object store adapter (C1): download/upload/copy/remove/tag against an
//! S3-compatible bucket.

pub mod keys;

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Tag, Tagging};
use aws_sdk_s3::Client;
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object store get failed for {key}: {source}")]
    Get { key: String, source: String },
    #[error("object store put failed for {key}: {source}")]
    Put { key: String, source: String },
    #[error("object store copy failed from {src} to {dst}: {source}")]
    Copy {
        src: String,
        dst: String,
        source: String,
    },
    #[error("object store remove failed for {key}: {source}")]
    Remove { key: String, source: String },
    #[error("object store tag failed for {key}: {source}")]
    Tag { key: String, source: String },
    #[error("local scratch I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The object-store operations the worker needs. Grounded on an S3-compatible
/// contract: get-to-file, put-from-file, copy, remove, remove-many, tag.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_to_file(&self, key: &str, dest: &Path) -> Result<(), ObjectStoreError>;
    async fn put_from_file(&self, key: &str, src: &Path) -> Result<(), ObjectStoreError>;
    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), ObjectStoreError>;
    async fn remove(&self, key: &str) -> Result<(), ObjectStoreError>;
    async fn remove_many(&self, keys: &[String]) -> Result<(), ObjectStoreError>;
    async fn set_public_tag(&self, key: &str, is_public: bool) -> Result<(), ObjectStoreError>;
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "insight-worker",
        );

        let sdk_config = aws_sdk_s3::config::Builder::new()
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_to_file(&self, key: &str, dest: &Path) -> Result<(), ObjectStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Get {
                key: key.to_string(),
                source: e.to_string(),
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::Get {
                key: key.to_string(),
                source: e.to_string(),
            })?;

        tokio::fs::write(dest, data.into_bytes()).await?;
        Ok(())
    }

    async fn put_from_file(&self, key: &str, src: &Path) -> Result<(), ObjectStoreError> {
        let body = ByteStream::from_path(src)
            .await
            .map_err(|e| ObjectStoreError::Put {
                key: key.to_string(),
                source: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Put {
                key: key.to_string(),
                source: e.to_string(),
            })?;

        Ok(())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<(), ObjectStoreError> {
        let copy_source = format!("{}/{}", self.bucket, src_key);
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(&copy_source)
            .key(dst_key)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Copy {
                src: src_key.to_string(),
                dst: dst_key.to_string(),
                source: e.to_string(),
            })?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Remove {
                key: key.to_string(),
                source: e.to_string(),
            })?;
        Ok(())
    }

    async fn remove_many(&self, keys: &[String]) -> Result<(), ObjectStoreError> {
        // Best-effort: a missing key is logged and the rest still run,
        // rather than one bad key aborting the whole batch.
        for key in keys {
            if let Err(err) = self.remove(key).await {
                tracing::warn!(%key, %err, "best-effort object delete failed");
            }
        }
        Ok(())
    }

    async fn set_public_tag(&self, key: &str, is_public: bool) -> Result<(), ObjectStoreError> {
        let tagging = Tagging::builder()
            .tag_set(
                Tag::builder()
                    .key("is_public")
                    .value(is_public.to_string())
                    .build()
                    .map_err(|e| ObjectStoreError::Tag {
                        key: key.to_string(),
                        source: e.to_string(),
                    })?,
            )
            .build()
            .map_err(|e| ObjectStoreError::Tag {
                key: key.to_string(),
                source: e.to_string(),
            })?;

        self.client
            .put_object_tagging()
            .bucket(&self.bucket)
            .key(key)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Tag {
                key: key.to_string(),
                source: e.to_string(),
            })?;

        Ok(())
    }
}
