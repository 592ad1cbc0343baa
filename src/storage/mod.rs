//! Object-store downloads for products served from an S3-compatible
//! bucket (Open Telekom Cloud OBS for the Mundi deployment).
//!
//! Credentials are passed in explicitly and never read from the
//! environment. The object URL uses the in-bucket form
//! `scheme://host/bucket/key...`: the first path segment is the bucket,
//! the remainder is the object key or prefix. Prefix downloads mirror the
//! key structure as a subdirectory tree under the target path.

mod error;

use std::path::{Path, PathBuf};

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

pub use error::StorageError;

/// Fixed OBS endpoint for the Mundi deployment.
pub const OBS_ENDPOINT: &str = "https://obs.eu-de.otc.t-systems.com/";

/// Region of the fixed OBS endpoint.
pub const OBS_REGION: &str = "eu-de";

/// Client for an S3-compatible object store.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    client: aws_sdk_s3::Client,
}

impl ObjectStore {
    /// Connects to the Mundi OBS endpoint with an explicit credential
    /// pair.
    #[must_use]
    pub fn connect(access_key: &str, secret_key: &str) -> Self {
        Self::with_endpoint(OBS_ENDPOINT, OBS_REGION, access_key, secret_key)
    }

    /// Connects to a custom S3-compatible endpoint (mirrors, MinIO in
    /// tests). Path-style addressing is forced: OBS-style deployments do
    /// not resolve virtual-host bucket names.
    #[must_use]
    pub fn with_endpoint(endpoint: &str, region: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "mundi");
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        Self {
            client: aws_sdk_s3::Client::from_conf(config),
        }
    }

    /// Downloads the object(s) at an in-bucket URL into `target_path`.
    ///
    /// The matching objects are listed under the URL's bucket/prefix and
    /// each is written below the target path, mirroring its key relative
    /// to the prefix. A single exact-key match is written to the target
    /// path itself (or into it, when the target is a directory).
    ///
    /// Returns the paths written, in listing order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the URL has no bucket, the listing
    /// matches nothing, or any list/get/write operation fails. No retry
    /// beyond what the SDK itself performs.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn download(
        &self,
        url: &str,
        target_path: &Path,
    ) -> Result<Vec<PathBuf>, StorageError> {
        let (bucket, prefix) = parse_object_url(url)?;
        let keys = self.list_keys(&bucket, &prefix).await?;
        if keys.is_empty() {
            return Err(StorageError::NotFound { bucket, prefix });
        }

        let target_is_dir = tokio::fs::metadata(target_path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);

        let mut written = Vec::with_capacity(keys.len());
        for key in keys {
            let local = local_path(target_path, target_is_dir, &prefix, &key);
            self.fetch_object(&bucket, &key, &local).await?;
            written.push(local);
        }

        info!(count = written.len(), "object-store download complete");
        Ok(written)
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| StorageError::list(bucket, prefix, e))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }
        }

        debug!(bucket, prefix, count = keys.len(), "listed objects");
        Ok(keys)
    }

    async fn fetch_object(
        &self,
        bucket: &str,
        key: &str,
        local: &Path,
    ) -> Result<(), StorageError> {
        if let Some(parent) = local.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent.to_path_buf(), e))?;
        }

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::get(key, e))?;

        let file = File::create(local)
            .await
            .map_err(|e| StorageError::io(local.to_path_buf(), e))?;
        let mut writer = BufWriter::new(file);

        let mut body = output.body;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StorageError::get(key, e))?
        {
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| StorageError::io(local.to_path_buf(), e))?;
        }

        writer
            .flush()
            .await
            .map_err(|e| StorageError::io(local.to_path_buf(), e))?;

        debug!(key, path = %local.display(), "object written");
        Ok(())
    }
}

/// Splits an in-bucket URL into bucket and key prefix.
fn parse_object_url(url: &str) -> Result<(String, String), StorageError> {
    let parsed = Url::parse(url).map_err(|_| StorageError::invalid_url(url))?;
    let mut segments = parsed
        .path_segments()
        .ok_or_else(|| StorageError::invalid_url(url))?;
    let bucket = segments
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| StorageError::invalid_url(url))?
        .to_string();
    let prefix = segments.collect::<Vec<_>>().join("/");
    Ok((bucket, prefix))
}

/// Local path for one retrieved key, mirroring the key structure
/// relative to the prefix.
fn local_path(target: &Path, target_is_dir: bool, prefix: &str, key: &str) -> PathBuf {
    let relative = key
        .strip_prefix(prefix)
        .unwrap_or(key)
        .trim_start_matches('/');
    if relative.is_empty() {
        // Exact-key match.
        if target_is_dir {
            let name = key.rsplit('/').next().unwrap_or(key);
            target.join(name)
        } else {
            target.to_path_buf()
        }
    } else {
        target.join(relative)
    }
}
