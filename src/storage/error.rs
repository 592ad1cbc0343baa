//! Error types for object-store downloads.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed source for SDK errors, which are generic over their operation.
type SdkSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during object-store downloads.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The object URL is malformed or has no bucket segment.
    #[error("invalid object URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// No objects matched the bucket/prefix.
    #[error("no objects under s3://{bucket}/{prefix}")]
    NotFound {
        /// The bucket that was listed.
        bucket: String,
        /// The key prefix that matched nothing.
        prefix: String,
    },

    /// Listing the bucket failed (access denied, unknown bucket,
    /// transient store fault).
    #[error("failed to list s3://{bucket}/{prefix}: {source}")]
    List {
        /// The bucket being listed.
        bucket: String,
        /// The key prefix being listed.
        prefix: String,
        /// The underlying SDK error.
        #[source]
        source: SdkSource,
    },

    /// Retrieving one object failed.
    #[error("failed to get object {key}: {source}")]
    Get {
        /// The object key that failed.
        key: String,
        /// The underlying SDK error.
        #[source]
        source: SdkSource,
    },

    /// File system error while writing a retrieved object.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a list-operation error.
    pub fn list(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        source: impl Into<SdkSource>,
    ) -> Self {
        Self::List {
            bucket: bucket.into(),
            prefix: prefix.into(),
            source: source.into(),
        }
    }

    /// Creates a get-operation error.
    pub fn get(key: impl Into<String>, source: impl Into<SdkSource>) -> Self {
        Self::Get {
            key: key.into(),
            source: source.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
