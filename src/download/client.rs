//! HTTP client for streaming archive downloads with resume support.
//!
//! Incomplete downloads live in the working directory under a temp name
//! derived deterministically from the destination path, so retrying the
//! same destination against the same working directory picks up where the
//! previous attempt stopped (a `Range` request from the partial file's
//! size). On success the temp file is atomically moved to its final
//! destination; on failure it is left behind for the next attempt.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{ARCHIVE_EXTENSION, CONNECT_TIMEOUT_SECS, WRITE_BUFFER_BYTES};
use super::error::DownloadError;
use crate::progress::ProgressReporter;

/// HTTP client for downloading product archives.
///
/// Designed to be created once and reused; connections are pooled by the
/// underlying `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with the default 10-second connect timeout. There
    /// is no read timeout: large archives are paced by the streaming loop.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Downloads `url` to the given location.
    ///
    /// * `outfile` - output file path, or a directory in which the file
    ///   name is derived from the URL's last path segment plus `.zip`;
    ///   unset means the current directory.
    /// * `workdir` - where incomplete downloads are stored (defaults to
    ///   the current directory). A partial file from an earlier attempt
    ///   at the same destination is resumed with a `Range` request.
    /// * `progress` - advanced by byte count per streamed chunk.
    ///
    /// Returns the final path of the downloaded file.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid, the request fails
    /// (connect timeout is 10 seconds), the server returns an error
    /// status, or writing to disk fails. No automatic retry.
    #[must_use = "download result contains the path to the downloaded file"]
    #[instrument(skip(self, progress), fields(url = %url))]
    pub async fn download(
        &self,
        url: &str,
        outfile: Option<&Path>,
        workdir: Option<&Path>,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        let destination = resolve_destination(&parsed, outfile).await?;
        let workdir = workdir.unwrap_or_else(|| Path::new("."));

        // Claim the resume slot for this destination. Concurrent workers
        // aiming at the same destination get distinct fallback temp files
        // so they never interleave writes.
        let claim = PartClaim::take(workdir, &destination);
        let temp_path = claim.path().to_path_buf();

        let offset = tokio::fs::metadata(&temp_path)
            .await
            .map(|meta| meta.len())
            .unwrap_or(0);

        let mut request = self.client.get(url);
        if offset > 0 {
            debug!(offset, "resuming from partial file");
            request = request.header(RANGE, format!("bytes={offset}-"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        // A 200 to a ranged request means the server ignored the range:
        // restart from scratch rather than appending to the partial file.
        let resuming = offset > 0 && status == StatusCode::PARTIAL_CONTENT;

        if let Some(remaining) = response.content_length() {
            let total = if resuming { offset + remaining } else { remaining };
            progress.set_total(total);
        }
        if resuming {
            progress.advance(offset);
        }

        let file = if resuming {
            OpenOptions::new()
                .append(true)
                .open(&temp_path)
                .await
                .map_err(|e| DownloadError::io(temp_path.clone(), e))?
        } else {
            File::create(&temp_path)
                .await
                .map_err(|e| DownloadError::io(temp_path.clone(), e))?
        };

        // On stream failure the partial file is kept for resumption.
        let bytes_written = stream_to_file(file, response, url, &temp_path, progress).await?;

        finalize(&temp_path, &destination).await?;
        progress.finish();

        info!(
            path = %destination.display(),
            bytes = offset + bytes_written,
            resumed = resuming,
            "download complete"
        );
        Ok(destination)
    }
}

/// Returns the resume-slot path a download of `destination` uses inside
/// `workdir`.
///
/// The name is the first 16 hex digits of a SHA-256 of the destination
/// path, so the same destination always maps to the same partial file.
#[must_use]
pub fn partial_path(workdir: &Path, destination: &Path) -> PathBuf {
    workdir.join(format!("{}.part", part_stem(destination)))
}

fn part_stem(destination: &Path) -> String {
    let digest = Sha256::digest(destination.as_os_str().as_encoded_bytes());
    digest[..8].iter().map(|byte| format!("{byte:02x}")).collect()
}

/// In-process registry of temp files currently being written, so
/// concurrent workers never share a partial file.
static ACTIVE_PARTS: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();

/// RAII claim on a temp-file path; released on drop.
struct PartClaim {
    path: PathBuf,
}

impl PartClaim {
    fn take(workdir: &Path, destination: &Path) -> Self {
        let registry = ACTIVE_PARTS.get_or_init(|| Mutex::new(HashSet::new()));
        let mut active = registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let stem = part_stem(destination);
        let mut candidate = workdir.join(format!("{stem}.part"));
        let mut attempt = 1u32;
        while !active.insert(candidate.clone()) {
            candidate = workdir.join(format!("{stem}.{attempt}.part"));
            attempt += 1;
        }
        Self { path: candidate }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PartClaim {
    fn drop(&mut self) {
        if let Some(registry) = ACTIVE_PARTS.get() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.path);
        }
    }
}

/// Derives the final destination from the URL and the optional outfile.
async fn resolve_destination(
    parsed: &Url,
    outfile: Option<&Path>,
) -> Result<PathBuf, DownloadError> {
    let filename = archive_filename(parsed)?;
    match outfile {
        None => Ok(PathBuf::from(filename)),
        Some(path) => {
            let is_dir = tokio::fs::metadata(path)
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            if is_dir {
                Ok(path.join(filename))
            } else {
                Ok(path.to_path_buf())
            }
        }
    }
}

/// Filename from the URL's last non-empty path segment, percent-decoded,
/// with the archive extension appended.
fn archive_filename(url: &Url) -> Result<String, DownloadError> {
    let segment = url
        .path_segments()
        .into_iter()
        .flatten()
        .rev()
        .find(|segment| !segment.is_empty())
        .ok_or_else(|| DownloadError::invalid_url(url.as_str()))?;
    let decoded = urlencoding::decode(segment).unwrap_or_else(|_| segment.into());
    Ok(format!("{decoded}.{ARCHIVE_EXTENSION}"))
}

/// Streams the response body to `file`, returning bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    path: &Path,
    progress: &dyn ProgressReporter,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(path.to_path_buf(), e))?;

        progress.advance(chunk.len() as u64);
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(path.to_path_buf(), e))?;

    Ok(bytes_written)
}

/// Moves the finished temp file to its destination. The working directory
/// may sit on another filesystem, in which case the rename fails and the
/// file is copied instead.
async fn finalize(temp_path: &Path, destination: &Path) -> Result<(), DownloadError> {
    if tokio::fs::rename(temp_path, destination).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(temp_path, destination)
        .await
        .map_err(|e| DownloadError::io(destination.to_path_buf(), e))?;
    tokio::fs::remove_file(temp_path)
        .await
        .map_err(|e| DownloadError::io(temp_path.to_path_buf(), e))?;
    Ok(())
}
