//! Batch downloads over a bounded worker pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::constants::DEFAULT_WORKERS;
use super::error::DownloadError;
use crate::progress::ProgressReporter;

impl HttpClient {
    /// Downloads a list of URLs into a common output directory.
    ///
    /// At most `workers` downloads run simultaneously
    /// ([`DEFAULT_WORKERS`] is the conventional choice); all tasks share
    /// `outdir` and `workdir`. The call returns only after every task has
    /// finished. Task completion order is unspecified and the shared
    /// `progress` reporter sees interleaved byte counts from all workers.
    ///
    /// On success, returns the final paths in task-completion order.
    ///
    /// # Errors
    ///
    /// Fails fast: the first task failure is surfaced once all in-flight
    /// tasks have drained, and no partial-success report is returned.
    /// Returns [`DownloadError::InvalidWorkerCount`] when `workers` is 0.
    #[instrument(skip(self, urls, progress), fields(count = urls.len(), workers))]
    pub async fn download_all(
        &self,
        urls: &[String],
        outdir: Option<&Path>,
        workdir: Option<&Path>,
        workers: usize,
        progress: Arc<dyn ProgressReporter>,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        if workers == 0 {
            return Err(DownloadError::InvalidWorkerCount { value: workers });
        }

        info!("starting batch download");

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut handles = Vec::with_capacity(urls.len());

        for url in urls {
            // Blocks once `workers` downloads are in flight.
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| DownloadError::WorkerFailed)?;

            let client = self.clone();
            let url = url.clone();
            let outdir = outdir.map(Path::to_path_buf);
            let workdir = workdir.map(Path::to_path_buf);
            let progress = Arc::clone(&progress);

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                debug!(url = %url, "worker starting");
                client
                    .download(&url, outdir.as_deref(), workdir.as_deref(), progress.as_ref())
                    .await
            }));
        }

        let mut paths = Vec::with_capacity(handles.len());
        let mut first_error = None;

        for handle in handles {
            match handle.await {
                Ok(Ok(path)) => paths.push(path),
                Ok(Err(e)) => {
                    warn!(error = %e, "batch download task failed");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    warn!(error = %e, "batch download task panicked");
                    first_error.get_or_insert(DownloadError::WorkerFailed);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => {
                info!(count = paths.len(), "batch download complete");
                Ok(paths)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::progress::NullProgress;

    #[tokio::test]
    async fn test_zero_workers_is_rejected() {
        let client = HttpClient::new();
        let result = client
            .download_all(
                &["https://download.example/a".to_string()],
                None,
                None,
                0,
                Arc::new(NullProgress),
            )
            .await;
        assert!(matches!(
            result,
            Err(DownloadError::InvalidWorkerCount { value: 0 })
        ));
    }

    #[tokio::test]
    async fn test_empty_url_list_completes_immediately() {
        let client = HttpClient::new();
        let paths = client
            .download_all(&[], None, None, DEFAULT_WORKERS, Arc::new(NullProgress))
            .await
            .unwrap_or_default();
        assert!(paths.is_empty());
    }
}
