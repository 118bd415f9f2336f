//! Bulk image fetch-and-save

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DownloadConfig;
use crate::{Error, Result};

/// Cap for a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Outcome of a bulk download
#[derive(Debug, Default, Clone)]
pub struct DownloadReport {
    /// Files written, in request order
    pub saved: Vec<PathBuf>,
    /// `(url, reason)` for each URL that could not be saved
    pub failed: Vec<(String, String)>,
    /// Set when cancellation stopped the batch early
    pub cancelled: bool,
}

impl DownloadReport {
    pub fn downloaded(&self) -> usize {
        self.saved.len()
    }
}

/// HTTP image downloader with retry and pacing
#[derive(Clone)]
pub struct ImageDownloader {
    client: Client,
    config: DownloadConfig,
}

impl ImageDownloader {
    pub fn new(config: DownloadConfig, user_agent: Option<&str>) -> Result<Self> {
        let mut builder =
            Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));

        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua);
        }

        let client = builder.build()?;

        Ok(Self { client, config })
    }

    /// Download every URL into `dest_dir`, naming files `{prefix}_{ts}_{n}.jpg`.
    ///
    /// Individual failures are recorded in the report; only a failure to
    /// create the directory or write a file aborts the batch.
    pub async fn download_all(
        &self,
        urls: &[String],
        dest_dir: &Path,
        prefix: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadReport> {
        tokio::fs::create_dir_all(dest_dir).await?;

        info!("Downloading {} images to {}", urls.len(), dest_dir.display());

        let mut report = DownloadReport::default();
        let delay = Duration::from_millis(self.config.delay_ms);

        for (i, url) in urls.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Download cancelled after {} files", report.saved.len());
                report.cancelled = true;
                break;
            }

            let name = file_name(prefix, chrono::Utc::now().timestamp(), i + 1);
            let path = dest_dir.join(&name);

            debug!("Downloading image {}/{}: {}", i + 1, urls.len(), name);

            match self.fetch_with_retry(url).await {
                Ok(bytes) => {
                    tokio::fs::write(&path, &bytes).await?;
                    info!("Saved {} ({} bytes)", name, bytes.len());
                    report.saved.push(path);
                }
                Err(e) => {
                    warn!("Failed to download {}: {}", url, e);
                    report.failed.push((url.clone(), e.to_string()));
                }
            }

            if i + 1 < urls.len() && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        info!(
            "Downloaded {}/{} images ({} failed)",
            report.saved.len(),
            urls.len(),
            report.failed.len()
        );

        Ok(report)
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<Vec<u8>> {
        let initial = Duration::from_millis(self.config.initial_backoff_ms);
        let mut attempt = 0;

        loop {
            let result = self.client.get(url).send().await;

            let retry_reason = match result {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.bytes().await?.to_vec());
                }
                Ok(response) => {
                    let status = response.status();
                    if !is_retryable_status(status) {
                        return Err(Error::Download(format!("HTTP {}", status)));
                    }
                    format!("HTTP {}", status)
                }
                Err(e) if e.is_timeout() || e.is_connect() => e.to_string(),
                Err(e) => return Err(Error::Http(e)),
            };

            if attempt >= self.config.max_retries {
                return Err(Error::Download(format!(
                    "{} (gave up after {} retries)",
                    retry_reason, attempt
                )));
            }

            let wait = backoff_delay(initial, attempt);
            warn!(
                "Retrying {} in {:?} ({}, attempt {}/{})",
                url,
                wait,
                retry_reason,
                attempt + 1,
                self.config.max_retries
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

/// File name for the `index`-th image (1-based)
pub fn file_name(prefix: &str, timestamp: i64, index: usize) -> String {
    format!("{}_{}_{}.jpg", prefix, timestamp, index)
}

/// Rate limits, request timeouts and server errors are worth retrying
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// `initial * 2^attempt`, capped at [`MAX_BACKOFF`]
fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    initial
        .checked_mul(2u32.saturating_pow(attempt))
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF)
}
