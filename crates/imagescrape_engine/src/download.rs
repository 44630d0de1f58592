use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use imagescrape_core::{ImageReference, ReferenceSet};
use scrape_logging::{scrape_debug, scrape_error, scrape_info, scrape_warn};
use tokio_util::sync::CancellationToken;

use crate::config::ConfigError;
use crate::fetch::{ImageFetcher, ProgressSink};
use crate::filename::{choose_extension, extension_from_url, image_file_stem, FilenameAllocator};
use crate::persist::{ensure_output_dir, AtomicFileWriter};
use crate::{DownloadOutcome, EngineEvent, FailureKind, FetchError, FetchOutput};

pub const MAX_CONCURRENCY: usize = 64;
pub const MAX_ATTEMPTS: u32 = 11;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per reference, including the first.
    pub max_attempts: u32,
    /// Doubles after every failed attempt, up to `max_backoff`.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Wait before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub concurrency: usize,
    /// Lowercase extensions to keep; empty keeps everything.
    pub allowed_extensions: Vec<String>,
    pub retry: RetryPolicy,
}

impl DownloadSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ConfigError::ConcurrencyOutOfRange(self.concurrency));
        }
        if !(1..=MAX_ATTEMPTS).contains(&self.retry.max_attempts) {
            return Err(ConfigError::AttemptsOutOfRange(self.retry.max_attempts));
        }
        Ok(())
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            allowed_extensions: Vec::new(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Fetches and writes every reference of a set. Each reference is its own
/// unit of failure; the batch always yields one outcome per reference.
pub struct BatchDownloader {
    fetcher: Arc<dyn ImageFetcher>,
    settings: DownloadSettings,
}

impl BatchDownloader {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, settings: DownloadSettings) -> Self {
        Self { fetcher, settings }
    }

    pub async fn download_all(
        &self,
        references: &ReferenceSet,
        destination: &Path,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Vec<DownloadOutcome> {
        scrape_info!(
            "total number of links found to download: {}",
            references.len()
        );

        if let Err(err) = ensure_output_dir(destination) {
            scrape_error!("cannot prepare {:?}: {}", destination, err);
            return references
                .iter()
                .map(|reference| DownloadOutcome {
                    reference: reference.clone(),
                    result: Err(FetchError::new(FailureKind::Write, err.to_string())),
                })
                .collect();
        }

        let writer = AtomicFileWriter::new(destination.to_path_buf());
        let mut allocator = FilenameAllocator::new();
        let planned: Vec<(ImageReference, String)> = references
            .iter()
            .map(|reference| {
                let stem = allocator.allocate(&image_file_stem(&reference.url));
                (reference.clone(), stem)
            })
            .collect();

        let writer = &writer;
        let outcomes: Vec<DownloadOutcome> = futures_util::stream::iter(planned)
            .map(|(reference, stem)| async move {
                let result = self.download_one(&reference, &stem, writer, cancel).await;
                match &result {
                    Ok(path) => scrape_debug!("downloaded {} to {:?}", reference.url, path),
                    Err(err) => scrape_warn!("skipping download of {}: {}", reference.url, err),
                }
                sink.emit(EngineEvent::DownloadFinished {
                    url: reference.url.clone(),
                    result: result.clone().map_err(|err| err.kind),
                });
                DownloadOutcome { reference, result }
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        scrape_info!("number of links skipped being downloaded: {}", failed);
        scrape_info!(
            "number of links actually downloaded: {}",
            outcomes.len() - failed
        );
        outcomes
    }

    async fn download_one(
        &self,
        reference: &ImageReference,
        stem: &str,
        writer: &AtomicFileWriter,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::new(FailureKind::Cancelled, "batch cancelled"));
        }
        self.check_extension(&reference.url)?;

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(FetchError::new(FailureKind::Cancelled, "batch cancelled"));
            }
            result = self.fetch_with_retry(&reference.url) => result?,
        };

        let extension = choose_extension(&reference.url, output.metadata.content_type.as_deref());
        writer
            .write(&format!("{stem}.{extension}"), &output.bytes)
            .map_err(|err| FetchError::new(FailureKind::Write, err.to_string()))
    }

    fn check_extension(&self, url: &str) -> Result<(), FetchError> {
        if self.settings.allowed_extensions.is_empty() {
            return Ok(());
        }
        let Some(extension) = extension_from_url(url) else {
            return Ok(());
        };
        let allowed = self
            .settings
            .allowed_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&extension));
        if allowed {
            Ok(())
        } else {
            Err(FetchError::new(
                FailureKind::UnsupportedExtension { extension },
                "filtered by extension allow-list",
            ))
        }
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let policy = &self.settings.retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.fetcher.fetch(url).await {
                Ok(output) => return Ok(output),
                Err(err) if attempt < max_attempts && err.kind.is_transient() => {
                    let backoff = policy.backoff_after(attempt);
                    scrape_debug!(
                        "attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        url,
                        err,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
