use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::deps::{Artifact, DependencySet};
use crate::core::downloader::staging;
use crate::core::error::{LauncherError, LauncherResult};

pub const DEFAULT_CONCURRENCY: usize = 16;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a single artifact could not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Non-success HTTP status.
    Status(u16),
    Timeout,
    Network,
    /// Downloaded bytes did not match the declared SHA-1.
    Integrity,
    Io,
    /// Never dispatched because the batch was cancelled.
    Cancelled,
}

impl FetchErrorKind {
    fn from_error(err: &LauncherError) -> Self {
        match err {
            LauncherError::DownloadFailed { status, .. } => FetchErrorKind::Status(*status),
            LauncherError::Http(e) if e.is_timeout() => FetchErrorKind::Timeout,
            LauncherError::Http(_) => FetchErrorKind::Network,
            LauncherError::Sha1Mismatch { .. } => FetchErrorKind::Integrity,
            _ => FetchErrorKind::Io,
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Status(code) => write!(f, "HTTP {code}"),
            FetchErrorKind::Timeout => write!(f, "timeout"),
            FetchErrorKind::Network => write!(f, "network error"),
            FetchErrorKind::Integrity => write!(f, "checksum mismatch"),
            FetchErrorKind::Io => write!(f, "I/O error"),
            FetchErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// Same key as the dependency set (relative to the store root).
    pub target_path: PathBuf,
    pub ok: bool,
    pub error_kind: Option<FetchErrorKind>,
    pub message: Option<String>,
}

impl FetchResult {
    pub fn success(target_path: PathBuf) -> Self {
        Self {
            target_path,
            ok: true,
            error_kind: None,
            message: None,
        }
    }

    pub fn failure(target_path: PathBuf, kind: FetchErrorKind, message: String) -> Self {
        Self {
            target_path,
            ok: false,
            error_kind: Some(kind),
            message: Some(message),
        }
    }

    fn cancelled(target_path: PathBuf) -> Self {
        Self::failure(target_path, FetchErrorKind::Cancelled, "batch cancelled".into())
    }
}

/// Every dispatched (or cancelled) item of a batch, in completion order.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub results: Vec<FetchResult>,
}

impl FetchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &FetchResult> {
        self.results.iter().filter(|r| r.ok)
    }

    pub fn failed(&self) -> impl Iterator<Item = &FetchResult> {
        self.results.iter().filter(|r| !r.ok)
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}

/// A single file to download with optional SHA-1 for validation.
#[derive(Debug, Clone)]
pub struct DownloadEntry {
    /// Key reported back in the `FetchResult`.
    pub target_path: PathBuf,
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
}

/// Concurrent, SHA-1 validated downloader.
pub struct Downloader {
    client: Client,
    /// Maximum number of parallel downloads.
    concurrency: usize,
    /// Per-request timeout; there is no batch-wide timeout.
    timeout: Duration,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    // ── Single file download ────────────────────────────

    /// Stream `url` into `dest`, optionally validating SHA-1.
    ///
    /// Bytes go to a staging file beside `dest`; the rename happens only
    /// after the body is complete and the checksum matches. Returns the
    /// number of bytes written.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<u64> {
        staging::ensure_parent(dest).await?;

        let response = self.client.get(url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let staged = staging::staging_path(dest);
        let (actual, written) = match stream_to_file(response, &staged).await {
            Ok(done) => done,
            Err(e) => {
                staging::discard(&staged).await;
                return Err(e);
            }
        };

        if let Some(expected) = sha1_expected {
            if !actual.eq_ignore_ascii_case(expected) {
                staging::discard(&staged).await;
                return Err(LauncherError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        staging::commit(&staged, dest).await?;
        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(written)
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download many files concurrently using `buffer_unordered`.
    ///
    /// Never stops early: every entry yields a `FetchResult`. Once `cancel`
    /// fires, entries not yet started are reported `Cancelled` without a
    /// request; in-flight ones run to completion or timeout.
    pub async fn download_batch(
        &self,
        entries: Vec<DownloadEntry>,
        cancel: &CancellationToken,
    ) -> FetchReport {
        if entries.is_empty() {
            return FetchReport::default();
        }

        info!(
            "Starting batch download: {} files, concurrency={}",
            entries.len(),
            self.concurrency
        );

        let results: Vec<FetchResult> = stream::iter(entries)
            .map(|entry| async move {
                if cancel.is_cancelled() {
                    return FetchResult::cancelled(entry.target_path);
                }
                match self
                    .download_file(&entry.url, &entry.dest, entry.sha1.as_deref())
                    .await
                {
                    Ok(_) => FetchResult::success(entry.target_path),
                    Err(e) => {
                        let kind = FetchErrorKind::from_error(&e);
                        warn!("Failed to fetch {} ({}): {}", entry.url, kind, e);
                        FetchResult::failure(entry.target_path, kind, e.to_string())
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let report = FetchReport { results };
        info!(
            "Batch finished: {} ok, {} failed",
            report.succeeded().count(),
            report.failed_count()
        );
        report
    }

    /// Fetch every artifact of `set` tagged missing. A fully present set
    /// makes no network calls.
    pub async fn fetch_missing(
        &self,
        set: &DependencySet,
        cancel: &CancellationToken,
    ) -> FetchReport {
        self.fetch_missing_where(set, |_| true, cancel).await
    }

    /// Like [`Downloader::fetch_missing`], restricted to artifacts accepted
    /// by `filter`.
    pub async fn fetch_missing_where<F>(
        &self,
        set: &DependencySet,
        filter: F,
        cancel: &CancellationToken,
    ) -> FetchReport
    where
        F: Fn(&Artifact) -> bool,
    {
        let entries: Vec<DownloadEntry> = set
            .missing()
            .filter(|artifact| filter(artifact))
            .map(|artifact| DownloadEntry {
                target_path: artifact.target_path.clone(),
                url: artifact.source_url.clone(),
                dest: set.absolute_path(artifact),
                sha1: artifact.sha1.clone(),
            })
            .collect();

        if entries.is_empty() {
            debug!("Nothing to fetch for {}", set.version_id);
        }
        self.download_batch(entries, cancel).await
    }
}

/// Write the body to `path`, hashing as it streams. Returns (sha1 hex, bytes).
async fn stream_to_file(response: reqwest::Response, path: &Path) -> LauncherResult<(String, u64)> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    let mut hasher = Sha1::new();
    let mut written = 0u64;

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        file.write_all(&chunk)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| LauncherError::io(path, e))?;
    // handle dropped before the rename
    drop(file);

    Ok((hex::encode(hasher.finalize()), written))
}
