use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the resolution and launch engine.
/// Every module returns `Result<T, LauncherError>`.
///
/// Per-artifact fetch failures and per-archive extraction failures are not
/// raised through this type at batch level; they are collected into
/// `FetchReport` / `ExtractionReport` instead.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── Resolution ──────────────────────────────────────
    #[error("Version catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Version not found in catalog: {0}")]
    VersionNotFound(String),

    #[error("Version not installed: {0}")]
    VersionNotInstalled(String),

    #[error("Invalid version id: {0:?}")]
    InvalidVersionId(String),

    #[error("Malformed descriptor for {id}: {reason}")]
    DescriptorMalformed { id: String, reason: String },

    #[error("Main archive missing at {0:?}")]
    MainArchiveMissing(PathBuf),

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Native extraction failed for {archive:?}: {reason}")]
    ExtractionFailed { archive: PathBuf, reason: String },

    // ── Java ────────────────────────────────────────────
    #[error("No Java runtime found (set java_path or JAVA_HOME)")]
    JavaNotFound,

    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    // ── Settings ────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl LauncherError {
    /// Attach a path to an IO error, matching the `map_err` pattern used at
    /// every filesystem call site.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}
