// ─── Version Manifest ───
// Fetches the Mojang version catalog and keeps a TTL-bounded copy on disk.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::downloader::staging;
use crate::core::error::{LauncherError, LauncherResult};

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Catalog blobs younger than this are served without touching the network.
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(60 * 60);

const CATALOG_CACHE_FILE: &str = "version_manifest.json";
/// Upper bound on [`CatalogSnapshot::search`] results.
pub const SEARCH_LIMIT: usize = 20;
const CATALOG_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Release channel of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Release,
    Snapshot,
    #[serde(rename = "old_beta")]
    LegacyBeta,
    #[serde(rename = "old_alpha")]
    LegacyAlpha,
    /// Channels the catalog may add later; kept instead of failing the parse.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for VersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionKind::Release => write!(f, "release"),
            VersionKind::Snapshot => write!(f, "snapshot"),
            VersionKind::LegacyBeta => write!(f, "old_beta"),
            VersionKind::LegacyAlpha => write!(f, "old_alpha"),
            VersionKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// A single entry in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VersionKind,
    #[serde(rename = "url")]
    pub descriptor_url: String,
    #[serde(rename = "releaseTime")]
    pub released_at: DateTime<Utc>,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// Top-level catalog document, entries in publish order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionManifest {
    #[serde(default)]
    pub latest: Option<LatestVersions>,
    pub versions: Vec<CatalogEntry>,
}

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Cache blob within its TTL.
    Cached,
    /// Fetched from the network just now.
    Fetched,
    /// Network fetch failed; last-known-good blob served instead.
    Stale,
}

#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub entries: Vec<CatalogEntry>,
    pub latest: Option<LatestVersions>,
    pub freshness: Freshness,
}

impl CatalogSnapshot {
    fn from_manifest(manifest: VersionManifest, freshness: Freshness) -> Self {
        Self {
            entries: manifest.versions,
            latest: manifest.latest,
            freshness,
        }
    }

    /// Find a specific version entry by ID (e.g. "1.20.4").
    pub fn find(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|v| v.id == id)
    }

    pub fn of_kind(&self, kind: VersionKind) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(move |v| v.kind == kind)
    }

    /// Entries whose id or channel contains `query`, case-insensitively, in
    /// catalog order and capped at [`SEARCH_LIMIT`].
    pub fn search(&self, query: &str) -> Vec<&CatalogEntry> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .filter(|v| {
                v.id.to_lowercase().contains(&query) || v.kind.to_string().contains(&query)
            })
            .take(SEARCH_LIMIT)
            .collect()
    }

    pub fn latest_release(&self) -> Option<&CatalogEntry> {
        match &self.latest {
            Some(latest) => self.find(&latest.release),
            None => self.of_kind(VersionKind::Release).next(),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.freshness == Freshness::Stale
    }
}

/// Access to the version catalog.
///
/// Injected into the resolver so tests and offline callers can swap the
/// file-backed cache for [`StaticCatalog`].
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn get(&self, force_refresh: bool) -> LauncherResult<CatalogSnapshot>;

    /// Drop any cached state so the next `get` goes to the network.
    async fn invalidate(&self) -> LauncherResult<()>;
}

/// File-backed catalog cache (single blob, refreshed in full on expiry).
pub struct ManifestCache {
    client: reqwest::Client,
    url: String,
    cache_path: PathBuf,
    ttl: Duration,
}

impl ManifestCache {
    pub fn new(client: reqwest::Client, cache_dir: &Path) -> Self {
        Self {
            client,
            url: VERSION_MANIFEST_URL.to_string(),
            cache_path: cache_dir.join(CATALOG_CACHE_FILE),
            ttl: DEFAULT_CATALOG_TTL,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    async fn read_cached(&self) -> Option<(VersionManifest, Duration)> {
        let metadata = tokio::fs::metadata(&self.cache_path).await.ok()?;
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            // a future or missing mtime cannot prove freshness
            .unwrap_or(Duration::MAX);

        let bytes = tokio::fs::read(&self.cache_path).await.ok()?;
        match serde_json::from_slice::<VersionManifest>(&bytes) {
            Ok(manifest) => Some((manifest, age)),
            Err(e) => {
                warn!("Ignoring unreadable catalog cache {:?}: {}", self.cache_path, e);
                None
            }
        }
    }

    async fn fetch_remote(&self) -> LauncherResult<(VersionManifest, String)> {
        info!("Fetching version catalog from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .timeout(CATALOG_FETCH_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let raw = response.text().await?;
        let manifest: VersionManifest = serde_json::from_str(&raw)?;
        info!("Loaded {} versions from catalog", manifest.versions.len());
        Ok((manifest, raw))
    }
}

#[async_trait]
impl CatalogSource for ManifestCache {
    async fn get(&self, force_refresh: bool) -> LauncherResult<CatalogSnapshot> {
        let cached = self.read_cached().await;

        if !force_refresh {
            if let Some((manifest, age)) = &cached {
                if *age < self.ttl {
                    debug!("Catalog cache hit (age {}s)", age.as_secs());
                    return Ok(CatalogSnapshot::from_manifest(
                        manifest.clone(),
                        Freshness::Cached,
                    ));
                }
            }
        }

        match self.fetch_remote().await {
            Ok((manifest, raw)) => {
                if let Err(e) = staging::write_atomic(&self.cache_path, raw.as_bytes()).await {
                    warn!("Could not persist catalog cache: {}", e);
                }
                Ok(CatalogSnapshot::from_manifest(manifest, Freshness::Fetched))
            }
            Err(err) => match cached {
                Some((manifest, age)) => {
                    warn!(
                        "Catalog fetch failed ({}); using cached copy from {}s ago",
                        err,
                        age.as_secs()
                    );
                    Ok(CatalogSnapshot::from_manifest(manifest, Freshness::Stale))
                }
                None => Err(LauncherError::CatalogUnavailable(err.to_string())),
            },
        }
    }

    async fn invalidate(&self) -> LauncherResult<()> {
        match tokio::fs::remove_file(&self.cache_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LauncherError::io(&self.cache_path, e)),
        }
    }
}

/// In-memory catalog. `None` entries behave like an unreachable service
/// with no cache.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Option<Vec<CatalogEntry>>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: Some(entries),
        }
    }

    pub fn unavailable() -> Self {
        Self { entries: None }
    }
}

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn get(&self, _force_refresh: bool) -> LauncherResult<CatalogSnapshot> {
        match &self.entries {
            Some(entries) => Ok(CatalogSnapshot {
                entries: entries.clone(),
                latest: None,
                freshness: Freshness::Cached,
            }),
            None => Err(LauncherError::CatalogUnavailable(
                "static catalog has no entries".into(),
            )),
        }
    }

    async fn invalidate(&self) -> LauncherResult<()> {
        Ok(())
    }
}
