// ─── Descriptor Resolver ───
// Catalog lookup → descriptor fetch → normalization, with the saved
// descriptor as an offline fallback.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

use crate::core::downloader::staging;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::manifest::{CatalogEntry, CatalogSource, Freshness};
use crate::core::version::version_file::{parse_descriptor, VersionDescriptor};

const DESCRIPTOR_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// `<root>/versions/<id>/<id>.json`
pub fn descriptor_path(store_root: &Path, version_id: &str) -> PathBuf {
    store_root
        .join("versions")
        .join(version_id)
        .join(format!("{version_id}.json"))
}

pub struct DescriptorResolver {
    client: reqwest::Client,
    catalog: Arc<dyn CatalogSource>,
    store_root: PathBuf,
}

impl DescriptorResolver {
    pub fn new(
        client: reqwest::Client,
        catalog: Arc<dyn CatalogSource>,
        store_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            catalog,
            store_root: store_root.into(),
        }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogSource> {
        &self.catalog
    }

    /// Resolve `version_id` into a normalized descriptor.
    pub async fn resolve(&self, version_id: &str) -> LauncherResult<VersionDescriptor> {
        let entry = match self.find_entry(version_id).await {
            Ok(entry) => entry,
            Err(LauncherError::CatalogUnavailable(reason)) => {
                return match self.load_saved(version_id).await {
                    Some(descriptor) => {
                        warn!(
                            "Catalog unavailable ({}); using saved descriptor for {}",
                            reason, version_id
                        );
                        Ok(descriptor)
                    }
                    None => Err(LauncherError::CatalogUnavailable(reason)),
                };
            }
            Err(e) => return Err(e),
        };

        let raw = match self.fetch_descriptor(&entry).await {
            Ok(raw) => raw,
            Err(e) => {
                return match self.load_saved(version_id).await {
                    Some(descriptor) => {
                        warn!("Descriptor fetch failed ({}); using saved copy", e);
                        Ok(descriptor)
                    }
                    None => Err(e),
                };
            }
        };

        let descriptor = parse_descriptor(version_id, &raw)?;

        let path = descriptor_path(&self.store_root, version_id);
        if let Err(e) = staging::write_atomic(&path, raw.as_bytes()).await {
            warn!("Could not save descriptor {:?}: {}", path, e);
        }

        info!(
            "Resolved {} ({} libraries, {} natives, asset index {})",
            descriptor.id,
            descriptor.libraries.len(),
            descriptor.native_libraries.len(),
            descriptor.asset_index_name()
        );
        Ok(descriptor)
    }

    /// Catalog lookup. A miss against a cached catalog retries once with a
    /// forced refresh, since the cache may predate the release.
    async fn find_entry(&self, version_id: &str) -> LauncherResult<CatalogEntry> {
        let snapshot = self.catalog.get(false).await?;
        if let Some(entry) = snapshot.find(version_id) {
            return Ok(entry.clone());
        }
        if snapshot.freshness == Freshness::Cached {
            debug!("{} not in cached catalog; refreshing", version_id);
            if let Ok(fresh) = self.catalog.get(true).await {
                if let Some(entry) = fresh.find(version_id) {
                    return Ok(entry.clone());
                }
            }
        }
        Err(LauncherError::VersionNotFound(version_id.to_string()))
    }

    async fn fetch_descriptor(&self, entry: &CatalogEntry) -> LauncherResult<String> {
        debug!("Fetching descriptor {} from {}", entry.id, entry.descriptor_url);
        let response = self
            .client
            .get(&entry.descriptor_url)
            .timeout(DESCRIPTOR_FETCH_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: entry.descriptor_url.clone(),
                status: status.as_u16(),
            });
        }

        let raw = response.text().await?;
        if let Some(expected) = &entry.sha1 {
            let actual = hex::encode(Sha1::digest(raw.as_bytes()));
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(LauncherError::Sha1Mismatch {
                    path: descriptor_path(&self.store_root, &entry.id),
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        Ok(raw)
    }

    async fn load_saved(&self, version_id: &str) -> Option<VersionDescriptor> {
        let path = descriptor_path(&self.store_root, version_id);
        let raw = tokio::fs::read_to_string(&path).await.ok()?;
        match parse_descriptor(version_id, &raw) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                warn!("Saved descriptor {:?} is unusable: {}", path, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::manifest::{StaticCatalog, VersionKind};
    use httpmock::prelude::*;

    const DESCRIPTOR: &str = r#"{
        "id": "1.20.1",
        "type": "release",
        "mainClass": "net.minecraft.client.main.Main",
        "downloads": {"client": {"url": "https://x/client.jar", "sha1": "aa", "size": 3}},
        "libraries": [{"name": "com.example:lib:1.0"}]
    }"#;

    fn entry(id: &str, url: String, sha1: Option<String>) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            kind: VersionKind::Release,
            descriptor_url: url,
            released_at: chrono::Utc::now(),
            sha1,
        }
    }

    fn resolver(catalog: StaticCatalog, root: &Path) -> DescriptorResolver {
        DescriptorResolver::new(reqwest::Client::new(), Arc::new(catalog), root)
    }

    #[tokio::test]
    async fn resolves_and_saves_descriptor() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/1.20.1.json");
            then.status(200).body(DESCRIPTOR);
        });
        let dir = tempfile::tempdir().unwrap();
        let catalog = StaticCatalog::new(vec![entry("1.20.1", server.url("/1.20.1.json"), None)]);

        let d = resolver(catalog, dir.path()).resolve("1.20.1").await.unwrap();

        assert_eq!(d.main_archive.url, "https://x/client.jar");
        assert_eq!(d.libraries.len(), 1);
        let saved = std::fs::read_to_string(descriptor_path(dir.path(), "1.20.1")).unwrap();
        assert_eq!(saved, DESCRIPTOR);
    }

    #[tokio::test]
    async fn unknown_version_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolver(StaticCatalog::new(vec![]), dir.path())
            .resolve("9.9.9")
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::VersionNotFound(id) if id == "9.9.9"));
    }

    #[tokio::test]
    async fn unavailable_catalog_uses_saved_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let r = resolver(StaticCatalog::unavailable(), dir.path());

        let err = r.resolve("1.20.1").await.unwrap_err();
        assert!(matches!(err, LauncherError::CatalogUnavailable(_)));

        staging::write_atomic(&descriptor_path(dir.path(), "1.20.1"), DESCRIPTOR.as_bytes())
            .await
            .unwrap();
        let d = r.resolve("1.20.1").await.unwrap();
        assert_eq!(d.id, "1.20.1");
    }

    #[tokio::test]
    async fn descriptor_checksum_mismatch_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/1.20.1.json");
            then.status(200).body(DESCRIPTOR);
        });
        let dir = tempfile::tempdir().unwrap();
        let catalog = StaticCatalog::new(vec![entry(
            "1.20.1",
            server.url("/1.20.1.json"),
            Some("0000000000000000000000000000000000000000".into()),
        )]);

        let err = resolver(catalog, dir.path()).resolve("1.20.1").await.unwrap_err();
        assert!(matches!(err, LauncherError::Sha1Mismatch { .. }));
        assert!(!descriptor_path(dir.path(), "1.20.1").exists());
    }

    #[tokio::test]
    async fn malformed_descriptor_is_fatal_and_not_saved() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bad.json");
            then.status(200).body("[]");
        });
        let dir = tempfile::tempdir().unwrap();
        let catalog = StaticCatalog::new(vec![entry("bad", server.url("/bad.json"), None)]);

        let err = resolver(catalog, dir.path()).resolve("bad").await.unwrap_err();
        assert!(matches!(err, LauncherError::DescriptorMalformed { .. }));
        assert!(!descriptor_path(dir.path(), "bad").exists());
    }
}
