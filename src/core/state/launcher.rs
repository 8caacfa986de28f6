// ─── Launcher ───
// Wires the pipeline together: catalog → descriptor → dependency set →
// fetch → natives → launch plan. Owns the shared HTTP client and the
// settings loaded for one data directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::deps::{
    main_archive_relative_path, natives_dir, Artifact, ArtifactKind, DependencySet,
};
use crate::core::downloader::{Downloader, FetchReport, FetchResult};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::java::{find_java_binary, inspect_java};
use crate::core::launch::{
    build_launch_plan, extract_natives, ExtractionReport, LaunchPlan, SystemProfile,
};
use crate::core::state::settings::LauncherSettings;
use crate::core::version::{
    descriptor_path, CatalogSnapshot, CatalogSource, DescriptorResolver, ManifestCache,
    VersionDescriptor,
};

const CACHE_DIR: &str = "cache";
const VERSIONS_DIR: &str = "versions";

/// Outcome of [`Launcher::prepare`].
#[derive(Debug, Clone)]
pub struct PreparedVersion {
    pub descriptor: VersionDescriptor,
    pub set: DependencySet,
    pub fetch: FetchReport,
    pub extraction: ExtractionReport,
}

impl PreparedVersion {
    pub fn failures(&self) -> impl Iterator<Item = &FetchResult> {
        self.fetch.failed()
    }

    /// Every artifact present and every native archive extracted.
    pub fn is_complete(&self) -> bool {
        self.set.missing_count() == 0 && self.extraction.failures.is_empty()
    }
}

pub struct Launcher {
    data_dir: PathBuf,
    settings: LauncherSettings,
    catalog: Arc<dyn CatalogSource>,
    resolver: DescriptorResolver,
    downloader: Downloader,
}

impl Launcher {
    /// Launcher backed by the on-disk catalog cache under `<data_dir>/cache`.
    pub fn new(data_dir: impl Into<PathBuf>, settings: LauncherSettings) -> LauncherResult<Self> {
        let data_dir = data_dir.into();
        let client = build_http_client()?;
        let catalog = ManifestCache::new(client.clone(), &data_dir.join(CACHE_DIR))
            .with_url(settings.catalog_url.clone())
            .with_ttl(settings.catalog_ttl());
        Self::from_parts(data_dir, settings, client, Arc::new(catalog))
    }

    /// Launcher with a caller-supplied catalog source.
    pub fn with_catalog(
        data_dir: impl Into<PathBuf>,
        settings: LauncherSettings,
        catalog: Arc<dyn CatalogSource>,
    ) -> LauncherResult<Self> {
        let client = build_http_client()?;
        Self::from_parts(data_dir.into(), settings, client, catalog)
    }

    fn from_parts(
        data_dir: PathBuf,
        settings: LauncherSettings,
        client: Client,
        catalog: Arc<dyn CatalogSource>,
    ) -> LauncherResult<Self> {
        settings.validate()?;
        let resolver = DescriptorResolver::new(client.clone(), catalog.clone(), data_dir.clone());
        let downloader = Downloader::new(client)
            .with_concurrency(settings.concurrency)
            .with_timeout(settings.fetch_timeout());
        Ok(Self {
            data_dir,
            settings,
            catalog,
            resolver,
            downloader,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn settings(&self) -> &LauncherSettings {
        &self.settings
    }

    pub async fn versions(&self, force_refresh: bool) -> LauncherResult<CatalogSnapshot> {
        self.catalog.get(force_refresh).await
    }

    /// Ids under `versions/` with both a saved descriptor and a main archive,
    /// newest-sorting first.
    pub fn installed_versions(&self) -> LauncherResult<Vec<String>> {
        let versions_dir = self.data_dir.join(VERSIONS_DIR);
        let entries = match std::fs::read_dir(&versions_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LauncherError::io(&versions_dir, e)),
        };

        let mut installed: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|id| {
                descriptor_path(&self.data_dir, id).is_file()
                    && self.data_dir.join(main_archive_relative_path(id)).is_file()
            })
            .collect();
        installed.sort_by(|a, b| b.cmp(a));
        debug!("{} installed versions in {:?}", installed.len(), versions_dir);
        Ok(installed)
    }

    /// Delete `versions/<id>`. Shared libraries and assets are left alone.
    pub async fn remove_version(&self, version_id: &str) -> LauncherResult<()> {
        if version_id.is_empty()
            || version_id == "."
            || version_id == ".."
            || version_id.contains(['/', '\\'])
        {
            return Err(LauncherError::InvalidVersionId(version_id.to_string()));
        }

        let version_dir = self.data_dir.join(VERSIONS_DIR).join(version_id);
        if !version_dir.is_dir() {
            return Err(LauncherError::VersionNotInstalled(version_id.to_string()));
        }
        tokio::fs::remove_dir_all(&version_dir)
            .await
            .map_err(|e| LauncherError::io(&version_dir, e))?;
        info!("Removed version {}", version_id);
        Ok(())
    }

    /// Resolve `version_id`, fetch whatever is missing and extract natives.
    ///
    /// Individual fetch failures do not fail the call; they are reported in
    /// [`PreparedVersion::fetch`] and the set keeps those artifacts missing.
    pub async fn prepare(
        &self,
        version_id: &str,
        cancel: &CancellationToken,
    ) -> LauncherResult<PreparedVersion> {
        let descriptor = self.resolver.resolve(version_id).await?;
        let mut set = self.build_set(&descriptor);
        let index_was_missing = set.asset_index().is_some_and(|a| !a.is_present());

        let mut fetch = self.downloader.fetch_missing(&set, cancel).await;
        set.apply_fetch_results(&fetch.results);

        // objects are only known once the index is on disk
        if index_was_missing
            && set.asset_index().is_some_and(Artifact::is_present)
            && !cancel.is_cancelled()
        {
            set = self.build_set(&descriptor);
            let objects = self
                .downloader
                .fetch_missing_where(&set, |a| a.kind == ArtifactKind::AssetObject, cancel)
                .await;
            set.apply_fetch_results(&objects.results);
            fetch.results.extend(objects.results);
        }

        let extraction =
            extract_natives(&set.native_archives(), &natives_dir(&self.data_dir)).await?;

        info!(
            "Prepared {}: {} fetched, {} failed, {} missing, {} natives extracted",
            version_id,
            fetch.succeeded().count(),
            fetch.failed_count(),
            set.missing_count(),
            extraction.extracted.len()
        );

        Ok(PreparedVersion {
            descriptor,
            set,
            fetch,
            extraction,
        })
    }

    fn build_set(&self, descriptor: &VersionDescriptor) -> DependencySet {
        DependencySet::build_with_resources(descriptor, &self.data_dir, &self.settings.resources_url)
    }

    /// Java binary to launch with: the configured path when it exists,
    /// otherwise discovery guided by the descriptor's hint.
    pub async fn resolve_java(&self, hint_major: Option<u32>) -> LauncherResult<PathBuf> {
        let java = match &self.settings.java_path {
            Some(path) if path.is_file() => path.clone(),
            Some(path) => {
                warn!("Configured Java {:?} does not exist; searching", path);
                find_java_binary(hint_major)?
            }
            None => find_java_binary(hint_major)?,
        };

        match (inspect_java(&java).await, hint_major) {
            (Some(installation), Some(hint)) if installation.major < hint => warn!(
                "Java {} at {:?} is older than the required {}",
                installation.version, java, hint
            ),
            (Some(installation), _) => {
                info!("Using Java {} at {:?}", installation.version, java)
            }
            (None, _) => warn!("Could not determine the version of {:?}", java),
        }
        Ok(java)
    }

    /// Assemble the process invocation for a prepared version.
    pub async fn launch_plan(
        &self,
        prepared: &PreparedVersion,
        inherited_env: &BTreeMap<String, String>,
    ) -> LauncherResult<LaunchPlan> {
        if let Some(main) = prepared.set.main_archive().filter(|main| !main.is_present()) {
            return Err(LauncherError::MainArchiveMissing(
                prepared.set.absolute_path(main),
            ));
        }

        let java = self.resolve_java(prepared.descriptor.java_major_hint).await?;
        let config = self.settings.launch_config(java);
        build_launch_plan(
            &prepared.descriptor,
            &prepared.set,
            &config,
            &SystemProfile::detect(),
            inherited_env,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::current_os_name;
    use crate::core::version::{CatalogEntry, StaticCatalog, VersionKind};
    use httpmock::prelude::*;
    use serde_json::json;
    use sha1::{Digest, Sha1};
    use std::io::Write;

    fn sha1_hex(bytes: &[u8]) -> String {
        hex::encode(Sha1::digest(bytes))
    }

    fn natives_jar() -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("liblwjgl.so", options).unwrap();
            zip.write_all(b"elf").unwrap();
            zip.start_file("META-INF/MANIFEST.MF", options).unwrap();
            zip.write_all(b"Manifest-Version: 1.0").unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    fn launcher(server: &MockServer, root: &Path) -> Launcher {
        let catalog = StaticCatalog::new(vec![CatalogEntry {
            id: "1.20.1".into(),
            kind: VersionKind::Release,
            descriptor_url: server.url("/v/1.20.1.json"),
            released_at: chrono::Utc::now(),
            sha1: None,
        }]);
        let settings = LauncherSettings {
            resources_url: server.url("/objects"),
            ..Default::default()
        };
        Launcher::with_catalog(root, settings, Arc::new(catalog)).unwrap()
    }

    #[tokio::test]
    async fn prepare_fetches_everything_including_asset_objects() {
        let server = MockServer::start();
        let object = b"sound bytes";
        let hash = sha1_hex(object);
        let index = json!({"objects": {"minecraft/sounds/a.ogg": {"hash": hash, "size": object.len()}}})
            .to_string();
        let native_key = format!("natives-{}", current_os_name());

        let descriptor = json!({
            "id": "1.20.1",
            "type": "release",
            "mainClass": "net.minecraft.client.main.Main",
            "downloads": {"client": {"url": server.url("/client.jar")}},
            "assetIndex": {"id": "6", "url": server.url("/6.json")},
            "libraries": [
                {"name": "com.example:lib:1.0",
                 "downloads": {"artifact": {"path": "com/example/lib/1.0/lib-1.0.jar",
                                            "url": server.url("/lib.jar")}}},
                {"name": "org.lwjgl:lwjgl:3.3.1",
                 "downloads": {"classifiers": {
                     native_key: {"path": "org/lwjgl/lwjgl-natives.jar", "url": server.url("/natives.jar")}
                 }}}
            ]
        });

        server.mock(|when, then| {
            when.method(GET).path("/v/1.20.1.json");
            then.status(200).body(descriptor.to_string());
        });
        server.mock(|when, then| {
            when.method(GET).path("/client.jar");
            then.status(200).body("client");
        });
        server.mock(|when, then| {
            when.method(GET).path("/lib.jar");
            then.status(200).body("lib");
        });
        server.mock(|when, then| {
            when.method(GET).path("/natives.jar");
            then.status(200).body(natives_jar());
        });
        server.mock(|when, then| {
            when.method(GET).path("/6.json");
            then.status(200).body(index.clone());
        });
        let object_mock = server.mock(|when, then| {
            when.method(GET).path(format!("/objects/{}/{}", &hash[..2], hash));
            then.status(200).body(object.as_slice());
        });

        let dir = tempfile::tempdir().unwrap();
        let prepared = launcher(&server, dir.path())
            .prepare("1.20.1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(object_mock.calls(), 1);
        assert_eq!(prepared.fetch.len(), 5);
        assert_eq!(prepared.fetch.failed_count(), 0);
        assert!(prepared.is_complete());
        assert_eq!(prepared.extraction.extracted, vec!["liblwjgl.so".to_string()]);
        assert!(natives_dir(dir.path()).join("liblwjgl.so").is_file());
        assert!(dir
            .path()
            .join("assets/objects")
            .join(&hash[..2])
            .join(&hash)
            .is_file());
    }

    #[tokio::test]
    async fn launch_plan_requires_main_archive() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v/1.20.1.json");
            then.status(200).body(
                json!({
                    "id": "1.20.1",
                    "mainClass": "net.minecraft.client.main.Main",
                    "downloads": {"client": {"url": server.url("/client.jar")}},
                    "libraries": []
                })
                .to_string(),
            );
        });
        server.mock(|when, then| {
            when.method(GET).path("/client.jar");
            then.status(404);
        });

        let dir = tempfile::tempdir().unwrap();
        let launcher = launcher(&server, dir.path());
        let prepared = launcher
            .prepare("1.20.1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(prepared.fetch.failed_count(), 1);
        assert!(!prepared.is_complete());
        let err = launcher
            .launch_plan(&prepared, &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::MainArchiveMissing(_)));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = LauncherSettings {
            window_width: 0,
            ..Default::default()
        };
        let result = Launcher::with_catalog(
            "/tmp/unused",
            settings,
            Arc::new(StaticCatalog::new(vec![])),
        );
        assert!(matches!(result, Err(LauncherError::Config(_))));
    }

    fn install_fake(root: &Path, id: &str, with_jar: bool) {
        let dir = root.join("versions").join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{id}.json")), "{}").unwrap();
        if with_jar {
            std::fs::write(dir.join(format!("{id}.jar")), "jar").unwrap();
        }
    }

    fn offline_launcher(root: &Path) -> Launcher {
        Launcher::with_catalog(
            root,
            LauncherSettings::default(),
            Arc::new(StaticCatalog::new(vec![])),
        )
        .unwrap()
    }

    #[test]
    fn installed_versions_need_descriptor_and_main_archive() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = offline_launcher(dir.path());
        assert!(launcher.installed_versions().unwrap().is_empty());

        install_fake(dir.path(), "1.20.1", true);
        install_fake(dir.path(), "1.19.4", true);
        install_fake(dir.path(), "23w31a", false);
        std::fs::write(dir.path().join("versions/stray.txt"), "x").unwrap();

        assert_eq!(launcher.installed_versions().unwrap(), vec!["1.20.1", "1.19.4"]);
    }

    #[tokio::test]
    async fn remove_version_deletes_only_that_version() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = offline_launcher(dir.path());
        install_fake(dir.path(), "1.20.1", true);
        install_fake(dir.path(), "1.19.4", true);
        let library = dir.path().join("libraries/com/example/lib.jar");
        std::fs::create_dir_all(library.parent().unwrap()).unwrap();
        std::fs::write(&library, "lib").unwrap();

        launcher.remove_version("1.20.1").await.unwrap();

        assert_eq!(launcher.installed_versions().unwrap(), vec!["1.19.4"]);
        assert!(!dir.path().join("versions/1.20.1").exists());
        assert!(library.is_file());

        let again = launcher.remove_version("1.20.1").await.unwrap_err();
        assert!(matches!(again, LauncherError::VersionNotInstalled(id) if id == "1.20.1"));
    }

    #[tokio::test]
    async fn remove_version_rejects_paths() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = offline_launcher(dir.path());
        install_fake(dir.path(), "1.20.1", true);

        for id in ["", ".", "..", "../versions", "1.20.1/../1.20.1"] {
            let err = launcher.remove_version(id).await.unwrap_err();
            assert!(matches!(err, LauncherError::InvalidVersionId(_)), "{id:?}");
        }
        assert!(dir.path().join("versions/1.20.1").is_dir());
    }
}
